//! Policy configuration tests

use qadmit_core::config::{PolicyConfig, DEFAULT_MAX_CONCURRENT_QUERIES};
use qadmit_core::error::Error;

#[test]
fn test_defaults() {
    let config = PolicyConfig::default();
    assert!(!config.profile_work_orders);
    assert_eq!(config.promotion_attempts, 1);
    assert_eq!(config.max_concurrent_queries, DEFAULT_MAX_CONCURRENT_QUERIES);
    assert_eq!(DEFAULT_MAX_CONCURRENT_QUERIES, 1000);
    config.validate().unwrap();
}

#[test]
fn test_validate_rejects_zero_values() {
    let attempts = PolicyConfig {
        promotion_attempts: 0,
        ..PolicyConfig::default()
    };
    assert!(matches!(attempts.validate(), Err(Error::Config(ref m)) if m.contains("promotion_attempts")));

    let capacity = PolicyConfig {
        max_concurrent_queries: 0,
        ..PolicyConfig::default()
    };
    assert!(matches!(capacity.validate(), Err(Error::Config(_))));
}

#[test]
fn test_with_profiling() {
    assert!(PolicyConfig::default().with_profiling(true).profile_work_orders);
}

#[test]
fn test_partial_deserialization_uses_defaults() {
    let config: PolicyConfig = serde_json::from_str(r#"{"promotion_attempts": 4}"#).unwrap();
    assert_eq!(config.promotion_attempts, 4);
    assert!(!config.profile_work_orders);
    assert_eq!(config.max_concurrent_queries, DEFAULT_MAX_CONCURRENT_QUERIES);
}

#[test]
fn test_from_env() {
    std::env::set_var("QADMIT_PROFILE_WORK_ORDERS", "yes");
    std::env::set_var("QADMIT_PROMOTION_ATTEMPTS", "3");
    std::env::set_var("QADMIT_MAX_CONCURRENT_QUERIES", "not-a-number");
    let config = PolicyConfig::from_env();
    std::env::remove_var("QADMIT_PROFILE_WORK_ORDERS");
    std::env::remove_var("QADMIT_PROMOTION_ATTEMPTS");
    std::env::remove_var("QADMIT_MAX_CONCURRENT_QUERIES");

    assert!(config.profile_work_orders);
    assert_eq!(config.promotion_attempts, 3);
    // unparseable values fall back to the default
    assert_eq!(config.max_concurrent_queries, DEFAULT_MAX_CONCURRENT_QUERIES);
}
