//! Predicate lock model tests: decomposition, conflict rule, intersection


use std::cmp::Ordering;

use qadmit_core::catalog::Catalog;
use qadmit_core::expr::{ColumnRef, Expr};
use qadmit_core::id::{AttributeId, RelationId};
use qadmit_core::types::{scalar_cmp, scalar_eq, Scalar};
use qadmit_lock::{decompose, AtomicLock, Constraint, Endpoint, LockError, PredicateLock, ValueRange};
use test_fixtures::sample_catalog;

fn col(rel: u32, attr: u32) -> ColumnRef {
    ColumnRef::new(RelationId::new(rel), AttributeId::new(attr))
}

fn lock_of(predicates: &[&str]) -> PredicateLock {
    let catalog = sample_catalog();
    let exprs: Vec<Expr> = predicates
        .iter()
        .map(|p| Expr::parse(p, &catalog).unwrap())
        .collect();
    PredicateLock::from_predicates(&exprs)
}

fn locks_of(predicate: &str) -> Vec<AtomicLock> {
    let catalog = sample_catalog();
    decompose(&Expr::parse(predicate, &catalog).unwrap())
}

#[test]
fn test_decompose_equality() {
    let locks = locks_of("orders.amount = 5");
    assert_eq!(locks, vec![AtomicLock::new(col(0, 1), Constraint::Equals(Scalar::I32(5)))]);
}

#[test]
fn test_decompose_comparisons_become_ranges() {
    let locks = locks_of("orders.amount > 10");
    assert_eq!(
        locks[0].constraint,
        Constraint::Range(ValueRange::new(Endpoint::Excluded(Scalar::I32(10)), Endpoint::Unbounded).unwrap())
    );

    let locks = locks_of("orders.amount <= 10");
    assert_eq!(
        locks[0].constraint,
        Constraint::Range(ValueRange::new(Endpoint::Unbounded, Endpoint::Included(Scalar::I32(10))).unwrap())
    );
}

#[test]
fn test_decompose_literal_on_left_is_flipped() {
    // 10 < amount  is  amount > 10
    assert_eq!(locks_of("10 < orders.amount"), locks_of("orders.amount > 10"));
}

#[test]
fn test_decompose_between() {
    let locks = locks_of("orders.amount BETWEEN 1 AND 10");
    assert_eq!(
        locks,
        vec![AtomicLock::new(
            col(0, 1),
            Constraint::Range(ValueRange::closed(Scalar::I32(1), Scalar::I32(10)).unwrap())
        )]
    );
}

#[test]
fn test_decompose_empty_between_locks_whole_attribute() {
    let locks = locks_of("orders.amount BETWEEN 10 AND 1");
    assert_eq!(locks, vec![AtomicLock::any(col(0, 1))]);
}

#[test]
fn test_decompose_compound_is_union() {
    let locks = locks_of("orders.amount > 100 AND (orders.status = 'open' OR customers.region = 'eu')");
    assert_eq!(locks.len(), 3);
    assert!(locks.iter().any(|l| l.column == col(0, 2)));
    assert!(locks.iter().any(|l| l.column == col(1, 1)));
}

#[test]
fn test_decompose_unsupported_shapes_lock_any() {
    assert_eq!(locks_of("orders.amount != 5"), vec![AtomicLock::any(col(0, 1))]);
    assert_eq!(locks_of("NOT orders.amount = 5"), vec![AtomicLock::any(col(0, 1))]);
    assert_eq!(locks_of("orders.status IS NULL"), vec![AtomicLock::any(col(0, 2))]);
    assert_eq!(
        locks_of("orders.id = customers.id"),
        vec![AtomicLock::any(col(0, 0)), AtomicLock::any(col(1, 0))]
    );
    assert_eq!(locks_of("orders.amount * 2 > 10"), vec![AtomicLock::any(col(0, 1))]);
}

#[test]
fn test_decompose_deduplicates() {
    let locks = locks_of("orders.amount = 5 OR orders.amount = 5");
    assert_eq!(locks.len(), 1);
}

#[test]
fn test_decompose_bare_literal_has_no_locks() {
    assert!(locks_of("true").is_empty());
}

#[test]
fn test_add_predicate_read_is_idempotent() {
    let mut lock = PredicateLock::new();
    let atomic = AtomicLock::new(col(0, 1), Constraint::Equals(Scalar::I32(5)));
    assert!(lock.add_predicate_read(atomic.clone()));
    assert!(!lock.add_predicate_read(atomic));
    assert_eq!(lock.len(), 1);
}

#[test]
fn test_equal_point_reads_do_not_intersect() {
    let q1 = lock_of(&["orders.amount = 5"]);
    let q2 = lock_of(&["orders.amount = 5"]);
    assert!(!q1.intersect(&q2));
}

#[test]
fn test_range_intersects_any() {
    let q3 = lock_of(&["orders.amount BETWEEN 1 AND 10"]);
    let running = lock_of(&["orders.amount != 0"]);
    assert!(q3.intersect(&running));
    assert!(running.intersect(&q3));
}

#[test]
fn test_point_inside_range_intersects() {
    let point = lock_of(&["orders.amount = 5"]);
    let range = lock_of(&["orders.amount < 10"]);
    assert!(point.intersect(&range));
    assert!(range.intersect(&point));

    let outside = lock_of(&["orders.amount = 50"]);
    assert!(!outside.intersect(&range));
}

#[test]
fn test_disjoint_ranges_do_not_intersect() {
    let low = lock_of(&["orders.amount < 10"]);
    let high = lock_of(&["orders.amount >= 10"]);
    assert!(!low.intersect(&high));

    let touching = lock_of(&["orders.amount <= 10"]);
    assert!(touching.intersect(&high));
}

#[test]
fn test_different_attributes_never_intersect() {
    let a = lock_of(&["orders.amount != 1"]);
    let b = lock_of(&["orders.status != 'x'"]);
    let c = lock_of(&["customers.id != 1"]);
    assert!(!a.intersect(&b));
    assert!(!a.intersect(&c));
}

#[test]
fn test_empty_lock_never_intersects() {
    let empty = PredicateLock::new();
    let any = lock_of(&["orders.amount != 1"]);
    assert!(!empty.intersect(&any));
    assert!(!any.intersect(&empty));
}

#[test]
fn test_conflicts_lists_pairs() {
    let a = lock_of(&["orders.amount > 10", "orders.status = 'open'"]);
    let b = lock_of(&["orders.amount < 20", "orders.status = 'open'"]);
    let pairs = a.conflicts(&b);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0.column, col(0, 1));
}

#[test]
fn test_value_range_rejects_empty() {
    let err = ValueRange::new(Endpoint::Excluded(Scalar::I32(5)), Endpoint::Excluded(Scalar::I32(5)));
    assert!(matches!(err, Err(LockError::EmptyRange { .. })));
    assert!(ValueRange::closed(Scalar::I32(5), Scalar::I32(5)).is_ok());
}

#[test]
fn test_numeric_widths_compare_by_value() {
    let a = AtomicLock::new(col(0, 1), Constraint::Equals(Scalar::I64(7)));
    let b = AtomicLock::new(
        col(0, 1),
        Constraint::Range(ValueRange::closed(Scalar::F64(6.5), Scalar::I32(8)).unwrap()),
    );
    assert!(a.conflicts_with(&b));
}

#[test]
fn test_large_integer_against_float_bound_is_exact() {
    // 2^53 + 1 has no f64 representation; widening it would land on 2^53.
    let range = lock_of(&["orders.amount > 9007199254740992.0"]);
    let point = lock_of(&["orders.amount = 9007199254740993"]);
    assert!(range.intersect(&point));
    assert!(point.intersect(&range));

    let boundary = lock_of(&["orders.amount = 9007199254740992"]);
    assert!(!range.intersect(&boundary));
}

#[test]
fn test_integer_against_fractional_float() {
    assert_eq!(scalar_cmp(&Scalar::I64(3), &Scalar::F64(3.5)), Ordering::Less);
    assert_eq!(scalar_cmp(&Scalar::F64(-3.5), &Scalar::I32(-3)), Ordering::Less);
    assert_eq!(scalar_cmp(&Scalar::I64(i64::MAX), &Scalar::F64(9.3e18)), Ordering::Less);
    assert!(scalar_eq(&Scalar::I32(4), &Scalar::F32(4.0)));
    assert!(!scalar_eq(&Scalar::I64(9007199254740993), &Scalar::F64(9007199254740992.0)));
}

#[test]
fn test_digest_is_stable() {
    let a = lock_of(&["orders.amount > 10"]);
    let b = lock_of(&["orders.amount > 10"]);
    let c = lock_of(&["orders.amount > 11"]);
    assert_eq!(a.digest().unwrap(), b.digest().unwrap());
    assert_ne!(a.digest().unwrap(), c.digest().unwrap());
}

#[test]
fn test_describe_uses_catalog_names() {
    let catalog = sample_catalog();
    let lock = lock_of(&["orders.amount = 5"]);
    let lines = lock.describe(&catalog);
    assert_eq!(lines, vec!["orders.amount = 5".to_string()]);
    assert_eq!(catalog.column_name(col(0, 1)), "orders.amount");
}
