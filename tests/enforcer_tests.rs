//! Admission controller tests: batch admission, waiting queue, promotion


use qadmit_core::config::PolicyConfig;
use qadmit_exec::{Dispatch, ExecError, PolicyEnforcer, QueryStatus};
use test_fixtures::*;

#[test]
fn test_equal_point_reads_run_concurrently() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::unbounded());
    let q1 = handle(1, &["orders.amount = 5"], &catalog);
    let q2 = handle(2, &["orders.amount = 5"], &catalog);

    assert!(enforcer.admit_queries(&[q1, q2]).unwrap());
    assert_eq!(enforcer.running_ids(), qids(&[1, 2]));
    assert_eq!(enforcer.num_waiting(), 0);
    enforcer.check_mutual_exclusion().unwrap();
}

#[test]
fn test_range_against_running_any_is_queued() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::unbounded());
    let running = handle(1, &["orders.amount != 0"], &catalog);
    assert!(enforcer.admit_queries(&[running]).unwrap());

    let q3 = handle(3, &["orders.amount BETWEEN 1 AND 10"], &catalog);
    assert!(!enforcer.admit_queries(&[q3]).unwrap());
    assert!(enforcer.is_waiting(qid(3)));
    assert!(!enforcer.is_running(qid(3)));
    // conflicting queries never reach the strategy
    assert_eq!(enforcer.strategy().admit_attempts, qids(&[1]));
}

#[test]
fn test_conflict_within_one_batch() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::unbounded());
    let first = handle(1, &["orders.amount > 10"], &catalog);
    let second = handle(2, &["orders.amount < 20"], &catalog);

    assert!(!enforcer.admit_queries(&[first, second]).unwrap());
    assert_eq!(enforcer.running_ids(), qids(&[1]));
    assert_eq!(enforcer.waiting_ids(), qids(&[2]));
}

#[test]
fn test_resource_denial_queues_without_error() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::new(1));
    let a = handle(1, &["orders.amount = 1"], &catalog);
    let b = handle(2, &["orders.amount = 2"], &catalog);

    assert!(!enforcer.admit_queries(&[a, b]).unwrap());
    assert_eq!(enforcer.running_ids(), qids(&[1]));
    assert_eq!(enforcer.waiting_ids(), qids(&[2]));
    assert_eq!(enforcer.strategy().admit_attempts, qids(&[1, 2]));
}

#[test]
fn test_fifo_promotion_order() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::new(1));
    let batch = vec![
        handle(1, &["orders.amount = 1"], &catalog),
        handle(2, &["orders.amount = 2"], &catalog),
        handle(3, &["orders.amount = 3"], &catalog),
    ];
    enforcer.admit_queries(&batch).unwrap();
    assert_eq!(enforcer.waiting_ids(), qids(&[2, 3]));

    let out = enforcer.process_message(&work_order_complete(1, 0, 0)).unwrap();
    assert_eq!(out, Dispatch::Retired { query_id: qid(1), promoted: qids(&[2]) });
    assert_eq!(enforcer.waiting_ids(), qids(&[3]));

    let out = enforcer.process_message(&work_order_complete(2, 0, 0)).unwrap();
    assert_eq!(out, Dispatch::Retired { query_id: qid(2), promoted: qids(&[3]) });
    assert_eq!(enforcer.num_waiting(), 0);
}

#[test]
fn test_one_pass_promotes_every_admissible_head() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::unbounded());
    let blocker = handle(1, &["orders.amount != 0"], &catalog);
    let waiting = vec![
        handle(2, &["orders.amount = 5"], &catalog),
        handle(3, &["orders.amount = 6"], &catalog),
    ];
    enforcer.admit_queries(&[blocker]).unwrap();
    enforcer.admit_queries(&waiting).unwrap();
    assert_eq!(enforcer.waiting_ids(), qids(&[2, 3]));

    let out = enforcer.process_message(&work_order_complete(1, 0, 0)).unwrap();
    assert_eq!(out, Dispatch::Retired { query_id: qid(1), promoted: qids(&[2, 3]) });
    assert_eq!(enforcer.running_ids(), qids(&[2, 3]));
}

#[test]
fn test_head_of_line_blocking() {
    let catalog = sample_catalog();
    let strategy = RecordingStrategy::unbounded().with_plan(2, &[2]);
    let mut enforcer = enforcer(strategy);

    let a = handle(1, &["orders.amount < 100"], &catalog);
    let b = handle(2, &["orders.amount > 500"], &catalog);
    enforcer.admit_queries(&[a, b]).unwrap();
    assert_eq!(enforcer.running_ids(), qids(&[1, 2]));

    // head conflicts with both running queries
    let head = handle(3, &["orders.amount != 0"], &catalog);
    enforcer.admit_queries(&[head]).unwrap();

    // lock-compatible with everything, queued only because resources were denied
    let behind = handle(4, &["orders.status = 'open'"], &catalog);
    enforcer.strategy_mut().deny_next = 1;
    enforcer.admit_queries(&[behind]).unwrap();
    assert_eq!(enforcer.waiting_ids(), qids(&[3, 4]));

    // 2 still runs, so head 3 still conflicts; 4 would fit but is never considered
    let out = enforcer.process_message(&work_order_complete(1, 0, 0)).unwrap();
    assert_eq!(out, Dispatch::Retired { query_id: qid(1), promoted: vec![] });
    assert_eq!(enforcer.waiting_ids(), qids(&[3, 4]));
    assert!(!enforcer.is_running(qid(4)));
    assert_eq!(enforcer.strategy().admit_attempts, qids(&[1, 2, 4]));

    // once 2 retires the head goes first, then 4 behind it
    enforcer.process_message(&work_order_complete(2, 0, 0)).unwrap();
    let out = enforcer.process_message(&work_order_complete(2, 0, 1)).unwrap();
    assert_eq!(out, Dispatch::Retired { query_id: qid(2), promoted: qids(&[3, 4]) });
}

#[test]
fn test_denied_head_ends_pass_after_bounded_attempts() {
    let catalog = sample_catalog();
    let config = PolicyConfig {
        promotion_attempts: 3,
        ..PolicyConfig::default()
    };
    let mut enforcer =
        PolicyEnforcer::new(config, RecordingStrategy::new(1), sample_catalog()).unwrap();
    enforcer
        .admit_queries(&[
            handle(1, &["orders.amount = 1"], &catalog),
            handle(2, &["orders.amount = 2"], &catalog),
        ])
        .unwrap();

    enforcer.strategy_mut().deny_next = 5;
    let out = enforcer.process_message(&work_order_complete(1, 0, 0)).unwrap();
    assert_eq!(out, Dispatch::Retired { query_id: qid(1), promoted: vec![] });
    assert_eq!(enforcer.waiting_ids(), qids(&[2]));
    // initial attempt for 1 and 2, then exactly three retries of 2
    assert_eq!(enforcer.strategy().admit_attempts, qids(&[1, 2, 2, 2, 2]));

    // external backoff signal: resources are back
    enforcer.strategy_mut().deny_next = 0;
    assert_eq!(enforcer.promote_waiting().unwrap(), qids(&[2]));
    assert!(enforcer.is_running(qid(2)));
}

#[test]
fn test_promote_waiting_on_empty_queue() {
    let mut enforcer = enforcer(RecordingStrategy::unbounded());
    assert!(enforcer.promote_waiting().unwrap().is_empty());
}

#[test]
fn test_empty_batch_is_rejected() {
    let mut enforcer = enforcer(RecordingStrategy::unbounded());
    assert!(matches!(enforcer.admit_queries(&[]), Err(ExecError::EmptyBatch)));
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::unbounded());
    let a = handle(1, &["orders.amount = 1"], &catalog);

    let err = enforcer.admit_queries(&[a.clone(), a.clone()]).unwrap_err();
    assert!(matches!(err, ExecError::DuplicateQuery(id) if id == qid(1)));
    assert!(!enforcer.has_queries());

    enforcer.admit_queries(&[a.clone()]).unwrap();
    assert!(matches!(
        enforcer.admit_queries(&[a.clone()]),
        Err(ExecError::DuplicateQuery(_))
    ));

    // retired ids stay taken
    enforcer.process_message(&work_order_complete(1, 0, 0)).unwrap();
    assert!(!enforcer.has_queries());
    assert!(matches!(enforcer.admit_queries(&[a]), Err(ExecError::DuplicateQuery(_))));
}

#[test]
fn test_strategy_error_propagates_and_releases_lock() {
    let catalog = sample_catalog();
    let mut strategy = RecordingStrategy::unbounded();
    strategy.fail_on = Some(qid(2));
    let mut enforcer = enforcer(strategy);

    let err = enforcer
        .admit_queries(&[
            handle(1, &["orders.amount = 1"], &catalog),
            handle(2, &["orders.amount = 2"], &catalog),
        ])
        .unwrap_err();
    assert!(matches!(err, ExecError::StateMachine(ref msg) if msg.contains("admitting query 2")));
    assert!(enforcer.is_running(qid(1)));
    assert!(enforcer.lock_for(qid(2)).is_none());
}

#[test]
fn test_remove_query_erases_state() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::unbounded().with_plan(1, &[2]));
    enforcer
        .admit_queries(&[handle(1, &["orders.amount = 1"], &catalog)])
        .unwrap();

    // unfinished: allowed, only logged
    let sm = enforcer.remove_query(qid(1)).unwrap();
    assert!(!sm.execution_state().has_query_execution_finished());
    assert!(!enforcer.is_running(qid(1)));
    assert!(enforcer.lock_for(qid(1)).is_none());
    assert!(matches!(enforcer.state_machine(qid(1)), Err(ExecError::UnknownQuery(_))));
    assert!(matches!(enforcer.remove_query(qid(1)), Err(ExecError::UnknownQuery(_))));
}

#[test]
fn test_removing_running_query_frees_capacity() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::new(1).with_plan(1, &[2]));
    enforcer
        .admit_queries(&[handle(1, &["orders.amount = 1"], &catalog)])
        .unwrap();
    assert!(!enforcer
        .admit_queries(&[handle(2, &["orders.amount = 2"], &catalog)])
        .unwrap());
    assert_eq!(enforcer.waiting_ids(), qids(&[2]));

    enforcer.remove_query(qid(1)).unwrap();
    assert_eq!(enforcer.running_ids(), qids(&[2]));
    assert_eq!(enforcer.num_waiting(), 0);
    assert_eq!(enforcer.strategy().running, 1);
    assert_eq!(enforcer.strategy().completed, qids(&[1]));

    // capacity is free again once the promoted query goes too
    enforcer.remove_query(qid(2)).unwrap();
    assert!(enforcer
        .admit_queries(&[handle(3, &["orders.amount = 3"], &catalog)])
        .unwrap());
}

#[test]
fn test_has_queries_tracks_running_and_waiting() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::new(1));
    assert!(!enforcer.has_queries());
    enforcer
        .admit_queries(&[
            handle(1, &["orders.amount = 1"], &catalog),
            handle(2, &["orders.amount = 2"], &catalog),
        ])
        .unwrap();
    assert!(enforcer.has_queries());

    enforcer.process_message(&work_order_complete(1, 0, 0)).unwrap();
    assert!(enforcer.has_queries());
    enforcer.process_message(&work_order_complete(2, 0, 0)).unwrap();
    assert!(!enforcer.has_queries());
}

#[test]
fn test_mutual_exclusion_holds_through_a_mixed_run() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::new(2));
    let batch = vec![
        handle(1, &["orders.amount BETWEEN 0 AND 50"], &catalog),
        handle(2, &["orders.amount = 25"], &catalog),
        handle(3, &["orders.amount > 100"], &catalog),
        handle(4, &["orders.status = 'open'"], &catalog),
        handle(5, &["orders.amount < 200"], &catalog),
    ];
    enforcer.admit_queries(&batch).unwrap();
    enforcer.check_mutual_exclusion().unwrap();

    for _ in 0..10 {
        let Some(id) = enforcer.running_ids().first().copied() else {
            break;
        };
        let out = enforcer.process_message(&work_order_complete(id.get(), 0, 0)).unwrap();
        assert!(matches!(out, Dispatch::Retired { .. }));
        enforcer.check_mutual_exclusion().unwrap();
    }
    assert!(!enforcer.has_queries());
    assert_eq!(enforcer.strategy().completed.len(), 5);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = PolicyConfig {
        promotion_attempts: 0,
        ..PolicyConfig::default()
    };
    let result = PolicyEnforcer::new(config, RecordingStrategy::unbounded(), sample_catalog());
    assert!(matches!(result, Err(ExecError::Config(_))));
}

#[test]
fn test_operator_status_is_reported() {
    let catalog = sample_catalog();
    let mut enforcer = enforcer(RecordingStrategy::unbounded().with_plan(1, &[1, 1]));
    enforcer
        .admit_queries(&[handle(1, &["orders.amount = 1"], &catalog)])
        .unwrap();
    let out = enforcer.process_message(&work_order_complete(1, 0, 0)).unwrap();
    assert_eq!(
        out,
        Dispatch::Routed {
            query_id: qid(1),
            status: QueryStatus::OperatorExecuted
        }
    );
}
