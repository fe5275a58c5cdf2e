//! Workload YAML parsing and validation tests

use qadmit_sim::workload::Event;
use qadmit_sim::{parse_yaml_workload, QueryPlan, SimError};

const BASIC: &str = r#"
name: basic
config:
  profile_work_orders: true
relations:
  - name: orders
    attributes: [id, amount]
    partitions: 2
queries:
  - id: 1
    predicates: ["orders.amount > 100"]
    operators: [2, 1]
    rebuild: [1]
  - id: 2
    predicates: ["orders.id = 7"]
events:
  - op: submit
    queries: [1, 2]
  - op: complete
    query: 1
    operator: 0
    partition: 1
    worker: 3
    start: 10
    end: 20
  - op: new_block
    relation: orders
    block: 5
    partition: 0
  - op: feedback
    query: 1
    operator: 1
    payload: "hint"
  - op: promote
    capacity: 4
"#;

#[test]
fn test_parse_basic_workload() {
    let workload = parse_yaml_workload(BASIC).unwrap();
    assert_eq!(workload.name, "basic");
    assert!(workload.config.as_ref().unwrap().profile_work_orders);
    assert_eq!(workload.relations[0].partitions, Some(2));
    assert_eq!(workload.queries.len(), 2);
    assert_eq!(workload.queries[0].rebuild, vec![1]);
    // operators default to one operator with one work order
    assert_eq!(workload.queries[1].operators, vec![1]);
    assert_eq!(workload.events.len(), 5);

    match &workload.events[1] {
        Event::Complete { query, operator, partition, worker, start, end } => {
            assert_eq!((*query, *operator, *partition, *worker, *start, *end), (1, 0, 1, 3, 10, 20));
        }
        other => panic!("Expected complete, got {other:?}"),
    }
    assert!(matches!(workload.events[4], Event::Promote { capacity: Some(4) }));
    assert_eq!(workload.events[2].name(), "new_block");
}

#[test]
fn test_unknown_event_op_is_rejected() {
    let yaml = r#"
events:
  - op: explode
"#;
    assert!(matches!(parse_yaml_workload(yaml), Err(SimError::Yaml(_))));
}

#[test]
fn test_undeclared_query_is_rejected() {
    let yaml = r#"
queries:
  - id: 1
events:
  - op: submit
    queries: [1, 2]
"#;
    let err = parse_yaml_workload(yaml).unwrap_err();
    assert!(matches!(err, SimError::Workload(ref m) if m.contains("query 2")));
}

#[test]
fn test_undeclared_relation_is_rejected() {
    let yaml = r#"
events:
  - op: new_block
    relation: ghosts
    block: 1
"#;
    let err = parse_yaml_workload(yaml).unwrap_err();
    assert!(matches!(err, SimError::Workload(ref m) if m.contains("ghosts")));
}

#[test]
fn test_structural_errors() {
    let duplicate = r#"
queries:
  - id: 1
  - id: 1
events: []
"#;
    assert!(parse_yaml_workload(duplicate).is_err());

    let no_work = r#"
queries:
  - id: 1
    operators: [0]
events: []
"#;
    assert!(parse_yaml_workload(no_work).is_err());

    let empty_submit = r#"
events:
  - op: submit
    queries: []
"#;
    assert!(parse_yaml_workload(empty_submit).is_err());

    let zero_capacity = r#"
events:
  - op: promote
    capacity: 0
"#;
    assert!(parse_yaml_workload(zero_capacity).is_err());
}

#[test]
fn test_overflowing_work_orders_are_rejected() {
    let yaml = r#"
queries:
  - id: 1
    operators: [18446744073709551615]
    rebuild: [1]
events: []
"#;
    let err = parse_yaml_workload(yaml).unwrap_err();
    assert!(matches!(err, SimError::Workload(ref m) if m.contains("u64")));

    let plan = QueryPlan::new(&[u64::MAX, 1], &[]);
    assert_eq!(plan.total_work_orders(), None);
    assert!(plan.validate().is_err());
    assert_eq!(QueryPlan::new(&[2, 1], &[0, 3]).total_work_orders(), Some(6));
}
