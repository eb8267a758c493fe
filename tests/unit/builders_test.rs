//! Tests for builder modules

use prometheus_des::builders::{build_resources, ResourceHandle};
use prometheus_des::config::{QueueDiscipline, ResourceConfig, SimulationConfig};
use prometheus_des::core::{Environment, SimError};

#[test]
fn test_build_resources_from_json() {
    let cfg = SimulationConfig::from_json_str(
        r#"{
            "initial_time": 5.0,
            "resources": {
                "counter": { "capacity": 2 },
                "doctor": { "capacity": 1, "discipline": "priority" },
                "repairman": { "capacity": 1, "discipline": "preemptive", "max_queue_depth": 4 }
            }
        }"#,
    )
    .unwrap();
    let env = Environment::from_config(&cfg).unwrap();
    assert_eq!(env.now(), 5.0);

    let resources = build_resources(&env, &cfg).unwrap();
    assert_eq!(resources.len(), 3);
    assert!(matches!(resources["counter"], ResourceHandle::Fifo(_)));
    assert_eq!(resources["counter"].capacity(), 2);
    assert_eq!(resources["doctor"].discipline(), QueueDiscipline::Priority);
    match &resources["repairman"] {
        ResourceHandle::Preemptive(r) => assert_eq!(r.max_queue_depth(), Some(4)),
        other => panic!("unexpected handle {other:?}"),
    }
}

#[test]
fn test_build_resources_assigns_distinct_ids() {
    let mut cfg = SimulationConfig::default();
    for name in ["a", "b"] {
        cfg.resources.insert(
            name.into(),
            ResourceConfig {
                capacity: 1,
                discipline: QueueDiscipline::Fifo,
                max_queue_depth: None,
            },
        );
    }
    let env = Environment::new();
    let resources = build_resources(&env, &cfg).unwrap();
    assert_ne!(resources["a"].id(), resources["b"].id());
}

#[test]
fn test_build_resources_invalid_config() {
    let mut cfg = SimulationConfig::default();
    cfg.resources.insert(
        "empty".into(),
        ResourceConfig {
            capacity: 0,
            discipline: QueueDiscipline::Priority,
            max_queue_depth: None,
        },
    );
    let env = Environment::new();
    assert!(matches!(
        build_resources(&env, &cfg),
        Err(SimError::InvalidConfig(_))
    ));
}

#[test]
fn test_handle_request_grants_slot() {
    let env = Environment::new();
    let handle = ResourceHandle::build(
        &env,
        &ResourceConfig {
            capacity: 1,
            discipline: QueueDiscipline::Priority,
            max_queue_depth: None,
        },
    )
    .unwrap();
    let req = handle.request(3, false).unwrap();
    assert!(req.is_triggered());
    assert_eq!(req.priority(), 3);
    assert_eq!(handle.count(), 1);
}
