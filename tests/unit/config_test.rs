//! Tests for configuration validation

use prometheus_des::config::{QueueDiscipline, ResourceConfig, SimulationConfig};

fn resource(capacity: usize) -> ResourceConfig {
    ResourceConfig {
        capacity,
        discipline: QueueDiscipline::Fifo,
        max_queue_depth: None,
    }
}

#[test]
fn test_resource_config_validation() {
    assert!(resource(2).validate().is_ok());
}

#[test]
fn test_resource_config_invalid_capacity() {
    assert!(resource(0).validate().is_err());
}

#[test]
fn test_resource_config_invalid_queue_depth() {
    let invalid = ResourceConfig {
        max_queue_depth: Some(0),
        ..resource(1)
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_simulation_config_validation() {
    let mut cfg = SimulationConfig::default();
    cfg.resources.insert("desk".into(), resource(1));
    assert!(cfg.validate().is_ok());

    cfg.resources.insert("broken".into(), resource(0));
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("broken"));
}

#[test]
fn test_simulation_config_rejects_non_finite_epoch() {
    let cfg = SimulationConfig {
        initial_time: f64::NAN,
        ..SimulationConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let json = r#"{
        "initial_time": 60.0,
        "resources": {
            "repairman": { "capacity": 1, "discipline": "preemptive" },
            "pumps": { "capacity": 2, "max_queue_depth": 10 }
        }
    }"#;
    let cfg = SimulationConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.initial_time, 60.0);
    assert_eq!(cfg.resources["repairman"].discipline, QueueDiscipline::Preemptive);
    assert_eq!(cfg.resources["pumps"].discipline, QueueDiscipline::Fifo);
    assert_eq!(cfg.resources["pumps"].max_queue_depth, Some(10));
}

#[test]
fn test_from_json_str_defaults() {
    let cfg = SimulationConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg.initial_time, 0.0);
    assert!(cfg.resources.is_empty());
}

#[test]
fn test_from_json_str_errors() {
    let err = SimulationConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));

    let err = SimulationConfig::from_json_str(r#"{"resources": {"x": {"capacity": 0}}}"#)
        .unwrap_err();
    assert!(err.contains("capacity"));
}
