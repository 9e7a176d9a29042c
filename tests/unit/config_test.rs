//! Tests for configuration validation

use prometheus_admission::config::{AuditBackendConfig, ControllerConfig, EvaluationMode, GrantPolicy};
use prometheus_admission::util::ResourceAmounts;

#[test]
fn test_controller_config_validation() {
    let valid = ControllerConfig::new(2, 2, 2);
    assert!(valid.validate().is_ok());
    assert_eq!(valid.capacities(), ResourceAmounts::uniform(2));
}

#[test]
fn test_controller_config_invalid_capacity() {
    let invalid = ControllerConfig::new(2, 0, 2);
    let err = invalid.validate().unwrap_err();
    assert_eq!(err, "ram_capacity must be greater than 0");
}

#[test]
fn test_controller_config_from_json() {
    let json = r#"{
        "cpu_capacity": 2,
        "ram_capacity": 4,
        "disk_capacity": 8,
        "policy": "strict_priority",
        "evaluation": "drain",
        "audit": "tracing"
    }"#;

    let config = ControllerConfig::from_json_str(json).unwrap();
    assert_eq!(config.capacities(), ResourceAmounts::new(2, 4, 8));
    assert_eq!(config.policy, GrantPolicy::StrictPriority);
    assert_eq!(config.evaluation, EvaluationMode::Drain);
    assert_eq!(config.audit, AuditBackendConfig::Tracing);
}

#[test]
fn test_controller_config_json_defaults() {
    let json = r#"{"cpu_capacity": 1, "ram_capacity": 1, "disk_capacity": 1}"#;
    let config = ControllerConfig::from_json_str(json).unwrap();
    assert_eq!(config.policy, GrantPolicy::SkipAhead);
    assert_eq!(config.evaluation, EvaluationMode::Single);
    assert_eq!(config.audit, AuditBackendConfig::Disabled);
}

#[test]
fn test_controller_config_json_rejects_zero_and_garbage() {
    let zero = r#"{"cpu_capacity": 0, "ram_capacity": 1, "disk_capacity": 1}"#;
    assert!(ControllerConfig::from_json_str(zero).is_err());

    let err = ControllerConfig::from_json_str("{not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_policy_from_str() {
    assert_eq!("skip_ahead".parse::<GrantPolicy>(), Ok(GrantPolicy::SkipAhead));
    assert_eq!(" Drain ".parse::<EvaluationMode>(), Ok(EvaluationMode::Drain));
    assert!("fair_share".parse::<GrantPolicy>().is_err());
}
