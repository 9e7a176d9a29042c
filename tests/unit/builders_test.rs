//! Tests for builder modules

use prometheus_admission::builders::{build_controller, ControllerBuilder};
use prometheus_admission::config::{AuditBackendConfig, ControllerConfig, EvaluationMode, GrantPolicy};
use prometheus_admission::core::{AdmissionError, AuditAction, InMemoryAuditSink};
use prometheus_admission::util::{Priority, ResourceAmounts};

#[test]
fn test_controller_builder_defaults() {
    let config = ControllerConfig::new(4, 8, 16);
    let builder = ControllerBuilder::new(config);
    assert_eq!(builder.config().cpu_capacity, 4);

    let controller = builder.build().unwrap();
    assert_eq!(controller.capacities(), ResourceAmounts::new(4, 8, 16));
    assert_eq!(controller.policy(), GrantPolicy::SkipAhead);
    assert_eq!(controller.evaluation_mode(), EvaluationMode::Single);
}

#[test]
fn test_build_controller_applies_policy() {
    let config = ControllerConfig::new(1, 1, 1)
        .with_policy(GrantPolicy::StrictPriority)
        .with_evaluation(EvaluationMode::Drain)
        .with_audit(AuditBackendConfig::Tracing);
    let controller = build_controller(&config).unwrap();
    assert_eq!(controller.policy(), GrantPolicy::StrictPriority);
    assert_eq!(controller.evaluation_mode(), EvaluationMode::Drain);
}

#[test]
fn test_build_controller_rejects_invalid_config() {
    let err = build_controller(&ControllerConfig::new(0, 1, 1)).unwrap_err();
    assert!(matches!(err, AdmissionError::InvalidConfig(msg) if msg.starts_with("config invalid")));
}

#[test]
fn test_builder_audit_sink_overrides_backend() {
    let sink = InMemoryAuditSink::new(16);
    let controller = ControllerBuilder::new(ControllerConfig::new(1, 1, 1))
        .with_audit_sink(Box::new(sink.clone()))
        .build()
        .unwrap();

    let mut pending = controller
        .request(ResourceAmounts::uniform(1), Priority::High)
        .unwrap();
    let grant = pending.try_take().unwrap().unwrap();
    controller.release_grant(grant).unwrap();

    let actions: Vec<_> = sink.events().iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Requested, AuditAction::Granted, AuditAction::Released]
    );
}
