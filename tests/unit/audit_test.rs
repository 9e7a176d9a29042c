//! Tests for audit sink

use prometheus_admission::core::{
    build_audit_event, AdmissionController, AuditAction, AuditSink, InMemoryAuditSink,
    TracingAuditSink,
};
use prometheus_admission::util::{Priority, ResourceAmounts};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        Some(7),
        AuditAction::Requested,
        Some(Priority::High),
        ResourceAmounts::uniform(1),
        Some("detail".to_string()),
    );

    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(events[0].request_id, Some(7));
    assert_eq!(events[0].action, AuditAction::Requested);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    let amounts = ResourceAmounts::uniform(1);

    sink.record(build_audit_event(Some(1), AuditAction::Requested, None, amounts, None));
    sink.record(build_audit_event(Some(2), AuditAction::Requested, None, amounts, None));
    sink.record(build_audit_event(Some(3), AuditAction::Requested, None, amounts, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].request_id, Some(2)); // First one popped
    assert_eq!(events[1].request_id, Some(3));
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        None,
        AuditAction::Rejected,
        Some(Priority::Low),
        ResourceAmounts::new(9, 0, 0),
        Some("too big".to_string()),
    );

    assert_eq!(event.request_id, None);
    assert_eq!(event.action, AuditAction::Rejected);
    assert_eq!(event.priority, Some(Priority::Low));
    assert_eq!(event.amounts, ResourceAmounts::new(9, 0, 0));
    assert_eq!(event.detail, Some("too big".to_string()));
    assert!(event.created_at_ms > 0);
    assert_eq!(event.event_id.len(), 36);
}

#[test]
fn test_clones_share_buffer() {
    let sink = InMemoryAuditSink::new(4);
    let mut writer = sink.clone();
    writer.record(build_audit_event(
        Some(1),
        AuditAction::Granted,
        Some(Priority::High),
        ResourceAmounts::uniform(1),
        None,
    ));
    assert_eq!(sink.request_ids(AuditAction::Granted), vec![1]);
}

#[test]
fn test_controller_records_rejections() {
    let sink = InMemoryAuditSink::new(16);
    let controller = AdmissionController::new(1, 1, 1)
        .unwrap()
        .with_audit(Box::new(sink.clone()));

    assert!(controller
        .request(ResourceAmounts::new(1, 1, 2), Priority::High)
        .is_err());
    assert!(controller.release(ResourceAmounts::uniform(1)).is_err());

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.action == AuditAction::Rejected));
    assert!(events[0].detail.as_deref().unwrap().contains("disk"));
}

#[test]
fn test_tracing_sink_accepts_events() {
    let mut sink = TracingAuditSink;
    sink.record(build_audit_event(
        Some(1),
        AuditAction::Released,
        None,
        ResourceAmounts::uniform(1),
        None,
    ));
}
