//! Tests for utility functions

use prometheus_admission::util::{
    init_tracing, now_ms, Priority, RequestId, ResourceAmounts, ResourceKind,
};

#[test]
fn test_priority_ordering() {
    assert!(Priority::High > Priority::Low);
    assert_eq!(Priority::EVALUATION_ORDER, [Priority::High, Priority::Low]);
}

#[test]
fn test_resource_amounts() {
    let amounts = ResourceAmounts::new(1, 2, 3);
    assert_eq!(amounts.get(ResourceKind::Disk), 3);
    assert!(!amounts.is_zero());
    assert_eq!(ResourceAmounts::uniform(4), ResourceAmounts::new(4, 4, 4));
}

#[test]
fn test_amounts_serde_shape() {
    let json = serde_json::to_string(&ResourceAmounts::new(1, 2, 3)).unwrap();
    assert_eq!(json, r#"{"cpu":1,"ram":2,"disk":3}"#);
    let priority: Priority = serde_json::from_str(r#""high""#).unwrap();
    assert_eq!(priority, Priority::High);
}

#[test]
fn test_request_id() {
    let id: RequestId = 12345;
    assert_eq!(id, 12345);
}

#[test]
fn test_now_ms_advances() {
    let a = now_ms();
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert!(now_ms() > a);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    assert!(tracing::dispatcher::has_been_set());
}
