//! Tests for error types

use prometheus_admission::core::AdmissionError;
use prometheus_admission::util::ResourceKind;

#[test]
fn test_capacity_exceeded_error() {
    let err = AdmissionError::CapacityExceeded {
        kind: ResourceKind::Ram,
        requested: 5,
        capacity: 4,
    };
    assert_eq!(format!("{}", err), "capacity exceeded: requested 5 ram, capacity 4");
}

#[test]
fn test_invalid_release_error() {
    let err = AdmissionError::InvalidRelease("no outstanding grant".to_string());
    assert_eq!(format!("{}", err), "invalid release: no outstanding grant");
}

#[test]
fn test_invalid_config_error() {
    let err = AdmissionError::InvalidConfig("cpu capacity must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid config: cpu capacity must be greater than 0"
    );
}

#[test]
fn test_controller_closed_error() {
    assert_eq!(format!("{}", AdmissionError::ControllerClosed), "controller closed");
}

#[test]
fn test_error_converts_to_anyhow() {
    let app: prometheus_admission::core::AppResult<()> =
        Err(AdmissionError::InconsistentState("pools out of sync").into());
    let err = app.unwrap_err();
    assert_eq!(err.to_string(), "inconsistent state: pools out of sync");
    assert!(err.downcast_ref::<AdmissionError>().is_some());
}
