//! Configuration models for the controller, grant policy and audit backend.

pub mod controller;

pub use controller::{
    AuditBackendConfig, ControllerConfig, EvaluationMode, GrantPolicy, ENV_AUDIT,
    ENV_CPU_CAPACITY, ENV_DISK_CAPACITY, ENV_EVALUATION, ENV_POLICY, ENV_RAM_CAPACITY,
};
