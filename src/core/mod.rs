//! Core admission control: pools, waiting lists, controller and audit trail.

pub mod admission_queue;
pub mod audit;
pub mod controller;
pub mod error;
pub mod resource_pool;

pub use admission_queue::{AdmissionQueue, RequestState, ResourceRequest};
pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink,
};
pub use controller::{AdmissionController, ControllerSnapshot, Grant, PendingGrant};
pub use error::{AdmissionError, AdmissionResult, AppResult};
pub use resource_pool::{PoolSet, ResourcePool};
