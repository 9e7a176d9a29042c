//! Error types for admission operations.

use thiserror::Error;

use crate::util::serde::ResourceKind;

/// Errors produced by the admission controller and its pools.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// A request asks for more of a resource than the pool will ever hold.
    #[error("capacity exceeded: requested {requested} {kind}, capacity {capacity}")]
    CapacityExceeded {
        /// Resource whose capacity is too small.
        kind: ResourceKind,
        /// Units asked for.
        requested: u32,
        /// Fixed capacity of the pool.
        capacity: u32,
    },
    /// Release amounts do not correspond to an outstanding grant.
    #[error("invalid release: {0}")]
    InvalidRelease(String),
    /// Controller configuration rejected.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Internal accounting guard tripped.
    #[error("inconsistent state: {0}")]
    InconsistentState(&'static str),
    /// The controller went away while a request was still pending.
    #[error("controller closed")]
    ControllerClosed,
}

/// Result alias for admission operations.
pub type AdmissionResult<T> = Result<T, AdmissionError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
