//! # Prometheus Admission
//!
//! Priority-aware admission control over several finite resource pools.
//!
//! An [`AdmissionController`](crate::core::AdmissionController) owns one pool per
//! resource type (CPU slots, RAM units, disk units) and two waiting lists, one
//! per priority class. A requester asks for an amount of every resource at
//! once; the request is granted only when every pool can cover its share, and
//! the reservation across pools happens in one indivisible step. Requesters
//! that cannot be served yet are parked until a release frees enough capacity.
//!
//! ## Key Features
//!
//! - **All-or-nothing reservation**: no partial allocations across pools
//! - **Two priority classes**: High heads are checked before Low heads on every evaluation
//! - **FIFO within a class**: arrival order breaks ties
//! - **Notification-driven waiting**: a one-shot signal per request, no polling
//! - **Early rejection**: requests larger than a pool's capacity fail immediately
//! - **Checked releases**: amounts must match an outstanding grant
//!
//! ## Grant Policy
//!
//! By default the controller uses *skip-ahead*: when the High head does not
//! fit but the Low head does, the Low request is granted. This keeps pools busy
//! but lets a stream of small Low requests overtake a large High one, and a
//! stream of High requests can starve Low ones.
//! [`GrantPolicy::StrictPriority`](crate::config::GrantPolicy::StrictPriority) refuses
//! Low grants while any High request waits. Each `request`/`release` grants at
//! most one waiter unless [`EvaluationMode::Drain`](crate::config::EvaluationMode::Drain)
//! is selected.
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_admission::core::AdmissionController;
//! use prometheus_admission::util::{Priority, ResourceAmounts};
//!
//! let controller = AdmissionController::new(2, 2, 2)?;
//!
//! let grant = controller
//!     .acquire(ResourceAmounts::new(1, 1, 1), Priority::High)
//!     .await?;
//! // ... do the work ...
//! controller.release_grant(grant)?;
//! ```
//!
//! For complete examples, see:
//! - `tests/admission_scenarios_test.rs` - Grant ordering scenarios
//! - `src/bin/admission_sim.rs` - Concurrent simulation

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission control: pools, waiting lists, controller and audit trail.
pub mod core;
/// Configuration models for capacities, grant policy and audit backend.
pub mod config;
/// Builders to construct controllers from configuration.
pub mod builders;
/// Runtime helpers driving the controller with concurrent tasks.
pub mod runtime;
/// Shared utilities.
pub mod util;
