//! Audit sink implementations.
//!
//! The controller reports every admission decision to an optional sink. Events
//! are recorded inside the controller's critical section, so the order in a
//! sink is the order decisions were taken.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::{Priority, RequestId, ResourceAmounts};

/// Admission decision being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Request accepted and enqueued.
    Requested,
    /// Request granted and its requester signalled.
    Granted,
    /// Grant returned to the pools.
    Released,
    /// Request or release refused.
    Rejected,
    /// Requester dropped its handle before being granted.
    Abandoned,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::Granted => "granted",
            Self::Released => "released",
            Self::Rejected => "rejected",
            Self::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related request, if the decision concerned one.
    pub request_id: Option<RequestId>,
    /// Decision taken.
    pub action: AuditAction,
    /// Priority class of the request, if any.
    pub priority: Option<Priority>,
    /// Amounts requested, granted or released.
    pub amounts: ResourceAmounts,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Bounded in-memory audit sink for testing and dev.
///
/// Clones share the same buffer, so a test can keep one handle while the
/// controller owns another.
#[derive(Debug, Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Request ids for one action, in recording order.
    #[must_use]
    pub fn request_ids(&self, action: AuditAction) -> Vec<RequestId> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .filter_map(|e| e.request_id)
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Tracing-backed sink that emits one `info` line per decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            event_id = %event.event_id,
            request_id = ?event.request_id,
            action = %event.action,
            priority = ?event.priority,
            amounts = %event.amounts,
            detail = ?event.detail,
            "admission audit"
        );
    }
}

/// Helper to build an audit event from context.
#[must_use]
pub fn build_audit_event(
    request_id: Option<RequestId>,
    action: AuditAction,
    priority: Option<Priority>,
    amounts: ResourceAmounts,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        request_id,
        action,
        priority,
        amounts,
        created_at_ms: now_ms(),
        detail,
    }
}
