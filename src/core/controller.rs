//! Priority-aware admission controller over the CPU, RAM and disk pools.
//!
//! Every pool and both waiting lists live in one [`ControllerState`] behind a
//! single `parking_lot::Mutex`. `request` and `release` each take that lock
//! once, mutate, run grant evaluation and fire any completion signal before
//! unlocking. Requesters wait on a `tokio::sync::oneshot` receiver with the
//! lock released.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::config::{EvaluationMode, GrantPolicy};
use crate::core::admission_queue::{AdmissionQueue, ResourceRequest};
use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::resource_pool::{PoolSet, ResourcePool};
use crate::core::{AdmissionError, AdmissionResult};
use crate::util::serde::{Priority, RequestId, ResourceAmounts};

/// Resources held on behalf of one request until released.
///
/// Not `Clone`: handing a grant to [`AdmissionController::release_grant`]
/// consumes it, so the same grant cannot be returned twice.
#[derive(Debug, PartialEq, Eq)]
pub struct Grant {
    id: RequestId,
    controller: Uuid,
    amounts: ResourceAmounts,
    priority: Priority,
}

impl Grant {
    /// Id of the request this grant satisfied (its arrival sequence).
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Amounts reserved.
    #[must_use]
    pub const fn amounts(&self) -> ResourceAmounts {
        self.amounts
    }

    /// Priority class of the original request.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }
}

/// Completion signal for a request.
///
/// Resolves to the [`Grant`] once the controller reserves the resources.
/// Dropping it before then abandons the request. Dropping it after the grant
/// was issued but before it was taken returns the resources to the pools.
pub struct PendingGrant {
    id: RequestId,
    priority: Priority,
    amounts: ResourceAmounts,
    rx: Option<oneshot::Receiver<Grant>>,
    controller: Weak<Mutex<ControllerState>>,
}

impl fmt::Debug for PendingGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingGrant")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("amounts", &self.amounts)
            .finish_non_exhaustive()
    }
}

impl PendingGrant {
    /// Arrival sequence of the underlying request.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Priority class of the request.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Amounts requested.
    #[must_use]
    pub const fn amounts(&self) -> ResourceAmounts {
        self.amounts
    }

    /// Take the grant if it has already been issued, without waiting.
    ///
    /// Yields `Some` at most once with a grant.
    pub fn try_take(&mut self) -> Option<AdmissionResult<Grant>> {
        let rx = self.rx.as_mut()?;
        match rx.try_recv() {
            Ok(grant) => {
                self.rx = None;
                Some(Ok(grant))
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(AdmissionError::ControllerClosed)),
        }
    }

    /// Block the current OS thread until the grant arrives.
    ///
    /// Must not be called from inside an async runtime; await the handle there.
    ///
    /// # Errors
    /// `ControllerClosed` if the controller was dropped first.
    pub fn blocking_wait(mut self) -> AdmissionResult<Grant> {
        let rx = self.rx.take().ok_or(AdmissionError::ControllerClosed)?;
        rx.blocking_recv()
            .map_err(|_| AdmissionError::ControllerClosed)
    }
}

impl Drop for PendingGrant {
    fn drop(&mut self) {
        let Some(mut rx) = self.rx.take() else {
            return;
        };
        // Closing first means no grant can land after the check below.
        rx.close();
        let Ok(grant) = rx.try_recv() else {
            return;
        };
        let Some(shared) = self.controller.upgrade() else {
            return;
        };
        let mut state = shared.lock();
        tracing::debug!(request_id = grant.id, "granted handle dropped, returning resources");
        if let Err(err) = state.return_grant(&grant) {
            tracing::warn!(request_id = grant.id, error = %err, "dropped grant not returned");
        }
    }
}

impl Future for PendingGrant {
    type Output = AdmissionResult<Grant>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(rx) = this.rx.as_mut() else {
            return Poll::Ready(Err(AdmissionError::ControllerClosed));
        };
        let res = match Pin::new(rx).poll(cx) {
            Poll::Ready(res) => res,
            Poll::Pending => return Poll::Pending,
        };
        this.rx = None;
        Poll::Ready(res.map_err(|_| AdmissionError::ControllerClosed))
    }
}

/// Point-in-time view of the controller, taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    /// Pools in kind order.
    pub pools: Vec<ResourcePool>,
    /// High-priority requests waiting.
    pub queued_high: usize,
    /// Low-priority requests waiting.
    pub queued_low: usize,
    /// Grants not yet released.
    pub outstanding_grants: usize,
    /// Sum of amounts held by outstanding grants.
    pub held: ResourceAmounts,
}

impl ControllerSnapshot {
    /// Requests waiting across both classes.
    #[must_use]
    pub const fn queued(&self) -> usize {
        self.queued_high + self.queued_low
    }

    /// Available units per kind.
    #[must_use]
    pub fn available(&self) -> ResourceAmounts {
        let mut out = ResourceAmounts::default();
        for pool in &self.pools {
            *out.get_mut(pool.kind()) = pool.available();
        }
        out
    }
}

struct ControllerState {
    instance: Uuid,
    pools: PoolSet,
    queue: AdmissionQueue,
    outstanding: BTreeMap<RequestId, ResourceAmounts>,
    policy: GrantPolicy,
    evaluation: EvaluationMode,
    audit: Option<Box<dyn AuditSink>>,
}

impl ControllerState {
    fn audit(
        &mut self,
        request_id: Option<RequestId>,
        action: AuditAction,
        priority: Option<Priority>,
        amounts: ResourceAmounts,
        detail: Option<String>,
    ) {
        if let Some(sink) = self.audit.as_mut() {
            sink.record(build_audit_event(request_id, action, priority, amounts, detail));
        }
    }

    fn prune_abandoned(&mut self) {
        for priority in Priority::EVALUATION_ORDER {
            for request in self.queue.prune_abandoned_heads(priority) {
                tracing::debug!(
                    request_id = request.arrival_sequence(),
                    %priority,
                    "discarding abandoned request"
                );
                self.audit(
                    Some(request.arrival_sequence()),
                    AuditAction::Abandoned,
                    Some(priority),
                    *request.amounts(),
                    None,
                );
            }
        }
    }

    /// Class whose head should be granted next, if any.
    fn select_head(&self) -> Option<Priority> {
        if let Some(high) = self.queue.peek_head(Priority::High) {
            if self.pools.can_satisfy_all(high.amounts()) {
                return Some(Priority::High);
            }
            if self.policy == GrantPolicy::StrictPriority {
                return None;
            }
        }
        self.queue
            .peek_head(Priority::Low)
            .filter(|low| self.pools.can_satisfy_all(low.amounts()))
            .map(|_| Priority::Low)
    }

    /// One grant-evaluation pass. Returns whether a requester was granted.
    fn grant_next(&mut self) -> AdmissionResult<bool> {
        loop {
            self.prune_abandoned();
            let Some(priority) = self.select_head() else {
                return Ok(false);
            };
            let request = self
                .queue
                .pop_head(priority)
                .ok_or(AdmissionError::InconsistentState("selected queue head vanished"))?;
            if self.deliver(request, priority)? {
                return Ok(true);
            }
        }
    }

    /// Reserve for a popped head and send its grant. Returns `false` when the
    /// requester left before the send; the reservation is rolled back then.
    fn deliver(&mut self, request: ResourceRequest, priority: Priority) -> AdmissionResult<bool> {
        let id = request.arrival_sequence();
        let amounts = *request.amounts();

        self.pools.reserve_all(&amounts)?;
        self.outstanding.insert(id, amounts);

        let grant = Grant {
            id,
            controller: self.instance,
            amounts,
            priority,
        };
        match request.complete(grant) {
            Ok(()) => {
                tracing::info!(request_id = id, %priority, %amounts, "request granted");
                self.audit(Some(id), AuditAction::Granted, Some(priority), amounts, None);
                Ok(true)
            }
            Err(grant) => {
                self.outstanding.remove(&id);
                self.pools.release_all(&grant.amounts)?;
                tracing::debug!(request_id = id, "grant undelivered, reservation rolled back");
                self.audit(Some(id), AuditAction::Abandoned, Some(priority), amounts, None);
                Ok(false)
            }
        }
    }

    /// Grant evaluation as configured. Returns the number of grants made.
    fn evaluate(&mut self) -> AdmissionResult<usize> {
        let mut granted = 0;
        while self.grant_next()? {
            granted += 1;
            if self.evaluation == EvaluationMode::Single {
                break;
            }
        }
        Ok(granted)
    }

    fn retire(&mut self, id: RequestId, amounts: ResourceAmounts) -> AdmissionResult<()> {
        self.outstanding.remove(&id);
        let released = self.pools.release_all(&amounts);
        tracing::debug!(request_id = id, %amounts, "grant released");
        self.audit(Some(id), AuditAction::Released, None, amounts, None);
        let granted = self.evaluate()?;
        if granted > 0 {
            tracing::debug!(request_id = id, granted, "release unblocked waiters");
        }
        released
    }

    /// Outstanding entry to retire for `grant`: its own id, or the oldest grant
    /// of equal amounts if a release by amounts already retired that id.
    fn outstanding_for(&self, grant: &Grant) -> Option<RequestId> {
        if self.outstanding.get(&grant.id) == Some(&grant.amounts) {
            return Some(grant.id);
        }
        self.outstanding
            .iter()
            .find(|(_, held)| **held == grant.amounts)
            .map(|(id, _)| *id)
    }

    fn return_grant(&mut self, grant: &Grant) -> AdmissionResult<()> {
        if grant.controller != self.instance {
            let reason = format!("grant {} was issued by another controller", grant.id);
            return Err(self.reject_release(grant.amounts, reason));
        }
        let Some(id) = self.outstanding_for(grant) else {
            let reason = format!("grant {} is not outstanding", grant.id);
            return Err(self.reject_release(grant.amounts, reason));
        };
        self.retire(id, grant.amounts)
    }

    fn reject_release(&mut self, amounts: ResourceAmounts, reason: String) -> AdmissionError {
        tracing::warn!(%amounts, %reason, "release rejected");
        self.audit(None, AuditAction::Rejected, None, amounts, Some(reason.clone()));
        AdmissionError::InvalidRelease(reason)
    }

    fn held(&self) -> ResourceAmounts {
        let mut held = ResourceAmounts::default();
        for amounts in self.outstanding.values() {
            for (kind, units) in amounts.iter() {
                *held.get_mut(kind) += units;
            }
        }
        held
    }
}

/// Arbitrates the CPU, RAM and disk pools among concurrent requesters.
///
/// Cloning is cheap; clones share the same pools and queues.
#[derive(Clone)]
pub struct AdmissionController {
    state: Arc<Mutex<ControllerState>>,
}

impl fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AdmissionController")
            .field("instance", &state.instance)
            .field("available", &state.pools.available())
            .field("queued", &state.queue.total_len())
            .field("policy", &state.policy)
            .field("evaluation", &state.evaluation)
            .finish_non_exhaustive()
    }
}

impl AdmissionController {
    /// Create a controller with the given capacities, skip-ahead policy and
    /// single-grant evaluation.
    ///
    /// # Errors
    /// `InvalidConfig` if any capacity is zero.
    pub fn new(cpu_capacity: u32, ram_capacity: u32, disk_capacity: u32) -> AdmissionResult<Self> {
        Self::with_capacities(ResourceAmounts::new(cpu_capacity, ram_capacity, disk_capacity))
    }

    /// Create a controller from per-kind capacities.
    ///
    /// # Errors
    /// `InvalidConfig` if any capacity is zero.
    pub fn with_capacities(capacities: ResourceAmounts) -> AdmissionResult<Self> {
        if let Some((kind, _)) = capacities.iter().find(|(_, units)| *units == 0) {
            return Err(AdmissionError::InvalidConfig(format!(
                "{kind} capacity must be greater than 0"
            )));
        }
        Ok(Self {
            state: Arc::new(Mutex::new(ControllerState {
                instance: Uuid::new_v4(),
                pools: PoolSet::new(capacities),
                queue: AdmissionQueue::new(),
                outstanding: BTreeMap::new(),
                policy: GrantPolicy::default(),
                evaluation: EvaluationMode::default(),
                audit: None,
            })),
        })
    }

    /// Set the grant policy.
    #[must_use]
    pub fn with_policy(self, policy: GrantPolicy) -> Self {
        self.state.lock().policy = policy;
        self
    }

    /// Set the evaluation mode.
    #[must_use]
    pub fn with_evaluation(self, evaluation: EvaluationMode) -> Self {
        self.state.lock().evaluation = evaluation;
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        self.state.lock().audit = Some(audit);
        self
    }

    /// Active grant policy.
    #[must_use]
    pub fn policy(&self) -> GrantPolicy {
        self.state.lock().policy
    }

    /// Active evaluation mode.
    #[must_use]
    pub fn evaluation_mode(&self) -> EvaluationMode {
        self.state.lock().evaluation
    }

    /// Fixed capacities.
    #[must_use]
    pub fn capacities(&self) -> ResourceAmounts {
        self.state.lock().pools.capacities()
    }

    /// Enqueue a request and run grant evaluation once.
    ///
    /// Returns immediately. The handle resolves when the request is granted,
    /// which may already have happened by the time this returns.
    ///
    /// # Errors
    /// `CapacityExceeded` if some amount is larger than its pool's capacity;
    /// nothing is enqueued in that case.
    pub fn request(
        &self,
        amounts: ResourceAmounts,
        priority: Priority,
    ) -> AdmissionResult<PendingGrant> {
        let mut state = self.state.lock();
        if let Some(err) = state.pools.exceeds_capacity(&amounts) {
            tracing::warn!(%amounts, %priority, error = %err, "request rejected");
            state.audit(
                None,
                AuditAction::Rejected,
                Some(priority),
                amounts,
                Some(err.to_string()),
            );
            return Err(err);
        }

        let (tx, rx) = oneshot::channel();
        let id = state.queue.enqueue(priority, amounts, tx);
        tracing::debug!(request_id = id, %priority, %amounts, "request enqueued");
        state.audit(Some(id), AuditAction::Requested, Some(priority), amounts, None);
        let evaluated = state.evaluate();
        drop(state);

        let pending = PendingGrant {
            id,
            priority,
            amounts,
            rx: Some(rx),
            controller: Arc::downgrade(&self.state),
        };
        evaluated?;
        Ok(pending)
    }

    /// Request resources and wait until they are granted.
    ///
    /// # Errors
    /// `CapacityExceeded` at call time, or `ControllerClosed` if the
    /// controller is dropped while waiting.
    pub async fn acquire(
        &self,
        amounts: ResourceAmounts,
        priority: Priority,
    ) -> AdmissionResult<Grant> {
        self.request(amounts, priority)?.await
    }

    /// Return resources by amount and run grant evaluation once.
    ///
    /// The amounts must equal those of an outstanding grant; the oldest such
    /// grant is retired, which need not be the caller's own. A later
    /// [`release_grant`](Self::release_grant) for a grant retired this way
    /// retires another outstanding grant of equal amounts instead, so pool
    /// accounting stays exact when both paths are mixed.
    ///
    /// # Errors
    /// `InvalidRelease` if no outstanding grant holds exactly `amounts`. The
    /// pools are untouched in that case.
    pub fn release(&self, amounts: ResourceAmounts) -> AdmissionResult<()> {
        let mut state = self.state.lock();
        let matching = state
            .outstanding
            .iter()
            .find(|(_, held)| **held == amounts)
            .map(|(id, _)| *id);
        let Some(id) = matching else {
            let reason = format!("no outstanding grant holds {amounts}");
            return Err(state.reject_release(amounts, reason));
        };
        state.retire(id, amounts)
    }

    /// Return a specific grant and run grant evaluation once.
    ///
    /// # Errors
    /// `InvalidRelease` if the grant was issued by another controller, or if
    /// neither it nor any grant of equal amounts is still outstanding.
    pub fn release_grant(&self, grant: Grant) -> AdmissionResult<()> {
        self.state.lock().return_grant(&grant)
    }

    /// Requests waiting in one class.
    #[must_use]
    pub fn queued(&self, priority: Priority) -> usize {
        self.state.lock().queue.len(priority)
    }

    /// Consistent view of pools, queues and outstanding grants.
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state.lock();
        ControllerSnapshot {
            pools: state.pools.pools().to_vec(),
            queued_high: state.queue.len(Priority::High),
            queued_low: state.queue.len(Priority::Low),
            outstanding_grants: state.outstanding.len(),
            held: state.held(),
        }
    }
}
