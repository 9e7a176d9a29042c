//! Two-class FIFO waiting lists for pending requests.

use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::core::controller::Grant;
use crate::util::serde::{Priority, RequestId, ResourceAmounts};

/// Lifecycle of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RequestState {
    /// Queued, waiting for capacity.
    Pending,
    /// Reserved and signalled.
    Granted,
}

/// A queued request together with its completion signal.
#[derive(Debug)]
pub struct ResourceRequest {
    arrival_sequence: RequestId,
    amounts: ResourceAmounts,
    priority: Priority,
    state: RequestState,
    completion: oneshot::Sender<Grant>,
}

impl ResourceRequest {
    /// Arrival sequence stamped at enqueue time.
    #[must_use]
    pub const fn arrival_sequence(&self) -> RequestId {
        self.arrival_sequence
    }

    /// Requested amounts.
    #[must_use]
    pub const fn amounts(&self) -> &ResourceAmounts {
        &self.amounts
    }

    /// Priority class.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RequestState {
        self.state
    }

    /// The requester dropped its handle; nobody can receive a grant.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.completion.is_closed()
    }

    /// Transition to `Granted` and fire the completion signal.
    ///
    /// Hands the grant back if the requester is gone so the caller can undo
    /// the reservation.
    pub(crate) fn complete(mut self, grant: Grant) -> Result<(), Grant> {
        self.state = RequestState::Granted;
        self.completion.send(grant)
    }
}

/// High and Low waiting lists, each ordered by arrival.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    high: VecDeque<ResourceRequest>,
    low: VecDeque<ResourceRequest>,
    next_sequence: RequestId,
}

impl AdmissionQueue {
    /// Create empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn lane(&self, priority: Priority) -> &VecDeque<ResourceRequest> {
        match priority {
            Priority::High => &self.high,
            Priority::Low => &self.low,
        }
    }

    fn lane_mut(&mut self, priority: Priority) -> &mut VecDeque<ResourceRequest> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Low => &mut self.low,
        }
    }

    /// Append a request to the tail of its class, returning its arrival sequence.
    pub fn enqueue(
        &mut self,
        priority: Priority,
        amounts: ResourceAmounts,
        completion: oneshot::Sender<Grant>,
    ) -> RequestId {
        let arrival_sequence = self.next_sequence;
        self.next_sequence += 1;
        self.lane_mut(priority).push_back(ResourceRequest {
            arrival_sequence,
            amounts,
            priority,
            state: RequestState::Pending,
            completion,
        });
        arrival_sequence
    }

    /// Head of a class without removing it.
    #[must_use]
    pub fn peek_head(&self, priority: Priority) -> Option<&ResourceRequest> {
        self.lane(priority).front()
    }

    /// Remove and return the head of a class.
    pub fn pop_head(&mut self, priority: Priority) -> Option<ResourceRequest> {
        self.lane_mut(priority).pop_front()
    }

    /// Remove heads whose requesters are gone and return them.
    ///
    /// Stops at the first live head; abandoned requests further back are
    /// removed when they reach the front.
    pub fn prune_abandoned_heads(&mut self, priority: Priority) -> Vec<ResourceRequest> {
        let lane = self.lane_mut(priority);
        let mut pruned = Vec::new();
        while lane.front().is_some_and(ResourceRequest::is_abandoned) {
            if let Some(request) = lane.pop_front() {
                pruned.push(request);
            }
        }
        pruned
    }

    /// Number of requests waiting in one class.
    #[must_use]
    pub fn len(&self, priority: Priority) -> usize {
        self.lane(priority).len()
    }

    /// True if a class has nobody waiting.
    #[must_use]
    pub fn is_empty(&self, priority: Priority) -> bool {
        self.lane(priority).is_empty()
    }

    /// Number of requests waiting across both classes.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.high.len() + self.low.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(queue: &mut AdmissionQueue, priority: Priority) -> (RequestId, oneshot::Receiver<Grant>) {
        let (tx, rx) = oneshot::channel();
        (queue.enqueue(priority, ResourceAmounts::uniform(1), tx), rx)
    }

    #[test]
    fn test_fifo_within_class() {
        let mut q = AdmissionQueue::new();
        let (a, _ra) = push(&mut q, Priority::Low);
        let (b, _rb) = push(&mut q, Priority::High);
        let (c, _rc) = push(&mut q, Priority::Low);

        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(q.len(Priority::Low), 2);
        assert_eq!(q.len(Priority::High), 1);
        assert_eq!(q.total_len(), 3);

        assert_eq!(q.peek_head(Priority::Low).unwrap().arrival_sequence(), a);
        assert_eq!(q.pop_head(Priority::Low).unwrap().arrival_sequence(), a);
        assert_eq!(q.pop_head(Priority::Low).unwrap().arrival_sequence(), c);
        assert!(q.pop_head(Priority::Low).is_none());
        assert_eq!(q.pop_head(Priority::High).unwrap().arrival_sequence(), b);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut q = AdmissionQueue::new();
        let (id, _rx) = push(&mut q, Priority::High);
        let head = q.peek_head(Priority::High).unwrap();
        assert_eq!(head.arrival_sequence(), id);
        assert_eq!(head.state(), RequestState::Pending);
        assert_eq!(head.priority(), Priority::High);
        assert_eq!(q.len(Priority::High), 1);
    }

    #[test]
    fn test_prune_abandoned_heads_stops_at_live_request() {
        let mut q = AdmissionQueue::new();
        let (a, ra) = push(&mut q, Priority::Low);
        let (b, rb) = push(&mut q, Priority::Low);
        let (c, _rc) = push(&mut q, Priority::Low);
        let (_d, rd) = push(&mut q, Priority::Low);
        drop(ra);
        drop(rb);
        drop(rd);

        let pruned: Vec<_> = q
            .prune_abandoned_heads(Priority::Low)
            .iter()
            .map(ResourceRequest::arrival_sequence)
            .collect();
        assert_eq!(pruned, vec![a, b]);
        assert_eq!(q.peek_head(Priority::Low).unwrap().arrival_sequence(), c);
        assert_eq!(q.len(Priority::Low), 2);
    }

    #[test]
    fn test_empty_queue() {
        let mut q = AdmissionQueue::new();
        assert!(q.peek_head(Priority::High).is_none());
        assert!(q.pop_head(Priority::Low).is_none());
        assert!(q.is_empty(Priority::High));
        assert_eq!(q.total_len(), 0);
    }
}
