//! Per-resource capacity accounting.
//!
//! A [`ResourcePool`] never synchronizes on its own. Pools live inside the
//! controller state and are only touched while the controller mutex is held,
//! which is what makes the multi-pool check-and-reserve in [`PoolSet`] atomic.

use serde::{Deserialize, Serialize};

use crate::core::{AdmissionError, AdmissionResult};
use crate::util::serde::{ResourceAmounts, ResourceKind};

/// Fixed-capacity pool of one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    kind: ResourceKind,
    capacity: u32,
    available: u32,
}

impl ResourcePool {
    /// Create a pool with every unit available.
    #[must_use]
    pub const fn new(kind: ResourceKind, capacity: u32) -> Self {
        Self {
            kind,
            capacity,
            available: capacity,
        }
    }

    /// Resource type of this pool.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Fixed capacity.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Units not held by any grant.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.available
    }

    /// Units currently held by grants.
    #[must_use]
    pub const fn in_use(&self) -> u32 {
        self.capacity - self.available
    }

    /// True iff `amount` units are available right now.
    #[must_use]
    pub const fn can_satisfy(&self, amount: u32) -> bool {
        self.available >= amount
    }

    /// Take `amount` units out of the pool.
    ///
    /// # Errors
    /// `InconsistentState` if the pool cannot satisfy `amount`; callers check
    /// [`ResourcePool::can_satisfy`] under the same lock first.
    pub fn reserve(&mut self, amount: u32) -> AdmissionResult<()> {
        if !self.can_satisfy(amount) {
            return Err(AdmissionError::InconsistentState(
                "reserve called without available capacity",
            ));
        }
        self.available -= amount;
        Ok(())
    }

    /// Return `amount` units to the pool, clamped at capacity.
    ///
    /// # Errors
    /// `InvalidRelease` when the release would push `available` past
    /// `capacity`. The pool is left full in that case.
    pub fn release(&mut self, amount: u32) -> AdmissionResult<()> {
        let restored = self.available.saturating_add(amount);
        if restored > self.capacity {
            self.available = self.capacity;
            tracing::warn!(
                kind = %self.kind,
                amount,
                capacity = self.capacity,
                "release overflowed pool, clamped to capacity"
            );
            return Err(AdmissionError::InvalidRelease(format!(
                "releasing {amount} {} would exceed capacity {}",
                self.kind, self.capacity
            )));
        }
        self.available = restored;
        Ok(())
    }
}

/// One [`ResourcePool`] per [`ResourceKind`], addressed by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSet {
    pools: [ResourcePool; 3],
}

impl PoolSet {
    /// Create the pools from per-kind capacities.
    #[must_use]
    pub fn new(capacities: ResourceAmounts) -> Self {
        Self {
            pools: ResourceKind::ALL.map(|kind| ResourcePool::new(kind, capacities.get(kind))),
        }
    }

    /// All pools in kind order.
    #[must_use]
    pub const fn pools(&self) -> &[ResourcePool; 3] {
        &self.pools
    }

    /// Capacities as amounts.
    #[must_use]
    pub fn capacities(&self) -> ResourceAmounts {
        self.collect(ResourcePool::capacity)
    }

    /// Available units as amounts.
    #[must_use]
    pub fn available(&self) -> ResourceAmounts {
        self.collect(ResourcePool::available)
    }

    fn collect(&self, f: impl Fn(&ResourcePool) -> u32) -> ResourceAmounts {
        let mut out = ResourceAmounts::default();
        for pool in &self.pools {
            *out.get_mut(pool.kind()) = f(pool);
        }
        out
    }

    /// First kind whose capacity is smaller than the requested amount.
    #[must_use]
    pub fn exceeds_capacity(&self, amounts: &ResourceAmounts) -> Option<AdmissionError> {
        self.pools.iter().find_map(|pool| {
            let requested = amounts.get(pool.kind());
            (requested > pool.capacity()).then_some(AdmissionError::CapacityExceeded {
                kind: pool.kind(),
                requested,
                capacity: pool.capacity(),
            })
        })
    }

    /// True iff every pool can satisfy its share of `amounts`.
    #[must_use]
    pub fn can_satisfy_all(&self, amounts: &ResourceAmounts) -> bool {
        self.pools
            .iter()
            .all(|pool| pool.can_satisfy(amounts.get(pool.kind())))
    }

    /// Reserve `amounts` across every pool, or nothing at all.
    ///
    /// # Errors
    /// `InconsistentState` if any pool is short; no pool is modified then.
    pub fn reserve_all(&mut self, amounts: &ResourceAmounts) -> AdmissionResult<()> {
        if !self.can_satisfy_all(amounts) {
            return Err(AdmissionError::InconsistentState(
                "reserve_all called without capacity in every pool",
            ));
        }
        for pool in &mut self.pools {
            pool.reserve(amounts.get(pool.kind()))?;
        }
        Ok(())
    }

    /// Credit `amounts` back to every pool.
    ///
    /// Every pool is credited even if an earlier one overflows; the first
    /// overflow is reported.
    ///
    /// # Errors
    /// `InvalidRelease` if any pool had to clamp.
    pub fn release_all(&mut self, amounts: &ResourceAmounts) -> AdmissionResult<()> {
        let mut first_err = None;
        for pool in &mut self.pools {
            if let Err(e) = pool.release(amounts.get(pool.kind())) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
