//! Serializable data types shared across the controller, config and audit layers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier stamped on every request at enqueue time.
///
/// It is the request's arrival sequence and doubles as the id of the grant
/// that eventually satisfies it.
pub type RequestId = u64;

/// Priority class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Checked second on every evaluation.
    Low,
    /// Checked first on every evaluation.
    High,
}

impl Priority {
    /// Both classes, in evaluation order.
    pub const EVALUATION_ORDER: [Self; 2] = [Self::High, Self::Low];
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::High => f.write_str("high"),
        }
    }
}

/// Resource types managed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Compute slots.
    Cpu,
    /// Memory units.
    Ram,
    /// Storage units.
    Disk,
}

impl ResourceKind {
    /// Every resource kind, in pool order.
    pub const ALL: [Self; 3] = [Self::Cpu, Self::Ram, Self::Disk];

    /// Position of this kind in [`ResourceKind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Cpu => 0,
            Self::Ram => 1,
            Self::Disk => 2,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Ram => f.write_str("ram"),
            Self::Disk => f.write_str("disk"),
        }
    }
}

/// Units requested, granted or released, one value per [`ResourceKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceAmounts {
    /// Compute slots.
    pub cpu: u32,
    /// Memory units.
    pub ram: u32,
    /// Storage units.
    pub disk: u32,
}

impl ResourceAmounts {
    /// Build amounts from per-kind values.
    #[must_use]
    pub const fn new(cpu: u32, ram: u32, disk: u32) -> Self {
        Self { cpu, ram, disk }
    }

    /// The same amount of every resource.
    #[must_use]
    pub const fn uniform(units: u32) -> Self {
        Self::new(units, units, units)
    }

    /// Amount for a single kind.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Cpu => self.cpu,
            ResourceKind::Ram => self.ram,
            ResourceKind::Disk => self.disk,
        }
    }

    /// Mutable access to a single kind.
    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut u32 {
        match kind {
            ResourceKind::Cpu => &mut self.cpu,
            ResourceKind::Ram => &mut self.ram,
            ResourceKind::Disk => &mut self.disk,
        }
    }

    /// Iterate `(kind, amount)` pairs in pool order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        ResourceKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// True when nothing is requested.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.cpu == 0 && self.ram == 0 && self.disk == 0
    }
}

impl fmt::Display for ResourceAmounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu={} ram={} disk={}", self.cpu, self.ram, self.disk)
    }
}
