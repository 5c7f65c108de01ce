//! Cached ring configuration snapshot shared by the tracker, resolver,
//! self-checks, and the lifecycle manager.

use std::sync::Arc;

use sorter_traits::RingConfiguration;

use crate::snapshot::SnapshotCell;

/// Configuration lifecycle state, derived solely from the sign of
/// `total_cart_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingMode {
    /// Cart count unknown (`<= 0`); the next self-check result is learned.
    AutoLearning,
    /// Cart count locked (`> 0`); self-checks only verify it.
    Verification,
}

impl RingMode {
    pub fn of(config: &RingConfiguration) -> Self {
        if config.is_locked() {
            RingMode::Verification
        } else {
            RingMode::AutoLearning
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RingMode::AutoLearning => "auto_learning",
            RingMode::Verification => "verification",
        }
    }
}

impl core::fmt::Display for RingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide cached `RingConfiguration`. Only the lifecycle manager
/// writes it; every reader takes a fresh snapshot per call.
#[derive(Debug, Default)]
pub struct RingConfigCell {
    cell: SnapshotCell<RingConfiguration>,
}

impl RingConfigCell {
    pub fn new(config: RingConfiguration) -> Self {
        Self {
            cell: SnapshotCell::new(config),
        }
    }

    pub fn snapshot(&self) -> RingConfiguration {
        *self.cell.load()
    }

    pub fn mode(&self) -> RingMode {
        RingMode::of(&self.snapshot())
    }

    /// Locked ring length, if any.
    pub fn ring_length(&self) -> Option<u32> {
        let total = self.snapshot().total_cart_count;
        u32::try_from(total).ok().filter(|n| *n > 0)
    }

    pub(crate) fn replace(&self, config: RingConfiguration) {
        self.cell.store(config);
    }
}

pub type SharedRingConfig = Arc<RingConfigCell>;
