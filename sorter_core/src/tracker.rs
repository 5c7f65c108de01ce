//! Head cart position tracking.
//!
//! The tracker counts cart passes at the origin sensor and keeps the 0-based
//! index of the cart currently there. It is driven by a single producer (the
//! ingest pump) in time order and read concurrently by the resolver.

use std::time::Duration;

use crate::ring::SharedRingConfig;
use crate::snapshot::SnapshotCell;

/// 0-based ordinal of the cart at the origin sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CartIndex(u32);

impl CartIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// 1-based cart number (`index + 1`).
    pub fn cart_number(self) -> i64 {
        i64::from(self.0) + 1
    }
}

/// Head position as seen by readers. Callers must handle both arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadPosition {
    #[default]
    NotInitialized,
    Initialized(CartIndex),
}

impl HeadPosition {
    pub fn index(self) -> Option<CartIndex> {
        match self {
            HeadPosition::NotInitialized => None,
            HeadPosition::Initialized(i) => Some(i),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TrackerState {
    head: HeadPosition,
    last_pass_at: Option<Duration>,
    pass_count: u64,
}

#[derive(Debug)]
pub struct CartPositionTracker {
    ring: SharedRingConfig,
    state: SnapshotCell<TrackerState>,
}

impl CartPositionTracker {
    pub fn new(ring: SharedRingConfig) -> Self {
        Self {
            ring,
            state: SnapshotCell::default(),
        }
    }

    /// Record one physical cart pass at the origin sensor.
    ///
    /// The first pass sets the head index to 0. Later passes advance it by
    /// one modulo the locked ring length; while the ring length is still
    /// being learned the index keeps counting up and is reduced once locked.
    pub fn on_cart_passed_origin(&self, timestamp: Duration) -> CartIndex {
        let ring_len = self.ring.ring_length();
        self.state.update(|s| {
            let next = match s.head {
                HeadPosition::NotInitialized => 0,
                HeadPosition::Initialized(i) => match ring_len {
                    Some(n) => (i.get() % n + 1) % n,
                    None => i.get().saturating_add(1),
                },
            };
            let idx = CartIndex(next);
            tracing::trace!(index = next, pass = s.pass_count + 1, "origin pass");
            (
                TrackerState {
                    head: HeadPosition::Initialized(idx),
                    last_pass_at: Some(timestamp),
                    pass_count: s.pass_count.saturating_add(1),
                },
                idx,
            )
        })
    }

    /// `(head + offset) mod ring_length`, or `None` before the first pass.
    pub fn calculate_cart_index_at_offset(
        &self,
        offset: i64,
        ring_length: u32,
    ) -> Option<CartIndex> {
        if ring_length == 0 {
            return None;
        }
        let head = self.head().index()?;
        let idx = (i64::from(head.get()) + offset).rem_euclid(i64::from(ring_length));
        u32::try_from(idx).ok().map(CartIndex)
    }

    pub fn head(&self) -> HeadPosition {
        self.state.load().head
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.head(), HeadPosition::Initialized(_))
    }

    /// Initialized and the ring length is locked.
    pub fn is_ring_ready(&self) -> bool {
        self.is_initialized() && self.ring.ring_length().is_some()
    }

    pub fn last_pass_at(&self) -> Option<Duration> {
        self.state.load().last_pass_at
    }

    pub fn pass_count(&self) -> u64 {
        self.state.load().pass_count
    }

    /// Reduce a head index counted while learning into `0..ring_length`.
    /// Called once when the learned length is first locked; later drift is
    /// left visible to the resolver.
    pub fn fold_into_ring(&self, ring_length: u32) -> HeadPosition {
        if ring_length == 0 {
            return self.head();
        }
        self.state.update(|s| {
            let head = match s.head {
                HeadPosition::NotInitialized => HeadPosition::NotInitialized,
                HeadPosition::Initialized(i) => {
                    HeadPosition::Initialized(CartIndex(i.get() % ring_length))
                }
            };
            if head != s.head {
                tracing::debug!(?head, ring_length, "head folded into learned ring");
            }
            (TrackerState { head, ..*s }, head)
        })
    }

    /// Forget the head position (operator re-home). The next origin pass
    /// becomes index 0 again.
    pub fn reset(&self) {
        self.state.store(TrackerState::default());
        tracing::info!("head position reset");
    }
}
