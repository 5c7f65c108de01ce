//! Sticky ring health status.
//!
//! A verification mismatch marks the ring unhealthy with both counts; the
//! fault stays set until a later matching verification (or an explicit
//! relock) clears it. An external safety layer polls `status()`.

use std::sync::Arc;

use crate::snapshot::SnapshotCell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingHealthStatus {
    pub is_healthy: bool,
    pub error_message: Option<String>,
    pub expected_cart_count: Option<i32>,
    pub detected_cart_count: Option<i32>,
}

impl Default for RingHealthStatus {
    fn default() -> Self {
        Self::healthy()
    }
}

impl RingHealthStatus {
    pub fn healthy() -> Self {
        Self {
            is_healthy: true,
            error_message: None,
            expected_cart_count: None,
            detected_cart_count: None,
        }
    }

    pub fn cart_count_mismatch(expected: i32, detected: i32) -> Self {
        Self {
            is_healthy: false,
            error_message: Some(cart_count_mismatch_message(expected, detected)),
            expected_cart_count: Some(expected),
            detected_cart_count: Some(detected),
        }
    }
}

pub(crate) fn cart_count_mismatch_message(expected: i32, detected: i32) -> String {
    format!("ring cart count mismatch: expected {expected} carts, detected {detected}")
}

#[derive(Debug, Default)]
pub struct RingHealthMonitor {
    status: SnapshotCell<RingHealthStatus>,
}

impl RingHealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Arc<RingHealthStatus> {
        self.status.load()
    }

    pub fn is_healthy(&self) -> bool {
        self.status.load().is_healthy
    }

    pub fn raise_cart_count_mismatch(&self, expected: i32, detected: i32) {
        self.status
            .store(RingHealthStatus::cart_count_mismatch(expected, detected));
    }

    /// Clear a ring-mismatch fault. Returns true if a fault was cleared.
    pub fn clear_cart_count_mismatch(&self) -> bool {
        self.status.update(|s| {
            let was_faulted = !s.is_healthy;
            (RingHealthStatus::healthy(), was_faulted)
        })
    }
}
