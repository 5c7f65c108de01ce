//! Static ring geometry and sensor pass observations.

use std::time::Duration;

use sorter_traits::RingConfiguration;

/// Read-only geometry of one deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologySnapshot {
    /// Cart count from the layout file. Legacy fallback while the ring
    /// configuration is still unlocked.
    pub cart_count: i32,
    /// Locked ring length at the time the snapshot was taken (`<= 0` if unlocked).
    pub total_cart_count: i32,
    pub cart_spacing_mm: f64,
    pub ring_total_length_mm: f64,
    pub chute_count: u32,
    pub chute_width_mm: f64,
    pub cart_width_mm: f64,
    pub track_length_mm: f64,
}

impl TopologySnapshot {
    /// Copy of this snapshot carrying the given ring configuration.
    pub fn with_ring(&self, ring: &RingConfiguration) -> Self {
        Self {
            total_cart_count: ring.total_cart_count,
            ..self.clone()
        }
    }

    /// Locked count when available, otherwise the layout's cart count.
    pub fn ring_cart_count(&self) -> i32 {
        if self.total_cart_count > 0 {
            self.total_cart_count
        } else {
            self.cart_count
        }
    }
}

/// One cart passing a sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassEvent {
    /// Identified cart, when the sensor can read one.
    pub cart_id: Option<i32>,
    /// Monotonic time since the sensor epoch.
    pub timestamp: Duration,
    pub line_speed_mmps: f64,
}

impl PassEvent {
    pub fn new(cart_id: Option<i32>, timestamp: Duration, line_speed_mmps: f64) -> Self {
        Self {
            cart_id,
            timestamp,
            line_speed_mmps,
        }
    }
}

/// A pass observed at a chute sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChutePassEvent {
    pub chute_id: u32,
    pub pass: PassEvent,
}

/// Anything the single sensor producer can deliver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    OriginPass(PassEvent),
    ChutePass(ChutePassEvent),
}

impl SensorEvent {
    pub fn timestamp(&self) -> Duration {
        match self {
            SensorEvent::OriginPass(p) => p.timestamp,
            SensorEvent::ChutePass(c) => c.pass.timestamp,
        }
    }
}
