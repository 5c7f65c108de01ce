//! Geometric cross-check of chute calibration against the physical layout.
//!
//! For chute `k` the theoretical cart index is
//! `round(chute_width_mm * (k - 1) / cart_spacing_mm) mod cart_count`,
//! computed from geometry only so it can catch a wrong
//! `cart_number_at_head_one`. Observed cart ids are compared with ring
//! distance, never linear distance.

use std::collections::BTreeMap;

use crate::error::ArgumentError;
use crate::topology::{ChutePassEvent, TopologySnapshot};
use crate::util::ring_distance;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChuteMappingOptions {
    /// Ring rotations the observations were collected over (reported only).
    pub loop_count: u32,
    /// Largest ring distance between observed and theoretical cart id that still passes.
    pub cart_id_tolerance: u32,
    /// Reported alongside the per-chute position error; does not affect pass/fail.
    pub position_tolerance_mm: f64,
}

impl Default for ChuteMappingOptions {
    fn default() -> Self {
        Self {
            loop_count: 3,
            cart_id_tolerance: 0,
            position_tolerance_mm: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChuteMappingCheckItem {
    pub chute_id: u32,
    /// Theoretical 0-based cart index at this chute.
    pub expected_cart_id: i32,
    pub observed_cart_ids: Vec<i32>,
    pub is_passed: bool,
    /// Distance of the chute from the origin along the track.
    pub theoretical_position_mm: f64,
    /// Worst observed deviation expressed in mm (ring distance x spacing).
    pub max_position_error_mm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChuteMappingSelfCheckResult {
    pub items: Vec<ChuteMappingCheckItem>,
    pub is_all_passed: bool,
    pub cart_count: i32,
    pub loop_count: u32,
    pub position_tolerance_mm: f64,
}

impl ChuteMappingSelfCheckResult {
    pub fn failed(&self) -> impl Iterator<Item = &ChuteMappingCheckItem> {
        self.items.iter().filter(|i| !i.is_passed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChuteMappingSelfCheckService;

impl ChuteMappingSelfCheckService {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        chute_pass_events: &[ChutePassEvent],
        topology: &TopologySnapshot,
        options: &ChuteMappingOptions,
    ) -> Result<ChuteMappingSelfCheckResult, ArgumentError> {
        validate(topology, options)?;
        let cart_count = topology.ring_cart_count();
        let len = i64::from(cart_count);

        let mut observed: BTreeMap<u32, Vec<i32>> = BTreeMap::new();
        for e in chute_pass_events {
            if !(1..=topology.chute_count).contains(&e.chute_id) {
                tracing::debug!(chute_id = e.chute_id, "pass event for unknown chute ignored");
                continue;
            }
            if let Some(cart) = e.pass.cart_id {
                observed.entry(e.chute_id).or_default().push(cart);
            }
        }

        let tolerance = i64::from(options.cart_id_tolerance);
        let items: Vec<ChuteMappingCheckItem> = (1..=topology.chute_count)
            .map(|chute_id| {
                let position_mm = topology.chute_width_mm * f64::from(chute_id - 1);
                let expected = theoretical_cart_index(position_mm, topology.cart_spacing_mm, len);
                let carts = observed.remove(&chute_id).unwrap_or_default();
                let worst = carts
                    .iter()
                    .map(|c| ring_distance(i64::from(*c), expected, len))
                    .max();
                let is_passed = matches!(worst, Some(d) if d <= tolerance);
                ChuteMappingCheckItem {
                    chute_id,
                    // expected < len <= i32::MAX
                    expected_cart_id: expected as i32,
                    observed_cart_ids: carts,
                    is_passed,
                    theoretical_position_mm: position_mm,
                    max_position_error_mm: worst.unwrap_or(0) as f64 * topology.cart_spacing_mm,
                }
            })
            .collect();

        let is_all_passed = !items.is_empty() && items.iter().all(|i| i.is_passed);
        let failed = items.iter().filter(|i| !i.is_passed).count();
        if is_all_passed {
            tracing::info!(chutes = items.len(), "chute mapping self-check passed");
        } else {
            tracing::warn!(chutes = items.len(), failed, "chute mapping self-check failed");
        }

        Ok(ChuteMappingSelfCheckResult {
            items,
            is_all_passed,
            cart_count,
            loop_count: options.loop_count,
            position_tolerance_mm: options.position_tolerance_mm,
        })
    }
}

fn theoretical_cart_index(position_mm: f64, spacing_mm: f64, cart_count: i64) -> i64 {
    let carts = (position_mm / spacing_mm).round() as i64;
    carts.rem_euclid(cart_count)
}

fn validate(
    topology: &TopologySnapshot,
    options: &ChuteMappingOptions,
) -> Result<(), ArgumentError> {
    if topology.cart_spacing_mm.is_nan() || topology.cart_spacing_mm <= 0.0 {
        return Err(ArgumentError::NonPositiveCartSpacing(topology.cart_spacing_mm));
    }
    if topology.chute_width_mm.is_nan() || topology.chute_width_mm < 0.0 {
        return Err(ArgumentError::NegativeChuteWidth(topology.chute_width_mm));
    }
    let cart_count = topology.ring_cart_count();
    if cart_count <= 0 {
        return Err(ArgumentError::NonPositiveCartCount(cart_count));
    }
    if options.loop_count == 0 {
        return Err(ArgumentError::ZeroLoopCount);
    }
    if options.position_tolerance_mm.is_nan() || options.position_tolerance_mm < 0.0 {
        return Err(ArgumentError::PositionTolerance(options.position_tolerance_mm));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theoretical_index_rounds_and_wraps() {
        assert_eq!(theoretical_cart_index(0.0, 500.0, 100), 0);
        assert_eq!(theoretical_cart_index(1000.0, 500.0, 100), 2);
        assert_eq!(theoretical_cart_index(1300.0, 500.0, 100), 3); // 2.6 -> 3
        assert_eq!(theoretical_cart_index(1200.0, 500.0, 100), 2); // 2.4 -> 2
        assert_eq!(theoretical_cart_index(51_000.0, 500.0, 100), 2);
    }
}
