//! Statistical self-check of the cart ring from origin pass events.
//!
//! The measured cart count is the number of distinct cart ids seen. The
//! measured pitch is the median of per-pair samples
//! `avg(speed[i-1], speed[i]) * dt(i-1, i)`; the median keeps a single
//! missed or doubled pass from skewing the estimate.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::ArgumentError;
use crate::topology::{PassEvent, TopologySnapshot};
use crate::util::median;

/// Pairs further apart than this are treated as a pause, not a pitch sample.
pub const MAX_PAIR_GAP: Duration = Duration::from_secs(10);
/// Upper bound for a plausible pitch sample (mm).
pub const MAX_PITCH_MM: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSelfCheckOptions {
    /// Allowed relative pitch deviation, in `(0.0, 1.0]`.
    pub pitch_tolerance: f64,
}

impl Default for RingSelfCheckOptions {
    fn default() -> Self {
        Self {
            pitch_tolerance: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RingSelfCheckResult {
    pub expected_cart_count: i32,
    pub measured_cart_count: i32,
    pub expected_pitch_mm: f64,
    pub measured_pitch_mm: f64,
    pub is_cart_count_matched: bool,
    pub is_pitch_within_tolerance: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RingSelfCheckService {
    options: RingSelfCheckOptions,
}

impl RingSelfCheckService {
    pub fn new(options: RingSelfCheckOptions) -> Result<Self, ArgumentError> {
        let tol = options.pitch_tolerance;
        if !(tol > 0.0 && tol <= 1.0) {
            return Err(ArgumentError::PitchTolerance(tol));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> RingSelfCheckOptions {
        self.options
    }

    /// Analyze one batch of origin pass events against the topology.
    ///
    /// An empty batch is a valid outcome: every count is zero and both
    /// flags are false.
    pub fn run_analysis(
        &self,
        pass_events: &[PassEvent],
        topology: &TopologySnapshot,
    ) -> RingSelfCheckResult {
        if pass_events.is_empty() {
            tracing::debug!("ring self-check: no pass events");
            return RingSelfCheckResult::default();
        }

        let distinct: HashSet<i32> = pass_events.iter().filter_map(|e| e.cart_id).collect();
        let measured_cart_count = i32::try_from(distinct.len()).unwrap_or(i32::MAX);

        let mut samples = pitch_samples(pass_events);
        let kept = samples.len();
        let measured_pitch_mm = median(&mut samples).unwrap_or(0.0);

        let expected_cart_count = topology.ring_cart_count();
        let expected_pitch_mm = topology.cart_spacing_mm;

        let is_pitch_within_tolerance = measured_pitch_mm > 0.0
            && expected_pitch_mm > 0.0
            && ((measured_pitch_mm - expected_pitch_mm).abs() / expected_pitch_mm)
                <= self.options.pitch_tolerance;

        tracing::debug!(
            events = pass_events.len(),
            pitch_samples = kept,
            rejected = pass_events.len().saturating_sub(1).saturating_sub(kept),
            measured_cart_count,
            measured_pitch_mm,
            "ring self-check analyzed"
        );

        RingSelfCheckResult {
            expected_cart_count,
            measured_cart_count,
            expected_pitch_mm,
            measured_pitch_mm,
            is_cart_count_matched: measured_cart_count == expected_cart_count,
            is_pitch_within_tolerance,
        }
    }
}

fn pitch_samples(events: &[PassEvent]) -> Vec<f64> {
    let max_gap_s = MAX_PAIR_GAP.as_secs_f64();
    events
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            let dt_s = b.timestamp.as_secs_f64() - a.timestamp.as_secs_f64();
            if dt_s <= 0.0 || dt_s > max_gap_s {
                return None;
            }
            let speed = (a.line_speed_mmps + b.line_speed_mmps) / 2.0;
            if speed.is_nan() || speed <= 0.0 {
                return None;
            }
            let pitch = speed * dt_s;
            (pitch > 0.0 && pitch <= MAX_PITCH_MM).then_some(pitch)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology(cart_count: i32, spacing: f64) -> TopologySnapshot {
        TopologySnapshot {
            cart_count,
            total_cart_count: 0,
            cart_spacing_mm: spacing,
            ring_total_length_mm: spacing * f64::from(cart_count),
            chute_count: 4,
            chute_width_mm: 1000.0,
            cart_width_mm: 450.0,
            track_length_mm: 20_000.0,
        }
    }

    fn ev(cart: i32, ms: u64, speed: f64) -> PassEvent {
        PassEvent::new(Some(cart), Duration::from_millis(ms), speed)
    }

    #[test]
    fn rejects_out_of_range_tolerance() {
        for tol in [0.0, -0.1, 1.5, f64::NAN] {
            let opts = RingSelfCheckOptions {
                pitch_tolerance: tol,
            };
            assert!(RingSelfCheckService::new(opts).is_err());
        }
    }

    #[test]
    fn pair_filters_drop_bad_samples() {
        let events = [
            ev(1, 0, 1000.0),
            ev(2, 500, 1000.0),     // 500 mm
            ev(3, 500, 1000.0),     // dt = 0
            ev(4, 400, 1000.0),     // dt < 0
            ev(5, 11_000, 1000.0),  // dt > 10 s
            ev(6, 11_500, 0.0),     // avg speed 500 -> 250 mm
            ev(7, 12_000, -2000.0), // avg speed < 0
            ev(8, 30_000, 1000.0),  // gap
        ];
        let samples = pitch_samples(&events);
        assert_eq!(samples, vec![500.0, 250.0]);
    }

    #[test]
    fn oversized_pitch_is_excluded() {
        // 9 s at 2000 mm/s = 18 m between carts: not a pitch.
        let events = [ev(1, 0, 2000.0), ev(2, 9000, 2000.0)];
        assert!(pitch_samples(&events).is_empty());
    }

    #[test]
    fn events_without_cart_ids_still_yield_pitch() {
        let svc = RingSelfCheckService::default();
        let events: Vec<PassEvent> = (0..5)
            .map(|i| PassEvent::new(None, Duration::from_millis(i * 500), 1000.0))
            .collect();
        let r = svc.run_analysis(&events, &topology(10, 500.0));
        assert_eq!(r.measured_cart_count, 0);
        assert!(!r.is_cart_count_matched);
        assert!((r.measured_pitch_mm - 500.0).abs() < 1e-9);
        assert!(r.is_pitch_within_tolerance);
    }
}
