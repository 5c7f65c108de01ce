//! `From` implementations bridging `sorter_config` types to core types.
//! Chute entries convert in `sorter_config`, next to `ChuteCfg`.

use std::time::Duration;

use crate::chute_check::ChuteMappingOptions;
use crate::ring_check::RingSelfCheckOptions;
use crate::topology::{ChutePassEvent, PassEvent, SensorEvent, TopologySnapshot};

// ── Topology ─────────────────────────────────────────────────────────────────

impl From<&sorter_config::Topology> for TopologySnapshot {
    fn from(t: &sorter_config::Topology) -> Self {
        Self {
            cart_count: t.cart_count,
            total_cart_count: 0,
            cart_spacing_mm: t.cart_spacing_mm,
            ring_total_length_mm: t.ring_total_length_mm,
            chute_count: t.chute_count,
            chute_width_mm: t.chute_width_mm,
            cart_width_mm: t.cart_width_mm,
            track_length_mm: t.track_length_mm,
        }
    }
}

// ── Self-check options ───────────────────────────────────────────────────────

impl From<&sorter_config::SelfCheckCfg> for RingSelfCheckOptions {
    fn from(c: &sorter_config::SelfCheckCfg) -> Self {
        Self {
            pitch_tolerance: c.pitch_tolerance,
        }
    }
}

impl From<&sorter_config::SelfCheckCfg> for ChuteMappingOptions {
    fn from(c: &sorter_config::SelfCheckCfg) -> Self {
        Self {
            loop_count: c.loop_count,
            cart_id_tolerance: c.cart_id_tolerance,
            position_tolerance_mm: c.position_tolerance_mm,
        }
    }
}

// ── Recorded pass events ─────────────────────────────────────────────────────

impl From<&sorter_config::PassEventRow> for SensorEvent {
    fn from(r: &sorter_config::PassEventRow) -> Self {
        let pass = PassEvent::new(
            r.cart_id,
            Duration::from_millis(r.timestamp_ms),
            r.line_speed_mmps,
        );
        match r.chute_id {
            None => SensorEvent::OriginPass(pass),
            Some(chute_id) => SensorEvent::ChutePass(ChutePassEvent { chute_id, pass }),
        }
    }
}

/// Split recorded rows into origin and chute passes, each in file order.
pub fn split_pass_events(
    rows: &[sorter_config::PassEventRow],
) -> (Vec<PassEvent>, Vec<ChutePassEvent>) {
    let mut origin = Vec::new();
    let mut chute = Vec::new();
    for row in rows {
        match SensorEvent::from(row) {
            SensorEvent::OriginPass(p) => origin.push(p),
            SensorEvent::ChutePass(c) => chute.push(c),
        }
    }
    (origin, chute)
}
