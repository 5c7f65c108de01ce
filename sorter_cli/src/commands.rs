//! Subcommand implementations over a `CartRingEngine` assembled from config.

use std::path::Path;
use std::time::Duration;

use eyre::{Result, WrapErr};
use serde_json::{Value, json};
use sorter_config::{Config, FileRingConfigStore, load_pass_events_csv};
use sorter_core::conversions::split_pass_events;
use sorter_core::{
    CartRingEngine, ChuteConfig, ChuteConfigTable, ChuteMappingOptions,
    ChuteMappingSelfCheckResult, RingCalibrationOutcome, RingSelfCheckOptions, SensorEvent,
    TopologySnapshot,
};
use sorter_traits::clock::MonotonicClock;

use crate::error_fmt::CheckFailed;

/// How long `replay` waits for the pump to drain.
const REPLAY_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Assemble the engine: chute table from `[[chutes]]`, ring state from
/// `ring.state_file`, options from `[self_check]`.
pub fn build_engine(cfg: &Config) -> Result<CartRingEngine> {
    let chutes = ChuteConfigTable::new(cfg.chutes.iter().map(ChuteConfig::from));
    CartRingEngine::builder()
        .with_store(FileRingConfigStore::new(&cfg.ring.state_file))
        .with_chute_source(chutes)
        .with_topology(TopologySnapshot::from(&cfg.topology))
        .with_ring_check(RingSelfCheckOptions::from(&cfg.self_check))
        .with_chute_mapping(ChuteMappingOptions::from(&cfg.self_check))
        .build()
}

fn emit(json_mode: bool, value: &Value, text: &str) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{text}");
    }
}

/// Advance a freshly started tracker so the cart at the origin is `head`.
fn position_head(engine: &CartRingEngine, head: u32) {
    for i in 0..head {
        engine.on_cart_passed_origin(Duration::from_millis(u64::from(i)));
    }
    tracing::debug!(head, "head positioned");
}

fn calibration_json(o: &RingCalibrationOutcome) -> Value {
    json!({
        "check": {
            "expected_cart_count": o.check.expected_cart_count,
            "measured_cart_count": o.check.measured_cart_count,
            "expected_pitch_mm": o.check.expected_pitch_mm,
            "measured_pitch_mm": o.check.measured_pitch_mm,
            "is_cart_count_matched": o.check.is_cart_count_matched,
            "is_pitch_within_tolerance": o.check.is_pitch_within_tolerance,
        },
        "process": {
            "mode": o.process.mode.as_str(),
            "configuration_updated": o.process.configuration_updated,
            "has_error": o.process.has_error,
            "error_message": o.process.error_message,
            "expected_cart_count": o.process.expected_cart_count,
            "detected_cart_count": o.process.detected_cart_count,
        },
    })
}

pub fn ring_check(cfg: &Config, events: &Path, json_mode: bool) -> Result<()> {
    let engine = build_engine(cfg)?;
    let rows = load_pass_events_csv(events)?;
    let (origin, _) = split_pass_events(&rows);
    tracing::info!(events = origin.len(), mode = %engine.mode(), "running ring self-check");

    let outcome = engine
        .run_ring_calibration(&origin)
        .wrap_err("process ring self-check result")?;

    let c = &outcome.check;
    let p = &outcome.process;
    let text = format!(
        "carts: measured {} / expected {} (matched: {})\npitch: measured {:.1} mm / expected {:.1} mm (within tolerance: {})\nmode: {} -> {}{}",
        c.measured_cart_count,
        c.expected_cart_count,
        c.is_cart_count_matched,
        c.measured_pitch_mm,
        c.expected_pitch_mm,
        c.is_pitch_within_tolerance,
        p.mode,
        engine.mode(),
        if p.configuration_updated {
            format!("\nlocked total cart count: {}", p.detected_cart_count)
        } else {
            String::new()
        },
    );
    emit(json_mode, &calibration_json(&outcome), &text);

    if p.has_error {
        return Err(CheckFailed::RingMismatch {
            expected: p.expected_cart_count,
            detected: p.detected_cart_count,
        }
        .into());
    }
    Ok(())
}

fn chute_check_text(r: &ChuteMappingSelfCheckResult) -> String {
    let mut out = format!(
        "cart count: {}  loops: {}  position tolerance: {:.1} mm\n",
        r.cart_count, r.loop_count, r.position_tolerance_mm
    );
    for i in &r.items {
        out.push_str(&format!(
            "chute {:>3}  expected cart {:>4}  observed {:?}  error {:>7.1} mm  {}\n",
            i.chute_id,
            i.expected_cart_id,
            i.observed_cart_ids,
            i.max_position_error_mm,
            if i.is_passed { "ok" } else { "FAIL" }
        ));
    }
    out.push_str(if r.is_all_passed { "all chutes passed" } else { "chute mapping failed" });
    out
}

pub fn chute_check(
    cfg: &Config,
    events: &Path,
    cart_id_tolerance: Option<u32>,
    json_mode: bool,
) -> Result<()> {
    let engine = build_engine(cfg)?;
    let rows = load_pass_events_csv(events)?;
    let (_, chute_events) = split_pass_events(&rows);

    let mut options = ChuteMappingOptions::from(&cfg.self_check);
    if let Some(t) = cart_id_tolerance {
        options.cart_id_tolerance = t;
    }
    let result = engine.run_chute_mapping_check_with(&chute_events, &options)?;

    let items: Vec<Value> = result
        .items
        .iter()
        .map(|i| {
            json!({
                "chute_id": i.chute_id,
                "expected_cart_id": i.expected_cart_id,
                "observed_cart_ids": i.observed_cart_ids,
                "is_passed": i.is_passed,
                "theoretical_position_mm": i.theoretical_position_mm,
                "max_position_error_mm": i.max_position_error_mm,
            })
        })
        .collect();
    let value = json!({
        "is_all_passed": result.is_all_passed,
        "cart_count": result.cart_count,
        "loop_count": result.loop_count,
        "position_tolerance_mm": result.position_tolerance_mm,
        "items": items,
    });
    emit(json_mode, &value, &chute_check_text(&result));

    if !result.is_all_passed {
        return Err(CheckFailed::ChuteMapping {
            failed: result.failed().count(),
            total: result.items.len(),
        }
        .into());
    }
    Ok(())
}

fn configured_chute_ids(cfg: &Config) -> Vec<u32> {
    let mut ids: Vec<u32> = cfg.chutes.iter().map(|c| c.chute_id).collect();
    ids.sort_unstable();
    ids
}

pub fn resolve(cfg: &Config, head: u32, chute: Option<u32>, json_mode: bool) -> Result<()> {
    let engine = build_engine(cfg)?;
    position_head(&engine, head);

    if let Some(chute_id) = chute {
        let cart = engine.resolve_current_cart_number_for_chute(chute_id)?;
        emit(
            json_mode,
            &json!({ "head": head, "chute_id": chute_id, "cart": cart }),
            &format!("head {head}: chute {chute_id} -> cart {cart}"),
        );
        return Ok(());
    }

    let mut rows = Vec::new();
    let mut text = format!("head {head}");
    for chute_id in configured_chute_ids(cfg) {
        let cart = engine.resolve_current_cart_number_for_chute(chute_id)?;
        rows.push(json!({ "chute_id": chute_id, "cart": cart }));
        text.push_str(&format!("\nchute {chute_id:>3} -> cart {cart}"));
    }
    emit(json_mode, &json!({ "head": head, "chutes": rows }), &text);
    Ok(())
}

pub fn bind(cfg: &Config, package: &str, chute: u32, head: u32, json_mode: bool) -> Result<()> {
    let engine = build_engine(cfg)?;
    position_head(&engine, head);
    let cart = engine.bind_cart_for_new_package(package, chute)?;
    tracing::info!(package, chute, cart, "package bound");
    emit(
        json_mode,
        &json!({ "package_id": package, "chute_id": chute, "cart": cart }),
        &format!("package {package} -> cart {cart} (chute {chute})"),
    );
    Ok(())
}

pub fn replay(cfg: &Config, events: &Path, json_mode: bool) -> Result<()> {
    let engine = build_engine(cfg)?;
    let mut rows = load_pass_events_csv(events)?;
    rows.sort_by_key(|r| r.timestamp_ms);

    let pump = engine.spawn_ingest(
        cfg.ingest.channel_capacity,
        cfg.ingest.window,
        MonotonicClock::new(),
    );
    for row in &rows {
        pump.send(SensorEvent::from(row))
            .map_err(|_| eyre::eyre!("ingest thread stopped before replay finished"))?;
    }
    if !pump.flush(REPLAY_FLUSH_TIMEOUT) {
        eyre::bail!(
            "ingest pump did not drain {} events within {:?}",
            rows.len(),
            REPLAY_FLUSH_TIMEOUT
        );
    }
    let processed = pump.processed();
    drop(pump);

    let head = engine.get_current_head_cart_number().ok();
    let mut chutes = Vec::new();
    let mut text = format!(
        "replayed {processed} events; mode {}; head {}",
        engine.mode(),
        head.map_or_else(|| "unknown".to_string(), |h| h.to_string())
    );
    for chute_id in configured_chute_ids(cfg) {
        match engine.resolve_current_cart_number_for_chute(chute_id) {
            Ok(cart) => {
                chutes.push(json!({ "chute_id": chute_id, "cart": cart }));
                text.push_str(&format!("\nchute {chute_id:>3} -> cart {cart}"));
            }
            Err(e) => {
                chutes.push(json!({ "chute_id": chute_id, "error": e.to_string() }));
                text.push_str(&format!("\nchute {chute_id:>3} -> {e}"));
            }
        }
    }
    emit(
        json_mode,
        &json!({
            "processed": processed,
            "mode": engine.mode().as_str(),
            "head": head,
            "chutes": chutes,
        }),
        &text,
    );
    Ok(())
}

/// Persisted ring state. Health lives only inside a running engine, so it
/// is reported by `ring-check`, not here.
pub fn status(cfg: &Config, json_mode: bool) -> Result<()> {
    let engine = build_engine(cfg)?;
    let ring = engine.ring_configuration();
    let value = json!({
        "mode": engine.mode().as_str(),
        "total_cart_count": ring.total_cart_count,
        "state_file": cfg.ring.state_file.display().to_string(),
        "chutes_configured": cfg.chutes.len(),
    });
    let text = format!(
        "mode: {}\ntotal cart count: {}\nstate file: {}\nchutes configured: {}",
        engine.mode(),
        if ring.is_locked() {
            ring.total_cart_count.to_string()
        } else {
            "not locked".to_string()
        },
        cfg.ring.state_file.display(),
        cfg.chutes.len(),
    );
    emit(json_mode, &value, &text);
    Ok(())
}
