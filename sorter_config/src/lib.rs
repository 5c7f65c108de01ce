#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and file loaders for the sorter.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Chute calibration and recorded pass events are loaded from CSV with
//!   strict headers.
//! - `FileRingConfigStore` persists the learned ring configuration.
//! - `ChuteCfg` converts into the runtime `ChuteConfig`.
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sorter_traits::ChuteConfig;

pub mod store;

pub use store::FileRingConfigStore;

/// Static ring geometry.
#[derive(Debug, Deserialize, Clone)]
pub struct Topology {
    /// Cart count from the layout; used only while the ring is unlocked.
    #[serde(default)]
    pub cart_count: i32,
    pub cart_spacing_mm: f64,
    pub ring_total_length_mm: f64,
    pub chute_count: u32,
    pub chute_width_mm: f64,
    pub cart_width_mm: f64,
    pub track_length_mm: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RingCfg {
    /// Where the learned ring configuration is persisted.
    pub state_file: PathBuf,
}

impl Default for RingCfg {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("var/ring_state.toml"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelfCheckCfg {
    /// Allowed relative pitch deviation, (0.0, 1.0]
    pub pitch_tolerance: f64,
    pub loop_count: u32,
    pub cart_id_tolerance: u32,
    pub position_tolerance_mm: f64,
}

impl Default for SelfCheckCfg {
    fn default() -> Self {
        Self {
            pitch_tolerance: 0.05,
            loop_count: 3,
            cart_id_tolerance: 0,
            position_tolerance_mm: 50.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestCfg {
    /// Bounded queue between the sensor producer and the ingest thread
    pub channel_capacity: usize,
    /// Pass events retained per sensor kind for the next self-check
    pub window: usize,
}

impl Default for IngestCfg {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            window: 4096,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_max_open_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChuteCfg {
    pub chute_id: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Cart number seen at this chute while the head cart number was 1
    pub cart_number_at_head_one: i32,
    #[serde(default = "default_max_open_ms")]
    pub max_open_ms: u64,
}

impl From<&ChuteCfg> for ChuteConfig {
    fn from(c: &ChuteCfg) -> Self {
        Self {
            chute_id: c.chute_id,
            is_enabled: c.enabled,
            cart_number_at_head_one: c.cart_number_at_head_one,
            max_open_duration: Duration::from_millis(c.max_open_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub topology: Topology,
    #[serde(default)]
    pub ring: RingCfg,
    #[serde(default)]
    pub self_check: SelfCheckCfg,
    #[serde(default)]
    pub ingest: IngestCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub chutes: Vec<ChuteCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Chute calibration CSV schema.
///
/// Expected headers:
/// chute_id,cart_number_at_head_one
///
/// Example:
/// chute_id,cart_number_at_head_one
/// 1,90
/// 3,80
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ChuteCalibrationRow {
    pub chute_id: u32,
    pub cart_number_at_head_one: i32,
}

/// Recorded pass event CSV schema.
///
/// Expected headers:
/// chute_id,cart_id,timestamp_ms,line_speed_mmps
///
/// An empty `chute_id` marks an origin sensor event; an empty `cart_id`
/// marks a pass where the cart could not be identified.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PassEventRow {
    pub chute_id: Option<u32>,
    pub cart_id: Option<i32>,
    pub timestamp_ms: u64,
    pub line_speed_mmps: f64,
}

fn read_strict_csv<T: serde::de::DeserializeOwned>(
    path: &Path,
    what: &str,
    expected: &[&str],
) -> eyre::Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open {what} CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "{what} CSV must have headers '{}', got: {}",
            expected.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<T>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid {what} CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}

pub fn load_chute_calibration_csv(path: &Path) -> eyre::Result<Vec<ChuteCalibrationRow>> {
    let rows: Vec<ChuteCalibrationRow> = read_strict_csv(
        path,
        "chute calibration",
        &["chute_id", "cart_number_at_head_one"],
    )?;
    let mut seen = HashSet::new();
    for r in &rows {
        if !seen.insert(r.chute_id) {
            eyre::bail!("chute calibration CSV lists chute {} twice", r.chute_id);
        }
        if r.cart_number_at_head_one < 1 {
            eyre::bail!(
                "chute {} cart_number_at_head_one must be >= 1, got {}",
                r.chute_id,
                r.cart_number_at_head_one
            );
        }
    }
    Ok(rows)
}

pub fn load_pass_events_csv(path: &Path) -> eyre::Result<Vec<PassEventRow>> {
    read_strict_csv(
        path,
        "pass event",
        &["chute_id", "cart_id", "timestamp_ms", "line_speed_mmps"],
    )
}

impl Config {
    /// Override `cart_number_at_head_one` of configured chutes with
    /// calibration rows. Rows for unconfigured chutes are rejected.
    pub fn apply_chute_calibration(&mut self, rows: &[ChuteCalibrationRow]) -> eyre::Result<()> {
        for row in rows {
            let Some(chute) = self.chutes.iter_mut().find(|c| c.chute_id == row.chute_id) else {
                eyre::bail!(
                    "chute calibration lists chute {} which is not configured",
                    row.chute_id
                );
            };
            chute.cart_number_at_head_one = row.cart_number_at_head_one;
        }
        Ok(())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Topology
        let t = &self.topology;
        if t.chute_count == 0 {
            eyre::bail!("topology.chute_count must be > 0");
        }
        if t.cart_count < 0 {
            eyre::bail!("topology.cart_count must be >= 0");
        }
        for (name, v) in [
            ("cart_spacing_mm", t.cart_spacing_mm),
            ("ring_total_length_mm", t.ring_total_length_mm),
            ("chute_width_mm", t.chute_width_mm),
            ("cart_width_mm", t.cart_width_mm),
            ("track_length_mm", t.track_length_mm),
        ] {
            if !(v.is_finite() && v > 0.0) {
                eyre::bail!("topology.{name} must be > 0");
            }
        }

        // Self-check
        let sc = &self.self_check;
        if !(sc.pitch_tolerance > 0.0 && sc.pitch_tolerance <= 1.0) {
            eyre::bail!("self_check.pitch_tolerance must be in (0.0, 1.0]");
        }
        if sc.loop_count == 0 {
            eyre::bail!("self_check.loop_count must be >= 1");
        }
        if !(sc.position_tolerance_mm.is_finite() && sc.position_tolerance_mm >= 0.0) {
            eyre::bail!("self_check.position_tolerance_mm must be >= 0");
        }

        // Ingest
        if self.ingest.channel_capacity == 0 {
            eyre::bail!("ingest.channel_capacity must be >= 1");
        }
        if self.ingest.window == 0 {
            eyre::bail!("ingest.window must be >= 1");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref() {
            if !matches!(r, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly, got '{r}'");
            }
        }

        // Ring
        if self.ring.state_file.as_os_str().is_empty() {
            eyre::bail!("ring.state_file must not be empty");
        }

        // Chutes
        let mut seen = HashSet::new();
        for c in &self.chutes {
            if !seen.insert(c.chute_id) {
                eyre::bail!("chute {} is configured twice", c.chute_id);
            }
            if !(1..=t.chute_count).contains(&c.chute_id) {
                eyre::bail!(
                    "chute {} is outside 1..={} (topology.chute_count)",
                    c.chute_id,
                    t.chute_count
                );
            }
            if c.cart_number_at_head_one < 1 {
                eyre::bail!(
                    "chute {} cart_number_at_head_one must be >= 1, got {}",
                    c.chute_id,
                    c.cart_number_at_head_one
                );
            }
            if c.max_open_ms == 0 {
                eyre::bail!("chute {} max_open_ms must be >= 1", c.chute_id);
            }
        }

        Ok(())
    }
}
