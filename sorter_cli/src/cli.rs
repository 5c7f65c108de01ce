//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "sorter", version, about = "Cart ring bring-up and calibration tooling")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/sorter.toml")]
    pub config: PathBuf,

    /// Optional chute calibration CSV (chute_id,cart_number_at_head_one)
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Print results and logs as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze recorded origin passes and learn or verify the ring cart count
    RingCheck {
        /// Pass-event CSV (chute_id,cart_id,timestamp_ms,line_speed_mmps)
        #[arg(long, value_name = "FILE")]
        events: PathBuf,
    },
    /// Cross-check chute calibration against the ring geometry
    ChuteCheck {
        /// Pass-event CSV (chute_id,cart_id,timestamp_ms,line_speed_mmps)
        #[arg(long, value_name = "FILE")]
        events: PathBuf,
        /// Override self_check.cart_id_tolerance
        #[arg(long, value_name = "N")]
        cart_id_tolerance: Option<u32>,
    },
    /// Print the cart at a chute (or every configured chute) for a given head cart
    Resolve {
        /// Head cart number at the origin sensor (1-based)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        head: u32,
        /// Chute to resolve; all configured chutes when omitted
        #[arg(long, value_name = "ID")]
        chute: Option<u32>,
    },
    /// Bind a new package to the cart that will carry it to a chute
    Bind {
        /// Package identifier
        #[arg(long, value_name = "ID")]
        package: String,
        /// Destination chute
        #[arg(long, value_name = "ID")]
        chute: u32,
        /// Head cart number at the origin sensor (1-based)
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        head: u32,
    },
    /// Feed recorded events through the ingest pump and report the final state
    Replay {
        /// Pass-event CSV (chute_id,cart_id,timestamp_ms,line_speed_mmps)
        #[arg(long, value_name = "FILE")]
        events: PathBuf,
    },
    /// Ring mode, locked cart count, and health
    Status,
}
