#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod cli;
mod commands;
mod error_fmt;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use eyre::{Result, WrapErr};
use sorter_config::{Config, Logging, load_chute_calibration_csv};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() -> ExitCode {
    // Report formatting only; errors are printed below.
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&err));
            } else {
                eprintln!("{}", humanize(&err));
            }
            ExitCode::from(exit_code_for_error(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config, cli.calibration.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), chutes = cfg.chutes.len(), "config loaded");

    match cli.cmd {
        Commands::RingCheck { events } => commands::ring_check(&cfg, &events, cli.json),
        Commands::ChuteCheck {
            events,
            cart_id_tolerance,
        } => commands::chute_check(&cfg, &events, cart_id_tolerance, cli.json),
        Commands::Resolve { head, chute } => commands::resolve(&cfg, head, chute, cli.json),
        Commands::Bind {
            package,
            chute,
            head,
        } => commands::bind(&cfg, &package, chute, head, cli.json),
        Commands::Replay { events } => commands::replay(&cfg, &events, cli.json),
        Commands::Status => commands::status(&cfg, cli.json),
    }
}

/// Read and validate the TOML config, then overlay the chute calibration CSV.
fn load_config(path: &Path, calibration: Option<&Path>) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let mut cfg: Config = toml::from_str(&text)
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    if let Some(csv) = calibration {
        let rows = load_chute_calibration_csv(csv)?;
        cfg.apply_chute_calibration(&rows)?;
    }
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console layer (pretty or JSON lines on stderr) plus an optional JSON
/// file sink from `[logging]`. `RUST_LOG` overrides `--log-level`.
fn init_tracing(json: bool, level: &str, logging: &Logging) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level '{level}'"))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let prefix = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("sorter.log");
        let rotation = match logging.rotation.as_deref() {
            Some("daily") => Rotation::DAILY,
            Some("hourly") => Rotation::HOURLY,
            _ => Rotation::NEVER,
        };
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("create log directory {}", dir.display()))?;
        let appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(prefix)
            .build(dir)
            .wrap_err_with(|| format!("open log file {file}"))?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_level = logging.level.as_deref().unwrap_or("info");
        let file_filter = EnvFilter::try_new(file_level)
            .wrap_err_with(|| format!("invalid logging.level '{file_level}'"))?;
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
