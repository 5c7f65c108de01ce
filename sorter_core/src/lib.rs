#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Cart ring topology and chute-cart binding (hardware-agnostic).
//!
//! Knows, at any instant and for any chute, which cart number is positioned
//! there, given only a count of carts passing the origin sensor and a
//! per-chute calibration recorded while cart 1 was at the origin.
//!
//! ## Architecture
//!
//! - **Calculator**: pure ring arithmetic (`calculator`)
//! - **Tracker**: head cart index at the origin sensor (`tracker`)
//! - **Ring / Lifecycle**: learn-then-lock of the total cart count (`ring`, `lifecycle`)
//! - **Health**: sticky cart count mismatch fault (`health`)
//! - **Resolver / Binder**: cart at chute, package binding (`resolver`, `binder`)
//! - **Self-checks**: ring statistics and geometric chute mapping (`ring_check`, `chute_check`)
//! - **Ingest**: single-producer sensor event pump (`ingest`)
//! - **Engine**: explicit composition root with a type-state builder (`engine`, `builder`)
//!
//! ## Concurrency
//!
//! Shared state (ring configuration, head position, health, chute table) is
//! held as immutable snapshots swapped atomically under a short lock
//! (`snapshot::SnapshotCell`). Readers never observe a half-applied update.

pub mod binder;
pub mod builder;
pub mod calculator;
pub mod chute_check;
pub mod chutes;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod health;
pub mod ingest;
pub mod lifecycle;
pub mod mocks;
pub mod resolver;
pub mod ring;
pub mod ring_check;
pub mod snapshot;
pub mod topology;
pub mod tracker;
pub mod util;

pub use binder::PackageCartBinder;
pub use builder::CartRingEngineBuilder;
pub use chute_check::{
    ChuteMappingCheckItem, ChuteMappingOptions, ChuteMappingSelfCheckResult,
    ChuteMappingSelfCheckService,
};
pub use chutes::ChuteConfigTable;
pub use engine::{CartRingEngine, RingCalibrationOutcome};
pub use error::{
    ArgumentError, BindError, BuildError, InvalidReason, LifecycleError, NotFoundReason,
    NotReadyReason, ResolveError,
};
pub use health::{RingHealthMonitor, RingHealthStatus};
pub use ingest::PassEventPump;
pub use lifecycle::{ConfigurationLifecycleManager, ConfigurationProcessResult};
pub use resolver::CartAtChuteResolver;
pub use ring::{RingConfigCell, RingMode};
pub use ring_check::{RingSelfCheckOptions, RingSelfCheckResult, RingSelfCheckService};
pub use topology::{ChutePassEvent, PassEvent, SensorEvent, TopologySnapshot};
pub use tracker::{CartIndex, CartPositionTracker, HeadPosition};

pub use sorter_traits::{ChuteConfig, RingConfiguration};
