//! Composition root for the cart ring core.
//!
//! `CartRingEngine` is constructed explicitly at process start (see
//! `builder`) and owns the shared ring snapshot, tracker, resolver, binder,
//! health monitor, lifecycle manager, and both self-check services.

use std::sync::Arc;

use sorter_traits::RingConfiguration;
use sorter_traits::clock::Clock;

use crate::binder::PackageCartBinder;
use crate::builder::{CartRingEngineBuilder, Missing};
use crate::chute_check::{
    ChuteMappingOptions, ChuteMappingSelfCheckResult, ChuteMappingSelfCheckService,
};
use crate::error::{ArgumentError, BindError, LifecycleError, ResolveError};
use crate::health::{RingHealthMonitor, RingHealthStatus};
use crate::ingest::PassEventPump;
use crate::lifecycle::{ConfigurationLifecycleManager, ConfigurationProcessResult};
use crate::resolver::CartAtChuteResolver;
use crate::ring::{RingMode, SharedRingConfig};
use crate::ring_check::{RingSelfCheckResult, RingSelfCheckService};
use crate::topology::{ChutePassEvent, PassEvent, TopologySnapshot};
use crate::tracker::{CartIndex, CartPositionTracker};

/// Outcome of one ring calibration cycle: the analysis and what the
/// lifecycle manager made of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RingCalibrationOutcome {
    pub check: RingSelfCheckResult,
    pub process: ConfigurationProcessResult,
}

pub struct CartRingEngine {
    pub(crate) ring: SharedRingConfig,
    pub(crate) tracker: Arc<CartPositionTracker>,
    pub(crate) resolver: Arc<CartAtChuteResolver>,
    pub(crate) binder: PackageCartBinder,
    pub(crate) health: Arc<RingHealthMonitor>,
    pub(crate) lifecycle: ConfigurationLifecycleManager,
    pub(crate) topology: TopologySnapshot,
    pub(crate) ring_check: RingSelfCheckService,
    pub(crate) chute_check: ChuteMappingSelfCheckService,
    pub(crate) chute_mapping: ChuteMappingOptions,
}

impl core::fmt::Debug for CartRingEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CartRingEngine")
            .field("ring", &self.ring.snapshot())
            .field("head", &self.tracker.head())
            .field("healthy", &self.health.is_healthy())
            .finish()
    }
}

impl CartRingEngine {
    pub fn builder() -> CartRingEngineBuilder<Missing, Missing, Missing> {
        CartRingEngineBuilder::default()
    }

    pub fn tracker(&self) -> &Arc<CartPositionTracker> {
        &self.tracker
    }

    pub fn resolver(&self) -> &Arc<CartAtChuteResolver> {
        &self.resolver
    }

    pub fn binder(&self) -> &PackageCartBinder {
        &self.binder
    }

    pub fn lifecycle(&self) -> &ConfigurationLifecycleManager {
        &self.lifecycle
    }

    pub fn health(&self) -> Arc<RingHealthStatus> {
        self.health.status()
    }

    pub fn health_monitor(&self) -> &Arc<RingHealthMonitor> {
        &self.health
    }

    pub fn ring_configuration(&self) -> RingConfiguration {
        self.ring.snapshot()
    }

    pub fn mode(&self) -> RingMode {
        self.ring.mode()
    }

    /// Topology carrying the current ring configuration.
    pub fn topology(&self) -> TopologySnapshot {
        self.topology.with_ring(&self.ring.snapshot())
    }

    pub fn on_cart_passed_origin(&self, timestamp: std::time::Duration) -> CartIndex {
        self.tracker.on_cart_passed_origin(timestamp)
    }

    pub fn resolve_current_cart_number_for_chute(
        &self,
        chute_id: u32,
    ) -> Result<i32, ResolveError> {
        self.resolver.resolve_current_cart_number_for_chute(chute_id)
    }

    pub fn get_current_head_cart_number(&self) -> Result<i64, ResolveError> {
        self.resolver.get_current_head_cart_number()
    }

    pub fn bind_cart_for_new_package(
        &self,
        package_id: &str,
        chute_id: u32,
    ) -> Result<i32, BindError> {
        self.binder.bind_cart_for_new_package(package_id, chute_id)
    }

    /// Analyze origin pass events and hand the result to the lifecycle
    /// manager (learn while unlocked, verify once locked).
    pub fn run_ring_calibration(
        &self,
        pass_events: &[PassEvent],
    ) -> Result<RingCalibrationOutcome, LifecycleError> {
        let check = self.ring_check.run_analysis(pass_events, &self.topology());
        let process = self.lifecycle.process_self_check_result(&check)?;
        if process.configuration_updated {
            // The head counted up unbounded while learning.
            if let Some(n) = self.ring.ring_length() {
                self.tracker.fold_into_ring(n);
            }
        }
        Ok(RingCalibrationOutcome { check, process })
    }

    /// Geometric chute mapping check with the configured options.
    pub fn run_chute_mapping_check(
        &self,
        chute_pass_events: &[ChutePassEvent],
    ) -> Result<ChuteMappingSelfCheckResult, ArgumentError> {
        self.run_chute_mapping_check_with(chute_pass_events, &self.chute_mapping)
    }

    pub fn run_chute_mapping_check_with(
        &self,
        chute_pass_events: &[ChutePassEvent],
        options: &ChuteMappingOptions,
    ) -> Result<ChuteMappingSelfCheckResult, ArgumentError> {
        self.chute_check
            .analyze(chute_pass_events, &self.topology(), options)
    }

    /// Start the sensor ingest thread feeding this engine's tracker.
    pub fn spawn_ingest<C: Clock + Send + Sync + 'static>(
        &self,
        channel_capacity: usize,
        window: usize,
        clock: C,
    ) -> PassEventPump {
        PassEventPump::spawn(Arc::clone(&self.tracker), channel_capacity, window, clock)
    }

    /// Run one calibration cycle over the origin events the pump has
    /// retained since the last cycle. The window is drained up front, so
    /// events arriving during analysis are kept for the next cycle.
    pub fn calibrate_from_pump(
        &self,
        pump: &PassEventPump,
    ) -> Result<RingCalibrationOutcome, LifecycleError> {
        let events = pump.drain_origin_events();
        self.run_ring_calibration(&events)
    }
}
