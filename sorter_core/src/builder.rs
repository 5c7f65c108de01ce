//! Type-state builder for `CartRingEngine`.
//!
//! `build()` is only available once a ring configuration store, a chute
//! configuration source, and the topology are set. `try_build()` is always
//! available and reports the missing piece at runtime.

use std::marker::PhantomData;
use std::sync::Arc;

use eyre::WrapErr;
use sorter_traits::{ChuteConfigSource, RingConfigStore};

use crate::binder::PackageCartBinder;
use crate::chute_check::{ChuteMappingOptions, ChuteMappingSelfCheckService};
use crate::engine::CartRingEngine;
use crate::error::{BuildError, Result};
use crate::health::RingHealthMonitor;
use crate::lifecycle::{ConfigurationLifecycleManager, SharedRingStore};
use crate::resolver::{CartAtChuteResolver, SharedChuteSource};
use crate::ring::RingConfigCell;
use crate::ring_check::{RingSelfCheckOptions, RingSelfCheckService};
use crate::topology::TopologySnapshot;
use crate::tracker::CartPositionTracker;

pub struct Missing;
pub struct Set;

pub struct CartRingEngineBuilder<St, Ch, To> {
    store: Option<SharedRingStore>,
    chutes: Option<SharedChuteSource>,
    topology: Option<TopologySnapshot>,
    ring_check: Option<RingSelfCheckOptions>,
    chute_mapping: Option<ChuteMappingOptions>,
    health: Option<Arc<RingHealthMonitor>>,
    _st: PhantomData<St>,
    _ch: PhantomData<Ch>,
    _to: PhantomData<To>,
}

impl Default for CartRingEngineBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            store: None,
            chutes: None,
            topology: None,
            ring_check: None,
            chute_mapping: None,
            health: None,
            _st: PhantomData,
            _ch: PhantomData,
            _to: PhantomData,
        }
    }
}

fn validate_topology(t: &TopologySnapshot) -> Result<()> {
    if t.chute_count == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "chute_count must be > 0",
        )));
    }
    if t.cart_spacing_mm.is_nan() || t.cart_spacing_mm <= 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "cart_spacing_mm must be > 0",
        )));
    }
    if t.chute_width_mm.is_nan() || t.chute_width_mm <= 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "chute_width_mm must be > 0",
        )));
    }
    if t.cart_count < 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "cart_count must be >= 0",
        )));
    }
    Ok(())
}

fn validate_chute_mapping(o: &ChuteMappingOptions) -> Result<()> {
    if o.loop_count == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "loop_count must be >= 1",
        )));
    }
    if o.position_tolerance_mm.is_nan() || o.position_tolerance_mm < 0.0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "position_tolerance_mm must be >= 0",
        )));
    }
    Ok(())
}

impl<St, Ch, To> CartRingEngineBuilder<St, Ch, To> {
    /// Fallible build available in any type-state.
    ///
    /// Loads the persisted ring configuration (absent means unlocked) before
    /// wiring the components together.
    pub fn try_build(self) -> Result<CartRingEngine> {
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let chutes = self
            .chutes
            .ok_or_else(|| eyre::Report::new(BuildError::MissingChuteSource))?;
        let topology = self
            .topology
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTopology))?;
        validate_topology(&topology)?;

        let ring_check = RingSelfCheckService::new(self.ring_check.unwrap_or_default())
            .map_err(|_| {
                eyre::Report::new(BuildError::InvalidConfig(
                    "pitch_tolerance must be in (0.0, 1.0]",
                ))
            })?;
        let chute_mapping = self.chute_mapping.unwrap_or_default();
        validate_chute_mapping(&chute_mapping)?;

        let ring = Arc::new(RingConfigCell::default());
        let health = self.health.unwrap_or_default();
        let lifecycle =
            ConfigurationLifecycleManager::new(Arc::clone(&ring), store, Arc::clone(&health));
        lifecycle
            .load_from_store()
            .wrap_err("load ring configuration")?;

        let tracker = Arc::new(CartPositionTracker::new(Arc::clone(&ring)));
        let resolver = Arc::new(CartAtChuteResolver::new(
            Arc::clone(&ring),
            Arc::clone(&tracker),
            chutes,
        ));
        let binder = PackageCartBinder::new(Arc::clone(&resolver));

        Ok(CartRingEngine {
            ring,
            tracker,
            resolver,
            binder,
            health,
            lifecycle,
            topology,
            ring_check,
            chute_check: ChuteMappingSelfCheckService::new(),
            chute_mapping,
        })
    }

    pub fn with_ring_check(mut self, options: RingSelfCheckOptions) -> Self {
        self.ring_check = Some(options);
        self
    }

    pub fn with_chute_mapping(mut self, options: ChuteMappingOptions) -> Self {
        self.chute_mapping = Some(options);
        self
    }

    /// Share an externally owned health monitor (e.g. with a safety layer).
    pub fn with_health_monitor(mut self, health: Arc<RingHealthMonitor>) -> Self {
        self.health = Some(health);
        self
    }
}

impl<Ch, To> CartRingEngineBuilder<Missing, Ch, To> {
    pub fn with_store(
        self,
        store: impl RingConfigStore + Send + Sync + 'static,
    ) -> CartRingEngineBuilder<Set, Ch, To> {
        self.with_shared_store(Arc::new(store))
    }

    pub fn with_shared_store(self, store: SharedRingStore) -> CartRingEngineBuilder<Set, Ch, To> {
        CartRingEngineBuilder {
            store: Some(store),
            chutes: self.chutes,
            topology: self.topology,
            ring_check: self.ring_check,
            chute_mapping: self.chute_mapping,
            health: self.health,
            _st: PhantomData,
            _ch: PhantomData,
            _to: PhantomData,
        }
    }
}

impl<St, To> CartRingEngineBuilder<St, Missing, To> {
    pub fn with_chute_source(
        self,
        chutes: impl ChuteConfigSource + Send + Sync + 'static,
    ) -> CartRingEngineBuilder<St, Set, To> {
        self.with_shared_chute_source(Arc::new(chutes))
    }

    pub fn with_shared_chute_source(
        self,
        chutes: SharedChuteSource,
    ) -> CartRingEngineBuilder<St, Set, To> {
        CartRingEngineBuilder {
            store: self.store,
            chutes: Some(chutes),
            topology: self.topology,
            ring_check: self.ring_check,
            chute_mapping: self.chute_mapping,
            health: self.health,
            _st: PhantomData,
            _ch: PhantomData,
            _to: PhantomData,
        }
    }
}

impl<St, Ch> CartRingEngineBuilder<St, Ch, Missing> {
    pub fn with_topology(self, topology: TopologySnapshot) -> CartRingEngineBuilder<St, Ch, Set> {
        CartRingEngineBuilder {
            store: self.store,
            chutes: self.chutes,
            topology: Some(topology),
            ring_check: self.ring_check,
            chute_mapping: self.chute_mapping,
            health: self.health,
            _st: PhantomData,
            _ch: PhantomData,
            _to: PhantomData,
        }
    }
}

impl CartRingEngineBuilder<Set, Set, Set> {
    /// Validate and build. Only available once store, chutes, and topology are set.
    pub fn build(self) -> Result<CartRingEngine> {
        self.try_build()
    }
}
