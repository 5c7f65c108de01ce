//! Learn-then-lock lifecycle of the ring configuration.
//!
//! While the cart count is unknown the first self-check with a non-zero
//! measured count is persisted and locks the ring. Once locked, self-checks
//! only verify: a mismatch is reported and raised on the health monitor but
//! never corrected here. Only `relock` (an explicit operator write) can
//! replace a locked count.
//!
//! All writes go through one gate so read-decide-persist-publish sequences
//! from concurrent calibration cycles cannot interleave.

use std::sync::{Arc, Mutex, PoisonError};

use sorter_traits::{RingConfigStore, RingConfiguration};

use crate::error::{ArgumentError, LifecycleError};
use crate::health::{RingHealthMonitor, cart_count_mismatch_message};
use crate::ring::{RingMode, SharedRingConfig};
use crate::ring_check::RingSelfCheckResult;

pub type SharedRingStore = Arc<dyn RingConfigStore + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationProcessResult {
    pub configuration_updated: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
    /// Mode the result was processed in.
    pub mode: RingMode,
    pub expected_cart_count: i32,
    pub detected_cart_count: i32,
}

pub struct ConfigurationLifecycleManager {
    ring: SharedRingConfig,
    store: SharedRingStore,
    health: Arc<RingHealthMonitor>,
    write_gate: Mutex<()>,
}

impl core::fmt::Debug for ConfigurationLifecycleManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfigurationLifecycleManager")
            .field("ring", &self.ring.snapshot())
            .field("healthy", &self.health.is_healthy())
            .finish()
    }
}

impl ConfigurationLifecycleManager {
    pub fn new(
        ring: SharedRingConfig,
        store: SharedRingStore,
        health: Arc<RingHealthMonitor>,
    ) -> Self {
        Self {
            ring,
            store,
            health,
            write_gate: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> RingMode {
        self.ring.mode()
    }

    pub fn current(&self) -> RingConfiguration {
        self.ring.snapshot()
    }

    /// Publish the stored configuration. Nothing stored yet means unlocked.
    pub fn load_from_store(&self) -> Result<RingConfiguration, LifecycleError> {
        let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);
        let config = self
            .store
            .load()
            .map_err(LifecycleError::Persistence)?
            .unwrap_or_default();
        self.ring.replace(config);
        tracing::info!(
            total_cart_count = config.total_cart_count,
            mode = %RingMode::of(&config),
            "ring configuration loaded"
        );
        Ok(config)
    }

    pub fn process_self_check_result(
        &self,
        result: &RingSelfCheckResult,
    ) -> Result<ConfigurationProcessResult, LifecycleError> {
        let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.ring.snapshot();
        let detected = result.measured_cart_count;

        match RingMode::of(&current) {
            RingMode::AutoLearning => {
                if detected <= 0 {
                    tracing::debug!("ring self-check saw no carts yet; still learning");
                    return Ok(ConfigurationProcessResult {
                        configuration_updated: false,
                        has_error: false,
                        error_message: None,
                        mode: RingMode::AutoLearning,
                        expected_cart_count: current.total_cart_count,
                        detected_cart_count: detected,
                    });
                }
                let next = RingConfiguration::new(detected);
                self.store
                    .save(&next)
                    .map_err(LifecycleError::Persistence)?;
                self.ring.replace(next);
                tracing::info!(total_cart_count = detected, "ring cart count learned and locked");
                Ok(ConfigurationProcessResult {
                    configuration_updated: true,
                    has_error: false,
                    error_message: None,
                    mode: RingMode::AutoLearning,
                    expected_cart_count: current.total_cart_count,
                    detected_cart_count: detected,
                })
            }
            RingMode::Verification => {
                let expected = current.total_cart_count;
                if detected == expected {
                    if self.health.clear_cart_count_mismatch() {
                        tracing::info!(expected, "ring cart count verified; mismatch fault cleared");
                    }
                    return Ok(ConfigurationProcessResult {
                        configuration_updated: false,
                        has_error: false,
                        error_message: None,
                        mode: RingMode::Verification,
                        expected_cart_count: expected,
                        detected_cart_count: detected,
                    });
                }
                self.health.raise_cart_count_mismatch(expected, detected);
                tracing::warn!(expected, detected, "ring cart count mismatch");
                Ok(ConfigurationProcessResult {
                    configuration_updated: false,
                    has_error: true,
                    error_message: Some(cart_count_mismatch_message(expected, detected)),
                    mode: RingMode::Verification,
                    expected_cart_count: expected,
                    detected_cart_count: detected,
                })
            }
        }
    }

    /// Explicit operator write replacing the locked cart count wholesale.
    /// Clears any cart count mismatch fault.
    pub fn relock(&self, total_cart_count: i32) -> Result<RingConfiguration, LifecycleError> {
        if total_cart_count <= 0 {
            return Err(ArgumentError::NonPositiveLockCount(total_cart_count).into());
        }
        let _gate = self.write_gate.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.ring.snapshot().total_cart_count;
        let next = RingConfiguration::new(total_cart_count);
        self.store
            .save(&next)
            .map_err(LifecycleError::Persistence)?;
        self.ring.replace(next);
        self.health.clear_cart_count_mismatch();
        tracing::info!(previous, total_cart_count, "ring cart count relocked");
        Ok(next)
    }
}
