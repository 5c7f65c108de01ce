//! Collaborator seams for the cart ring core.
//!
//! Everything the core consumes from the outside world (chute configuration,
//! ring configuration persistence, time) is expressed here as a trait so the
//! core stays free of storage and hardware concerns.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// Boxed error used at trait boundaries; implementations are free to choose
/// their own concrete error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Persisted ring configuration.
///
/// `total_cart_count <= 0` means the ring length is still being learned;
/// a positive value is the locked cart count used for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingConfiguration {
    pub total_cart_count: i32,
}

impl RingConfiguration {
    pub const fn new(total_cart_count: i32) -> Self {
        Self { total_cart_count }
    }

    /// True once a positive cart count has been locked.
    #[inline]
    pub const fn is_locked(&self) -> bool {
        self.total_cart_count > 0
    }
}

/// Per-chute configuration as delivered by the chute configuration provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChuteConfig {
    pub chute_id: u32,
    pub is_enabled: bool,
    /// Cart number observed at this chute while the head cart number was 1.
    pub cart_number_at_head_one: i32,
    /// Longest time the diverter may stay open for this chute.
    pub max_open_duration: Duration,
}

/// Keyed, hot-reloadable source of chute configuration.
///
/// Callers must not cache results: every lookup should reflect the latest reload.
pub trait ChuteConfigSource {
    fn chute_config(&self, chute_id: u32) -> Option<ChuteConfig>;
}

/// Persistence for the ring configuration, stored under a single fixed key.
pub trait RingConfigStore {
    /// Load the stored configuration. `Ok(None)` means nothing was stored yet.
    fn load(&self) -> Result<Option<RingConfiguration>, BoxError>;
    fn save(&self, config: &RingConfiguration) -> Result<(), BoxError>;
}

impl<T: ChuteConfigSource + ?Sized> ChuteConfigSource for std::sync::Arc<T> {
    fn chute_config(&self, chute_id: u32) -> Option<ChuteConfig> {
        (**self).chute_config(chute_id)
    }
}

impl<T: RingConfigStore + ?Sized> RingConfigStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<RingConfiguration>, BoxError> {
        (**self).load()
    }
    fn save(&self, config: &RingConfiguration) -> Result<(), BoxError> {
        (**self).save(config)
    }
}
