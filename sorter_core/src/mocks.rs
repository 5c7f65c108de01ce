//! In-memory collaborators for tests and offline tooling.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use sorter_traits::{BoxError, RingConfigStore, RingConfiguration};

/// Ring configuration store kept in memory; counts saves.
#[derive(Debug, Default)]
pub struct MemoryRingConfigStore {
    stored: Mutex<Option<RingConfiguration>>,
    saves: AtomicUsize,
}

impl MemoryRingConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RingConfiguration) -> Self {
        Self {
            stored: Mutex::new(Some(config)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn stored(&self) -> Option<RingConfiguration> {
        self.stored.lock().map(|g| *g).unwrap_or(None)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl RingConfigStore for MemoryRingConfigStore {
    fn load(&self) -> Result<Option<RingConfiguration>, BoxError> {
        self.stored
            .lock()
            .map(|g| *g)
            .map_err(|_| "ring store lock poisoned".into())
    }

    fn save(&self, config: &RingConfiguration) -> Result<(), BoxError> {
        let mut g = self
            .stored
            .lock()
            .map_err(|_| -> BoxError { "ring store lock poisoned".into() })?;
        *g = Some(*config);
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A store whose every operation fails; exercises error propagation.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingRingConfigStore;

impl RingConfigStore for FailingRingConfigStore {
    fn load(&self) -> Result<Option<RingConfiguration>, BoxError> {
        Err(Box::new(std::io::Error::other("ring store unavailable")))
    }

    fn save(&self, _config: &RingConfiguration) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("ring store unavailable")))
    }
}
