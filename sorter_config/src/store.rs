//! File-backed ring configuration store.
//!
//! The ring configuration lives in a single small TOML file:
//!
//! ```toml
//! total_cart_count = 100
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sorter_traits::{BoxError, RingConfigStore, RingConfiguration};

#[derive(Debug, Serialize, Deserialize)]
struct RingStateFile {
    total_cart_count: i32,
}

#[derive(Debug, Clone)]
pub struct FileRingConfigStore {
    path: PathBuf,
}

impl FileRingConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RingConfigStore for FileRingConfigStore {
    fn load(&self) -> Result<Option<RingConfiguration>, BoxError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Box::new(e)),
        };
        let state: RingStateFile = toml::from_str(&text)?;
        Ok(Some(RingConfiguration::new(state.total_cart_count)))
    }

    fn save(&self, config: &RingConfiguration) -> Result<(), BoxError> {
        let body = toml::to_string(&RingStateFile {
            total_cart_count: config.total_cart_count,
        })?;
        self.replace_file(body.as_bytes())?;
        Ok(())
    }
}

impl FileRingConfigStore {
    /// Write into a sibling temp file and rename it over the state file, so
    /// a crash mid-save leaves the previous lock intact.
    fn replace_file(&self, bytes: &[u8]) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
