//! Store configuration
//!
//! A `StoreConfig` names the database and the root directory that holds one
//! sub-directory per collection. It can be built in code or read from a JSON
//! file:
//!
//! ```json
//! { "name": "app", "root": "/var/lib/app/db", "durability": "relaxed" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FastDbError, Result};
use crate::logging::LogLevel;

/// How hard a save works to survive power loss
///
/// Both modes replace the collection file atomically (write to a temporary
/// file, then rename), so readers never observe a partial file. They differ
/// only in fsync behavior.
///
/// - **Safe**: fsync the temporary file before the rename and the directory
///   after it. A completed save survives a crash.
/// - **Relaxed**: no fsync. A crash may lose the most recent saves, but the
///   file is always some complete snapshot.
///
/// # Examples
///
/// ```rust
/// use fastdb_core::DurabilityMode;
///
/// assert_eq!(DurabilityMode::default(), DurabilityMode::Safe);
/// assert!(!DurabilityMode::Relaxed.fsync());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityMode {
    Safe,
    Relaxed,
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::Safe
    }
}

impl DurabilityMode {
    pub fn fsync(&self) -> bool {
        matches!(self, DurabilityMode::Safe)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database name (informational, must be non-empty)
    pub name: String,
    /// Root directory; created on open if missing
    pub root: PathBuf,
    #[serde(default)]
    pub durability: DurabilityMode,
    /// Applied to the global logger when the store is opened
    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

impl StoreConfig {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        StoreConfig {
            name: name.into(),
            root: root.into(),
            durability: DurabilityMode::default(),
            log_level: None,
        }
    }

    pub fn with_durability(mut self, durability: DurabilityMode) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| FastDbError::storage(path, e))?;
        let config: StoreConfig = serde_json::from_slice(&raw).map_err(|e| {
            FastDbError::Configuration(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject an empty name or root path
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FastDbError::Configuration(
                "Database name is required".to_string(),
            ));
        }
        if self.root.as_os_str().is_empty() {
            return Err(FastDbError::Configuration(
                "Database path is required".to_string(),
            ));
        }
        Ok(())
    }
}
