use std::time::Duration;

use ocfl_inventory::OcflConfig;
use ocfl_lock::InMemoryObjectLock;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Storage engine configuration.
///
/// ```toml
/// worker_threads = 8
/// lock_wait_ms = 5000
///
/// [ocfl]
/// default_digest_algorithm = "sha256"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Size of the worker pool used for content transfer and fixity checks.
    pub worker_threads: usize,
    /// Defaults for newly created objects.
    pub ocfl: OcflConfig,
    /// How long to wait for a per-object write lock, in milliseconds.
    pub lock_wait_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            ocfl: OcflConfig::default(),
            lock_wait_ms: 10_000,
        }
    }
}

impl StorageConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> StorageResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.worker_threads == 0 {
            return Err(StorageError::ConfigurationInvalid(
                "worker_threads must be greater than 0".into(),
            ));
        }
        self.ocfl.validate()?;
        Ok(())
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    /// An in-process object lock using the configured wait.
    pub fn in_memory_lock(&self) -> InMemoryObjectLock {
        InMemoryObjectLock::new(self.lock_wait())
    }
}
