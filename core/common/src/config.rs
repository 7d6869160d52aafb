//! Runtime configuration of the streaming engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default chunk size for streaming transforms (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default number of idle buffers the pool retains.
pub const DEFAULT_POOL_CAPACITY: usize = 16;

/// Default minimum number of bytes between two progress reports (1 MiB).
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1024 * 1024;

/// Upper bound on the chunk size (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Engine configuration.
///
/// Every field has a default, so a partial JSON document is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of each read from the input stream.
    pub chunk_size: usize,
    /// Maximum number of idle buffers kept by the buffer pool.
    pub pool_capacity: usize,
    /// Minimum number of processed bytes between progress callbacks.
    pub progress_interval: u64,
}

impl EngineConfig {
    /// Create a configuration with the given chunk size.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }

    /// Set the pool capacity.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Set the progress interval.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    /// - Chunk size is zero or larger than `MAX_CHUNK_SIZE`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidInput(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::InvalidInput(format!(
                "chunk_size must not exceed {} bytes",
                MAX_CHUNK_SIZE
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}
