//! Database configuration.

use std::path::PathBuf;

use sacrud_catalog_core::StorageConfig;

use crate::error::Error;

/// Default data directory.
pub const DEFAULT_DATA_PATH: &str = "./sacrud_catalog_data";

/// Default page cache capacity (64MB).
pub const DEFAULT_CACHE_CAPACITY: u64 = 64 * 1024 * 1024;

/// Default background flush interval in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 500;

/// Configuration for an embedded catalog database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Directory holding the database files.
    pub data_path: PathBuf,

    /// Keep everything in memory and drop it on close.
    pub temporary: bool,

    /// Page cache capacity in bytes.
    pub cache_capacity: u64,

    /// Background flush interval in milliseconds. None flushes only on demand.
    pub flush_interval_ms: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            temporary: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            flush_interval_ms: Some(DEFAULT_FLUSH_INTERVAL_MS),
        }
    }
}

impl DatabaseConfig {
    /// Create a configuration for a database stored at `data_path`.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Default::default()
        }
    }

    /// Create an in-memory configuration.
    pub fn temporary() -> Self {
        Self {
            data_path: PathBuf::new(),
            temporary: true,
            ..Default::default()
        }
    }

    /// Set the page cache capacity.
    pub fn with_cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Set the background flush interval.
    pub fn with_flush_interval_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_interval_ms = ms;
        self
    }

    /// Check the configuration before opening anything.
    pub fn validate(&self) -> Result<(), Error> {
        if self.cache_capacity == 0 {
            return Err(Error::Config("cache capacity must be positive".into()));
        }
        if !self.temporary && self.data_path.as_os_str().is_empty() {
            return Err(Error::Config("data path is empty".into()));
        }
        if self.flush_interval_ms == Some(0) {
            return Err(Error::Config("flush interval must be positive".into()));
        }
        Ok(())
    }

    /// The storage engine configuration for this database.
    pub fn to_storage_config(&self) -> StorageConfig {
        let config = if self.temporary {
            StorageConfig::temporary()
        } else {
            StorageConfig::new(&self.data_path)
        };
        config
            .with_cache_capacity(self.cache_capacity)
            .with_flush_every_ms(self.flush_interval_ms)
    }
}
