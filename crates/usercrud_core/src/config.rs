//! Store configuration consumed by the connection factory.
//!
//! # Responsibility
//! - Describe where the database lives and how connections are pooled.
//!
//! # Invariants
//! - In-memory stores always use a single pooled connection, because every
//!   in-memory SQLite connection is a separate database.

use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DB_FILE: &str = "usercrud.db";
const DEFAULT_POOL_SIZE: u32 = 4;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Physical location of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl StoreLocation {
    /// Short label used in log events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

/// Connection factory settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    /// Maximum pooled connections. Clamped to 1 for in-memory stores.
    pub pool_size: u32,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// How long `acquire` waits for a free pooled connection.
    pub connection_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::file(DEFAULT_DB_FILE)
    }
}

impl StoreConfig {
    /// File-backed store with default pool settings.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            location: StoreLocation::File(path.as_ref().to_path_buf()),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    /// Private in-memory store, lost when the factory is released.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            pool_size: 1,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    /// Overrides the pool size; zero is treated as one.
    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Pool size actually used when building the factory.
    pub fn effective_pool_size(&self) -> u32 {
        match self.location {
            StoreLocation::Memory => 1,
            StoreLocation::File(_) => self.pool_size.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreConfig, StoreLocation};

    #[test]
    fn memory_store_is_pinned_to_one_connection() {
        let config = StoreConfig::in_memory().with_pool_size(8);
        assert_eq!(config.location, StoreLocation::Memory);
        assert_eq!(config.effective_pool_size(), 1);
    }

    #[test]
    fn zero_pool_size_is_raised_to_one() {
        let config = StoreConfig::file("/tmp/x.db").with_pool_size(0);
        assert_eq!(config.effective_pool_size(), 1);
    }
}
