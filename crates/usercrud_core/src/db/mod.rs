//! SQLite connection factory and schema migration entry points.
//!
//! # Responsibility
//! - Own the pooled connection factory handed to repositories.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - A factory is only returned after migrations succeed.
//! - Connections are scoped: released back to the pool when the guard drops.

use crate::config::StoreLocation;
use log::info;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_factory, open_factory_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Scoped connection checked out from a [`ConnectionFactory`].
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Pool(r2d2::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Pool(err) => write!(f, "connection pool error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Pool(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<r2d2::Error> for DbError {
    fn from(value: r2d2::Error) -> Self {
        Self::Pool(value)
    }
}

/// Explicitly constructed store-session factory.
///
/// Cloning is cheap and shares the same pool. The process entry point owns
/// the lifecycle: build it with [`open_factory`], hand clones to
/// repositories, and call [`ConnectionFactory::shutdown`] after the last
/// operation.
#[derive(Clone)]
pub struct ConnectionFactory {
    pool: Pool<SqliteConnectionManager>,
    location: StoreLocation,
}

impl ConnectionFactory {
    pub(crate) fn new(pool: Pool<SqliteConnectionManager>, location: StoreLocation) -> Self {
        Self { pool, location }
    }

    /// Checks out one connection for the duration of a single operation.
    pub fn acquire(&self) -> Result<PooledConn, r2d2::Error> {
        self.pool.get()
    }

    /// Where this factory stores its data.
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Maximum number of connections the pool will open.
    pub fn max_connections(&self) -> u32 {
        self.pool.max_size()
    }

    /// Releases this handle. The pool closes once every clone is gone.
    pub fn shutdown(self) {
        let state = self.pool.state();
        info!(
            "event=db_close module=db status=ok mode={} connections={} idle={}",
            self.location.mode(),
            state.connections,
            state.idle_connections
        );
    }
}

impl std::fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("location", &self.location)
            .field("max_connections", &self.pool.max_size())
            .finish()
    }
}
