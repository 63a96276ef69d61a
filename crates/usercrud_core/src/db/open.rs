//! Connection factory bootstrap for SQLite.
//!
//! # Responsibility
//! - Build file or in-memory connection pools.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable factory.
//!
//! # Invariants
//! - Every pooled connection has `foreign_keys=ON` and a busy timeout.
//! - Returned factories have migrations fully applied.
//! - In-memory pools never recycle their only connection.

use super::migrations::apply_migrations;
use super::{ConnectionFactory, DbResult};
use crate::config::{StoreConfig, StoreLocation};
use log::{error, info};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Builds a connection factory for `config` and applies pending migrations.
///
/// # Side effects
/// - Opens up to `config.effective_pool_size()` connections.
/// - Emits `db_open` logging events with duration and status.
pub fn open_factory(config: &StoreConfig) -> DbResult<ConnectionFactory> {
    let started_at = Instant::now();
    let mode = config.location.mode();
    info!("event=db_open module=db status=start mode={mode}");

    match build_factory(config) {
        Ok(factory) => {
            info!(
                "event=db_open module=db status=ok mode={} pool_size={} duration_ms={}",
                mode,
                factory.max_connections(),
                started_at.elapsed().as_millis()
            );
            Ok(factory)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Builds a private in-memory factory with all migrations applied.
pub fn open_factory_in_memory() -> DbResult<ConnectionFactory> {
    open_factory(&StoreConfig::in_memory())
}

fn build_factory(config: &StoreConfig) -> DbResult<ConnectionFactory> {
    let busy_timeout = config.busy_timeout;
    let manager = match &config.location {
        StoreLocation::File(path) => SqliteConnectionManager::file(path),
        StoreLocation::Memory => SqliteConnectionManager::memory(),
    }
    .with_init(move |conn| configure_connection(conn, busy_timeout));

    let mut builder = Pool::builder()
        .max_size(config.effective_pool_size())
        .connection_timeout(config.connection_timeout);
    if config.location == StoreLocation::Memory {
        builder = builder.idle_timeout(None).max_lifetime(None);
    }
    let pool = builder.build(manager)?;

    {
        let mut conn = pool.get()?;
        apply_migrations(&mut conn)?;
    }

    Ok(ConnectionFactory::new(pool, config.location.clone()))
}

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}
