mod migrations;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use std::path::Path;

use crate::config::Config;

pub use migrations::ensure_schema;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Builds the connection pool without opening any connection, so an unreachable
/// database surfaces per request instead of aborting startup.
pub fn create_pool(config: &Config) -> DbPool {
    if let Some(parent) = Path::new(&config.sqlite_path).parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!(path = %parent.display(), error = %e, "Failed to create database directory");
        }
    }

    let busy_timeout_ms = config.db_connect_timeout.as_millis();
    let manager = SqliteConnectionManager::file(&config.sqlite_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = {busy_timeout_ms};"
            ))
        });

    Pool::builder()
        .max_size(config.db_pool_size)
        .connection_timeout(config.db_connect_timeout)
        .build_unchecked(manager)
}

/// Single-connection in-memory pool; every checkout sees the same database.
#[cfg(test)]
pub fn memory_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    let pool = Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .build(manager)
        .expect("in-memory pool");
    ensure_schema(&pool);
    pool
}

/// Pool whose database can never be opened; every checkout times out quickly.
#[cfg(test)]
pub fn unreachable_pool() -> DbPool {
    let manager = SqliteConnectionManager::file("/nonexistent-dir/sub/invoicing.db")
        .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE);

    Pool::builder()
        .max_size(1)
        .connection_timeout(std::time::Duration::from_millis(200))
        .build_unchecked(manager)
}
