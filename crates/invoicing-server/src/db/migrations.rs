use rusqlite::Connection;

use super::DbPool;
use crate::error::AppResult;

const SCHEMA: &str = include_str!("schema.sql");

/// Creates the `users` and `invoices` tables when missing. Failures are logged
/// and swallowed: the server still starts and each request reports its own
/// store error.
pub fn ensure_schema(pool: &DbPool) {
    match apply(pool) {
        Ok(()) => tracing::info!("Tables 'users' and 'invoices' are ready"),
        Err(e) => tracing::error!(error = %e, "Failed to create tables"),
    }
}

fn apply(pool: &DbPool) -> AppResult<()> {
    let conn = pool.get()?;
    run(&conn)?;
    Ok(())
}

fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
