//! set up migrations

use diesel::{Connection, SqliteConnection, connection::SimpleConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::store::{StoreError, StoreResult};

/// Embedded Diesel migrations bundled with this crate.
///
/// These are applied by `run_sqlite` to bring the database schema up to date.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending Diesel migrations on a SQLite database at the given URL,
/// creating the database file if it does not exist yet.
///
/// This sets the SQLite journal mode to WAL and applies all embedded migrations.
pub fn run_sqlite(url: &str) -> StoreResult<()> {
    let mut conn = SqliteConnection::establish(url).map_err(|source| StoreError::Connection {
        url: url.to_string(),
        source,
    })?;
    conn.batch_execute("PRAGMA journal_mode=WAL;")?;
    run_pending(&mut conn)
}

/// Applies pending migrations on an already open connection.
pub fn run_pending(conn: &mut SqliteConnection) -> StoreResult<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    if !applied.is_empty() {
        tracing::debug!(count = applied.len(), "applied database migrations");
    }
    Ok(())
}
