//! SQLite connection helpers.
//!
//! Provides [`connect_sqlite`] that opens a connection and applies the PRAGMAs every
//! polling task relies on: WAL journaling, foreign_keys=ON, and a 5000ms busy_timeout.
//! Each location task opens its own connection; WAL plus the busy timeout lets them
//! share one database file.
//!
//! Example:
//! ```no_run
//! use appointment_watch::db::connection::connect_sqlite;
//!
//! let path = std::env::temp_dir().join("appointment_watch_example.db");
//! let _conn = connect_sqlite(path.to_str().unwrap()).expect("open sqlite");
//! ```

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

use crate::store::{StoreError, StoreResult};

/// Open a SQLite connection and apply connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str) -> StoreResult<SqliteConnection> {
    let mut conn =
        SqliteConnection::establish(database_url).map_err(|source| StoreError::Connection {
            url: database_url.to_string(),
            source,
        })?;

    sql_query("PRAGMA journal_mode=WAL;").execute(&mut conn)?;
    sql_query("PRAGMA foreign_keys=ON;").execute(&mut conn)?;
    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    Ok(conn)
}
