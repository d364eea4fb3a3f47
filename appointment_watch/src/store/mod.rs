//! Seen-appointment store: which slots have already been announced.
//!
//! The store holds `(location_id, start_time)` pairs with a uniqueness
//! constraint. It supports exactly two mutations:
//! - **claim**: insert a pair if absent, telling the caller whether it is new;
//! - **reconcile**: delete every pair of a location whose slot is no longer
//!   offered.
//!
//! [`SeenStore::apply_cycle`] runs a cycle's claims and its reconcile inside
//! one `BEGIN IMMEDIATE` transaction, so a cycle is either recorded fully or
//! not at all. Location tasks write disjoint `location_id` partitions of the
//! same file through separate connections.

mod repo;

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use diesel::SqliteConnection;
use schedule_source::models::location::LocationId;

pub use repo::SqliteSeenStore;

/// Errors raised by the persistence layer. All of them are fatal to the
/// polling task that hit them.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The database could not be opened.
    #[error("failed to open database {url}: {source}")]
    Connection {
        /// URL or path that was opened.
        url: String,
        /// Underlying connection error.
        source: diesel::ConnectionError,
    },

    /// A query or transaction failed.
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Embedded migrations could not be applied.
    #[error("migration failed: {0}")]
    Migration(String),

    /// A task panicked while holding the connection.
    #[error("database connection lock poisoned")]
    Poisoned,
}

/// Result type used throughout the store for fallible operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// What one cycle changed in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleChanges {
    /// Newly claimed slots, in the order they were offered for claiming.
    pub claimed: Vec<NaiveDateTime>,
    /// Number of rows pruned by reconcile.
    pub removed: usize,
}

/// Portable surface, SQLite implementation lives in `repo.rs`.
pub trait SeenStore {
    /// Inserts `(location_id, start_time)` if absent.
    ///
    /// Returns `true` when the row was inserted (the slot is new) and `false`
    /// when it was already present.
    fn try_claim(
        &self,
        conn: &mut SqliteConnection,
        location_id: LocationId,
        start_time: NaiveDateTime,
    ) -> StoreResult<bool>;

    /// Deletes every row of `location_id` whose `start_time` is not in `active`
    /// and returns how many rows were removed. An empty `active` set clears the
    /// location.
    fn reconcile(
        &self,
        conn: &mut SqliteConnection,
        location_id: LocationId,
        active: &BTreeSet<NaiveDateTime>,
    ) -> StoreResult<usize>;

    /// Stored slot times of `location_id`, ascending.
    fn seen_for_location(
        &self,
        conn: &mut SqliteConnection,
        location_id: LocationId,
    ) -> StoreResult<Vec<NaiveDateTime>>;

    /// Claims each of `accepted` in order, then reconciles against `active`,
    /// all inside a single immediate transaction.
    fn apply_cycle(
        &self,
        conn: &mut SqliteConnection,
        location_id: LocationId,
        accepted: &[NaiveDateTime],
        active: &BTreeSet<NaiveDateTime>,
    ) -> StoreResult<CycleChanges> {
        conn.immediate_transaction::<_, StoreError, _>(|conn| {
            let mut claimed = Vec::new();
            for &when in accepted {
                if self.try_claim(conn, location_id, when)? {
                    claimed.push(when);
                }
            }

            let removed = self.reconcile(conn, location_id, active)?;
            Ok(CycleChanges { claimed, removed })
        })
    }
}
