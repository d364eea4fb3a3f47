//! Diesel models mapping to the database schema.
//!
//! These types mirror the table defined in the embedded migrations and in
//! [`crate::schema`]:
//! - [`crate::schema::seen_appointments`]: slots that have already been announced,
//!   unique per `(location_id, start_time)`.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::*;

/// A row in [`crate::schema::seen_appointments`].
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = seen_appointments, check_for_backend(diesel::sqlite::Sqlite))]
pub struct SeenAppointment {
    /// Database primary key (SQLite INTEGER PRIMARY KEY rowid). Populated by the DB.
    pub id: i32,
    /// Location the slot belongs to.
    pub location_id: i64,
    /// Slot start, location wall-clock time.
    pub start_time: NaiveDateTime,
}

/// Insertable form of [`SeenAppointment`].
#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = seen_appointments)]
pub struct NewSeenAppointment {
    /// Location the slot belongs to.
    pub location_id: i64,
    /// Slot start, location wall-clock time.
    pub start_time: NaiveDateTime,
}
