use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use schedule_source::models::location::LocationId;

use crate::{
    models::NewSeenAppointment,
    schema::seen_appointments::dsl as sa,
    store::{SeenStore, StoreResult},
};

/// Upper bound on bound parameters per DELETE; well under SQLite's limit.
const DELETE_CHUNK: usize = 500;

/// Seen-appointment store backed by the `seen_appointments` SQLite table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteSeenStore;

impl SqliteSeenStore {
    /// Creates the store. It is stateless; the connection is passed per call.
    pub fn new() -> Self {
        Self
    }
}

impl SeenStore for SqliteSeenStore {
    fn try_claim(
        &self,
        conn: &mut SqliteConnection,
        location_id: LocationId,
        start_time: NaiveDateTime,
    ) -> StoreResult<bool> {
        let row = NewSeenAppointment {
            location_id: location_id.0,
            start_time,
        };

        // INSERT .. ON CONFLICT (location_id, start_time) DO NOTHING
        let inserted = diesel::insert_into(sa::seen_appointments)
            .values(&row)
            .on_conflict((sa::location_id, sa::start_time))
            .do_nothing()
            .execute(conn)?;

        Ok(inserted == 1)
    }

    fn reconcile(
        &self,
        conn: &mut SqliteConnection,
        location_id: LocationId,
        active: &BTreeSet<NaiveDateTime>,
    ) -> StoreResult<usize> {
        let stored = self.seen_for_location(conn, location_id)?;
        let stale: Vec<NaiveDateTime> = stored
            .into_iter()
            .filter(|when| !active.contains(when))
            .collect();

        let mut removed = 0;
        for chunk in stale.chunks(DELETE_CHUNK) {
            removed += diesel::delete(
                sa::seen_appointments
                    .filter(sa::location_id.eq(location_id.0))
                    .filter(sa::start_time.eq_any(chunk.to_vec())),
            )
            .execute(conn)?;
        }

        if removed > 0 {
            tracing::info!(
                %location_id,
                count = removed,
                "Removed {removed} appointments that have been claimed for location {location_id}"
            );
        }
        Ok(removed)
    }

    fn seen_for_location(
        &self,
        conn: &mut SqliteConnection,
        location_id: LocationId,
    ) -> StoreResult<Vec<NaiveDateTime>> {
        let rows = sa::seen_appointments
            .filter(sa::location_id.eq(location_id.0))
            .select(sa::start_time)
            .order(sa::start_time.asc())
            .load::<NaiveDateTime>(conn)?;
        Ok(rows)
    }
}
