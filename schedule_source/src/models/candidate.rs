//! Canonical in-memory representation of an offered appointment slot.
//!
//! This struct is the standard output of every
//! [`ScheduleSource`](crate::providers::ScheduleSource) implementation.

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::location::LocationId;

/// Wire format of `startTimestamp` in the feed. No timezone is attached; the
/// value is the location's wall-clock time.
pub const FEED_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// A single slot reported by the remote source for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentCandidate {
    /// The location the slot belongs to.
    pub location_id: LocationId,
    /// Slot start, location wall-clock time.
    pub start_time: NaiveDateTime,
    /// Inactive slots are listed by the feed but cannot be booked.
    pub active: bool,
}

impl AppointmentCandidate {
    pub fn new(location_id: LocationId, start_time: NaiveDateTime, active: bool) -> Self {
        Self {
            location_id,
            start_time,
            active,
        }
    }

    /// Calendar date of the slot.
    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }
}
