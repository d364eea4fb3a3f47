//! Notification seam: where newly qualifying appointments are handed off.
//!
//! The polling engine only depends on [`NotificationSink`]. Rendering lives in
//! [`message`]; [`console::ConsoleSink`] is the sink the binary uses.

pub mod console;
pub mod message;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use schedule_source::models::location::LocationId;

/// New appointments of one cycle, grouped by calendar date. Dates ascend;
/// times within a date keep feed order.
pub type NewAppointments = BTreeMap<NaiveDate, Vec<NaiveDateTime>>;

/// Importance of a message. Messages below the configured level are not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotificationLevel {
    /// New appointments and other routine news.
    Info = 1,
    /// Only failures.
    Error = 2,
}

impl NotificationLevel {
    /// Maps the numeric config value (1 = info, 2 = error).
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NotificationLevel::Info),
            2 => Some(NotificationLevel::Error),
            _ => None,
        }
    }
}

/// Errors that can occur while delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Writing to the destination failed.
    #[error("failed to deliver notification: {0}")]
    Io(#[from] std::io::Error),
}

/// Consumer of per-location appointment news.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Announces the appointments claimed in one cycle for `location_id`.
    /// Never called with an empty map.
    async fn new_appointments(
        &self,
        location_id: LocationId,
        appointments: &NewAppointments,
    ) -> Result<(), NotifyError>;

    /// Sends a free-form message. `None` bypasses level filtering.
    async fn send_text(
        &self,
        body: &str,
        level: Option<NotificationLevel>,
    ) -> Result<(), NotifyError>;
}

/// Groups `times` by calendar date, keeping their relative order.
pub fn group_by_date(times: impl IntoIterator<Item = NaiveDateTime>) -> NewAppointments {
    let mut grouped = NewAppointments::new();
    for when in times {
        grouped.entry(when.date()).or_default().push(when);
    }
    grouped
}
