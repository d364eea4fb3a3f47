//! Console delivery: every message is printed with a timestamp prefix.

use std::{
    io::{self, Write},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::Local;
use indexmap::IndexMap;
use schedule_source::models::location::LocationId;

use crate::notify::{
    NewAppointments, NotificationLevel, NotificationSink, NotifyError,
    message::render_new_appointments,
};

/// Title carried by every notification.
pub const TITLE: &str = "Trusted Traveler Scheduler";

/// Writes notifications to a terminal (or any writer).
///
/// Messages below `min_level` are logged but not printed.
pub struct ConsoleSink {
    locations: IndexMap<LocationId, String>,
    min_level: NotificationLevel,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// A sink printing to stdout.
    pub fn stdout(locations: IndexMap<LocationId, String>, min_level: NotificationLevel) -> Self {
        Self::with_writer(locations, min_level, Box::new(io::stdout()))
    }

    /// A sink printing to `out`.
    pub fn with_writer(
        locations: IndexMap<LocationId, String>,
        min_level: NotificationLevel,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            locations,
            min_level,
            out: Mutex::new(out),
        }
    }

    /// Display name of a location, falling back to its id.
    pub fn location_name(&self, location_id: LocationId) -> String {
        self.locations
            .get(&location_id)
            .cloned()
            .unwrap_or_else(|| format!("location {location_id}"))
    }

    fn print(&self, body: &str) -> Result<(), NotifyError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("console writer lock poisoned"))?;
        writeln!(out, "{}: {body}", Local::now().format("%Y/%m/%d %H:%M:%S"))?;
        out.flush()?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn new_appointments(
        &self,
        location_id: LocationId,
        appointments: &NewAppointments,
    ) -> Result<(), NotifyError> {
        if appointments.is_empty() {
            return Ok(());
        }
        let body = render_new_appointments(&self.location_name(location_id), appointments);
        self.send_text(&body, Some(NotificationLevel::Info)).await
    }

    async fn send_text(
        &self,
        body: &str,
        level: Option<NotificationLevel>,
    ) -> Result<(), NotifyError> {
        if let Some(level) = level {
            if level < self.min_level {
                tracing::info!(?level, min_level = ?self.min_level, "{body}");
                return Ok(());
            }
        }

        self.print(body)?;
        tracing::debug!(title = TITLE, "notification delivered");
        Ok(())
    }
}
