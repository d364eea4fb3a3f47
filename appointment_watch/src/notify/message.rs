//! Plain-text rendering of new-appointment notifications.

use std::fmt::Write;

use crate::notify::NewAppointments;

/// How many times are spelled out per date before summarising the rest.
pub const TIMES_PER_DATE: usize = 3;

/// Renders the notification body for one location.
///
/// ```text
/// New appointment(s) found for Blaine NEXUS
/// - Mon, June 03, 2030 [08:00 AM, 08:15 AM, 08:30 AM, and 2 more]
/// ```
pub fn render_new_appointments(location_name: &str, appointments: &NewAppointments) -> String {
    let mut out = format!("New appointment(s) found for {location_name}\n");

    for (date, times) in appointments {
        let mut listed = times
            .iter()
            .take(TIMES_PER_DATE)
            .map(|t| t.format("%I:%M %p").to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if times.len() > TIMES_PER_DATE {
            let _ = write!(listed, ", and {} more", times.len() - TIMES_PER_DATE);
        }

        let _ = writeln!(out, "- {} [{listed}]", date.format("%a, %B %d, %Y"));
    }

    out
}
