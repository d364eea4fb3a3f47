use chrono::NaiveDateTime;
use serde::Deserialize;
use snafu::ResultExt;

use crate::{
    models::{
        candidate::{AppointmentCandidate, FEED_TIMESTAMP_FORMAT},
        location::LocationId,
    },
    providers::{BodySnafu, SourceError},
};

/// One element of the `/slots` response. The feed carries more fields
/// (`endTimestamp`, `duration`, ...) which are ignored.
#[derive(Deserialize, Debug)]
pub struct TtpSlot {
    pub active: bool,
    #[serde(rename = "startTimestamp")]
    pub start_timestamp: String,
}

/// Decode a `/slots` body into candidates for `location_id`.
///
/// An empty body counts as an empty list. The body must otherwise be a JSON
/// array; individual entries that are missing fields or carry an unparseable
/// timestamp are skipped with a warning instead of failing the whole list.
pub fn parse_slots(
    location_id: LocationId,
    body: &str,
) -> Result<Vec<AppointmentCandidate>, SourceError> {
    if body.trim().is_empty() {
        return Ok(vec![]);
    }

    let entries: Vec<serde_json::Value> = serde_json::from_str(body).context(BodySnafu)?;

    let mut out = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let slot: TtpSlot = match serde_json::from_value(entry) {
            Ok(slot) => slot,
            Err(error) => {
                tracing::warn!(%location_id, index, %error, "skipping malformed slot entry");
                continue;
            }
        };

        match NaiveDateTime::parse_from_str(&slot.start_timestamp, FEED_TIMESTAMP_FORMAT) {
            Ok(start_time) => {
                out.push(AppointmentCandidate::new(location_id, start_time, slot.active))
            }
            Err(error) => {
                tracing::warn!(
                    %location_id,
                    index,
                    timestamp = %slot.start_timestamp,
                    %error,
                    "skipping slot with unparseable startTimestamp"
                );
            }
        }
    }

    Ok(out)
}
