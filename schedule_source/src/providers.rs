//! Source abstraction for appointment-slot feeds.
//!
//! This module defines the [`ScheduleSource`] trait, the single interface the
//! polling engine uses to ask "what slots are offered at this location right
//! now?".
//!
//! Each concrete source (the Trusted Traveler REST API, a fixture in tests)
//! implements [`ScheduleSource`] and maps its own transport failures onto
//! [`SourceError`]. The trait is async and object safe, so callers hold a
//! `dyn ScheduleSource` chosen at runtime.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use schedule_source::models::{candidate::AppointmentCandidate, location::LocationId};
//! use schedule_source::providers::{ScheduleSource, SourceError};
//!
//! struct EmptySource;
//!
//! #[async_trait]
//! impl ScheduleSource for EmptySource {
//!     async fn fetch_slots(
//!         &self,
//!         _location_id: LocationId,
//!     ) -> Result<Vec<AppointmentCandidate>, SourceError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod ttp_rest;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{candidate::AppointmentCandidate, location::LocationId};

/// Trait for fetching the currently offered slots of one location.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Fetches every slot the source currently lists for `location_id`.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<AppointmentCandidate>)` - Slots in feed order, inactive ones included.
    ///   Entries the source could not understand are dropped (and logged).
    /// * `Err(SourceError)` - The fetch failed as a whole; see [`SourceError::is_fatal`].
    async fn fetch_slots(
        &self,
        location_id: LocationId,
    ) -> Result<Vec<AppointmentCandidate>, SourceError>;
}

/// Errors that can occur within a `ScheduleSource` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// Connection failure, timeout, or an interrupted body.
    #[snafu(display("API request failed: {source}"))]
    Transport {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The API refused the request (HTTP 4xx). Retrying will not help.
    #[snafu(display("API Returned HTTP {status}"))]
    Rejected { status: u16, backtrace: Backtrace },

    /// Any other non-success status (5xx, unexpected 3xx).
    #[snafu(display("API returned unexpected HTTP {status}"))]
    Status { status: u16, backtrace: Backtrace },

    /// The body was not a JSON array of slots.
    #[snafu(display("Malformed slot list: {source}"))]
    Body {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// Failed to build the HTTP client.
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

impl SourceError {
    /// True when monitoring of the location must stop rather than retry on
    /// the next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Rejected { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Rejected { status, .. } | SourceError::Status { status, .. } => {
                Some(*status)
            }
            SourceError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use snafu::ResultExt;

    use super::*;

    struct FixedSource(Vec<AppointmentCandidate>);
    struct RefusingSource;

    #[async_trait]
    impl ScheduleSource for FixedSource {
        async fn fetch_slots(
            &self,
            _location_id: LocationId,
        ) -> Result<Vec<AppointmentCandidate>, SourceError> {
            Ok(self.0.clone())
        }
    }

    #[async_trait]
    impl ScheduleSource for RefusingSource {
        async fn fetch_slots(
            &self,
            _location_id: LocationId,
        ) -> Result<Vec<AppointmentCandidate>, SourceError> {
            RejectedSnafu { status: 403u16 }.fail()
        }
    }

    fn pick(name: &str) -> Arc<dyn ScheduleSource> {
        let when = NaiveDate::from_ymd_opt(2030, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        if name == "fixed" {
            Arc::new(FixedSource(vec![AppointmentCandidate::new(
                LocationId(5140),
                when,
                true,
            )]))
        } else {
            Arc::new(RefusingSource)
        }
    }

    #[tokio::test]
    async fn dynamic_source_dispatch() {
        let slots = pick("fixed").fetch_slots(LocationId(5140)).await.unwrap();
        assert_eq!(slots.len(), 1);

        let err = pick("refusing")
            .fetch_slots(LocationId(5140))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.to_string(), "API Returned HTTP 403");
    }

    #[test]
    fn only_rejections_are_fatal() {
        let status = StatusSnafu { status: 503u16 }.build();
        assert!(!status.is_fatal());
        assert_eq!(status.status(), Some(503));

        let body = serde_json::from_str::<Vec<serde_json::Value>>("{")
            .context(BodySnafu)
            .unwrap_err();
        assert!(!body.is_fatal());
        assert_eq!(body.status(), None);
    }
}
