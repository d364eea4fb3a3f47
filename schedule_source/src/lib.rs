//! Remote appointment-slot sources.
//!
//! [`providers::ScheduleSource`] is the seam the polling engine consumes;
//! [`providers::ttp_rest::TtpRestSource`] is the HTTP implementation backed by
//! the Trusted Traveler scheduler API.

pub mod models;
pub mod providers;
