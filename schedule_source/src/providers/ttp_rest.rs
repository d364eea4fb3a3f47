//! Trusted Traveler Programs scheduler API (`/schedulerapi/slots`).

pub mod provider;
pub mod response;

pub use provider::{DEFAULT_URL_TEMPLATE, REQUEST_TIMEOUT, TtpRestSource};
