//! Appointment availability watcher.
//!
//! Polls the Trusted Traveler scheduler for each configured location, keeps
//! the slots that fit the [`policy`] window, and announces each slot once,
//! using a SQLite table of already-seen slots ([`store`]) that is pruned as
//! slots disappear from the feed. [`engine`] ties the pieces together per
//! location; [`notify`] delivers the results.

#![deny(missing_docs)]

pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod notify;
pub mod policy;
#[allow(missing_docs)]
pub mod schema;
pub mod store;
