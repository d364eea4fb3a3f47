//! Small helpers shared by the workspace crates.

pub mod duration;
pub mod env;
