//! Shared utilities for gscd
//!
//! This crate provides:
//! - Calendar units (Day, Week) and their boundary policy
//! - Time utilities (wall-clock `now()` with mock time, duration helpers)
//! - Error types
//! - Default paths for configuration and counter files

mod error;
mod paths;
mod time;
mod unit;

pub use error::*;
pub use paths::*;
pub use time::*;
pub use unit::*;
