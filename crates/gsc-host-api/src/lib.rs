//! Host adapter trait interfaces for gscd
//!
//! This crate defines the interface between the session controller and
//! platform-specific process discovery. It contains no platform code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
