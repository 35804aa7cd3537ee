//! Linux host adapter for gscd
//!
//! Provides:
//! - Process enumeration from `/proc`
//! - Signal-capability probing with signal 0

mod adapter;
mod process;

pub use adapter::*;
pub use process::*;
