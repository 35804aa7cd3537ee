//! Quota tracking core for gscd
//!
//! This crate contains:
//! - Unit counters accumulating active time per day or week
//! - The statistics ledger persisting counters per application
//! - Rule matching over the process list
//! - The session controller driving one cycle after another

mod controller;
mod counter;
mod enforcer;
mod matcher;
mod statistics;
mod strategy;

pub use controller::*;
pub use counter::*;
pub use enforcer::*;
pub use matcher::*;
pub use statistics::*;
pub use strategy::*;
