//! Cycle scheduling

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

/// Decides when the next cycle runs, and whether there is one
#[async_trait]
pub trait RunningStrategy: Send {
    /// Wait for the next cycle. `false` ends the loop.
    async fn next_cycle(&mut self) -> bool;
}

/// One cycle per period until shutdown is requested
///
/// The first cycle starts immediately. Ticks missed while a cycle was
/// running are skipped. Dropping the shutdown sender also stops the loop.
pub struct FixedInterval {
    interval: Interval,
    shutdown: watch::Receiver<bool>,
}

impl FixedInterval {
    pub fn new(period: Duration, shutdown: watch::Receiver<bool>) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval, shutdown }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl RunningStrategy for FixedInterval {
    async fn next_cycle(&mut self) -> bool {
        loop {
            if *self.shutdown.borrow_and_update() {
                return false;
            }

            tokio::select! {
                _ = self.interval.tick() => return !*self.shutdown.borrow(),
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}

/// A fixed number of back-to-back cycles
#[derive(Debug, Clone, Copy)]
pub struct Repeat(pub usize);

#[async_trait]
impl RunningStrategy for Repeat {
    async fn next_cycle(&mut self) -> bool {
        if self.0 == 0 {
            return false;
        }
        self.0 -= 1;
        true
    }
}
