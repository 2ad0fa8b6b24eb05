//! Time source for the completion waiter
//!
//! [`SystemClock`] sleeps for real and wakes as soon as the cancel signal
//! is set. [`ManualClock`] only moves when slept on, so polling loops run
//! instantly in tests.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::signal::CancelSignal;

/// A sleep ended early because the cancel signal was set
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("wait interrupted")]
pub struct Interrupted;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Sleep for `duration` unless `cancel` is set first
    fn sleep(&self, duration: Duration, cancel: &CancelSignal) -> Result<(), Interrupted>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelSignal) -> Result<(), Interrupted> {
        if cancel.wait_timeout(duration) {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Simulated time that advances only on `sleep` or `advance`
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move simulated time forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }

    /// Simulated time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|o| *o).unwrap_or_default()
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelSignal) -> Result<(), Interrupted> {
        if cancel.is_cancelled() {
            return Err(Interrupted);
        }
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
        Ok(())
    }
}
