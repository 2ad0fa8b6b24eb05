//! Signal handling for interrupting a wait (SIGINT/SIGTERM)
//!
//! On the first SIGINT or SIGTERM the shared [`CancelSignal`] is set, which
//! wakes a waiter sleeping between polls. A second signal exits at once
//! with [`EXIT_CODE_INTERRUPTED`].

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tracing::warn;

/// Exit code used when a second signal forces an immediate exit
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Cooperative cancellation flag that sleepers can block on
///
/// Once set it stays set. Nothing in this crate clears it, so the
/// caller can still observe the cancellation after a wait returns.
#[derive(Debug, Default)]
pub struct CancelSignal {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every sleeper
    pub fn cancel(&self) {
        let mut cancelled = match self.cancelled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cancelled = true;
        self.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        match self.cancelled.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Block for up to `timeout`, returning early once cancelled
    ///
    /// Returns true if the signal is set when the call returns.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = match self.cancelled.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (guard, _) = match self
            .condvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
        {
            Ok(result) => result,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard
    }
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: interrupt the current wait
    Cancel,
    /// Second signal: exit immediately
    ImmediateExit,
    /// Third+ signal: ignore (exit is already under way)
    Ignore,
}

/// Signal handler that drives a shared [`CancelSignal`]
pub struct SignalHandler {
    cancel: Arc<CancelSignal>,
    signal_count: AtomicU8,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self::with_signal(Arc::new(CancelSignal::new()))
    }

    pub fn with_signal(cancel: Arc<CancelSignal>) -> Self {
        Self {
            cancel,
            signal_count: AtomicU8::new(0),
        }
    }

    /// Get the cancel signal shared with waiters
    pub fn signal(&self) -> Arc<CancelSignal> {
        Arc::clone(&self.cancel)
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Record one received signal and return what to do about it
    pub fn handle_signal(&self) -> SignalAction {
        match self.signal_count.fetch_add(1, Ordering::SeqCst) {
            0 => {
                self.cancel.cancel();
                SignalAction::Cancel
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }

    /// Install the process-wide SIGINT/SIGTERM handler
    ///
    /// Must be called at most once per process.
    pub fn install(self: &Arc<Self>) -> Result<(), ctrlc::Error> {
        let handler = Arc::clone(self);
        ctrlc::set_handler(move || match handler.handle_signal() {
            SignalAction::Cancel => {
                warn!("Received interrupt signal, stopping wait");
            }
            SignalAction::ImmediateExit => {
                eprintln!("\nReceived second interrupt, exiting immediately...");
                std::process::exit(EXIT_CODE_INTERRUPTED);
            }
            SignalAction::Ignore => {}
        })
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_cancel_signal_initial() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn test_wait_timeout_expires_when_not_cancelled() {
        let signal = CancelSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_timeout_returns_immediately_when_already_cancelled() {
        let signal = CancelSignal::new();
        signal.cancel();

        let start = Instant::now();
        assert!(signal.wait_timeout(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_wakes_sleeper() {
        let signal = Arc::new(CancelSignal::new());
        let sleeper = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                let start = Instant::now();
                let cancelled = signal.wait_timeout(Duration::from_secs(30));
                (cancelled, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(50));
        signal.cancel();

        let (cancelled, elapsed) = sleeper.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_signal_stays_set() {
        let signal = CancelSignal::new();
        signal.cancel();
        assert!(signal.wait_timeout(Duration::from_millis(1)));
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_first_signal_cancels() {
        let handler = SignalHandler::new();
        let signal = handler.signal();

        assert_eq!(handler.handle_signal(), SignalAction::Cancel);
        assert!(signal.is_cancelled());
        assert_eq!(handler.signal_count(), 1);
    }

    #[test]
    fn test_second_signal_requests_immediate_exit() {
        let handler = SignalHandler::new();

        handler.handle_signal();
        assert_eq!(handler.handle_signal(), SignalAction::ImmediateExit);
        assert_eq!(handler.handle_signal(), SignalAction::Ignore);
        assert_eq!(handler.signal_count(), 3);
    }

    #[test]
    fn test_handler_shares_external_signal() {
        let shared = Arc::new(CancelSignal::new());
        let handler = SignalHandler::with_signal(Arc::clone(&shared));

        handler.handle_signal();
        assert!(shared.is_cancelled());
    }
}
