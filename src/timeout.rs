//! Timeout configuration
//!
//! - `wait_minutes`: how long the completion waiter keeps polling
//! - `connect_timeout_seconds`: TCP connect bound for the HTTP transport
//!
//! Individual requests have no total timeout. Only the waiter's outer
//! loop bounds how long a wait can take.

use std::time::Duration;

/// Upper bound for `wait_minutes` (one day)
pub const MAX_WAIT_MINUTES: u64 = 1440;

/// Upper bound for `connect_timeout_seconds`
pub const MAX_CONNECT_TIMEOUT_SECONDS: u64 = 300;

/// Timeout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Maximum time to wait for a build to finish (default: 30)
    pub wait_minutes: u64,

    /// HTTP connection timeout (default: 30)
    pub connect_timeout_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            wait_minutes: 30,
            connect_timeout_seconds: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn validate(&self) -> Result<(), TimeoutValidationError> {
        if self.wait_minutes == 0 || self.wait_minutes > MAX_WAIT_MINUTES {
            return Err(TimeoutValidationError::WaitOutOfBounds {
                value: self.wait_minutes,
            });
        }

        if self.connect_timeout_seconds == 0
            || self.connect_timeout_seconds > MAX_CONNECT_TIMEOUT_SECONDS
        {
            return Err(TimeoutValidationError::ConnectOutOfBounds {
                value: self.connect_timeout_seconds,
            });
        }

        Ok(())
    }

    /// Create TimeoutConfig from effective config values
    pub fn from_config(wait_minutes: Option<u64>, connect: Option<u64>) -> Self {
        let defaults = Self::default();
        Self {
            wait_minutes: wait_minutes.unwrap_or(defaults.wait_minutes),
            connect_timeout_seconds: connect.unwrap_or(defaults.connect_timeout_seconds),
        }
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_minutes * 60)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Timeout validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutValidationError {
    #[error("wait timeout must be in (0, 1440] minutes, got {value}")]
    WaitOutOfBounds { value: u64 },

    #[error("connect_timeout_seconds must be in (0, 300], got {value}")]
    ConnectOutOfBounds { value: u64 },
}
