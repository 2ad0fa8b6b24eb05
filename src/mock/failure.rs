//! Failure Injection for Mock Server
//!
//! Supports configurable failure injection for testing error paths.

use std::collections::HashMap;

/// Route families the mock server distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Trigger,
    JobInfo,
    BuildStatus,
    ConsoleText,
    JobList,
}

/// Failure configuration for a route
#[derive(Debug, Clone, Default)]
pub struct FailureConfig {
    /// HTTP status to answer with instead of the normal response
    pub status: Option<u16>,
    /// Body to answer with (a 200 with a broken body exercises the decoder)
    pub body: Option<String>,
    /// Fail at the transport level with this message
    pub transport_error: Option<String>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Answer with an HTTP error status
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Answer 200 with an arbitrary body
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            status: Some(200),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Fail the exchange before any response is produced
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            transport_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Failure injector for the mock server
#[derive(Debug, Default)]
pub struct FailureInjector {
    /// Per-route failure configs
    configs: HashMap<Route, FailureConfig>,
    /// Call counts per route (for fail_count tracking)
    call_counts: HashMap<Route, u32>,
}

impl FailureInjector {
    /// Create a new failure injector
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a failure for a route
    pub fn set(&mut self, route: Route, config: FailureConfig) {
        self.configs.insert(route, config);
        self.call_counts.remove(&route);
    }

    /// Remove the failure for a route
    pub fn clear(&mut self, route: Route) {
        self.configs.remove(&route);
        self.call_counts.remove(&route);
    }

    /// Remove every configured failure
    pub fn clear_all(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Record a call and return the failure to apply, if any
    pub fn check(&mut self, route: Route) -> Option<FailureConfig> {
        let config = self.configs.get(&route)?.clone();

        let count = self.call_counts.entry(route).or_insert(0);
        *count += 1;

        match config.fail_count {
            Some(limit) if *count > limit => None,
            _ => Some(config),
        }
    }
}
