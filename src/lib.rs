//! Jenkins Lane - trigger, poll and classify Jenkins builds
//!
//! A client for the Jenkins REST API: triggers (parameterized) builds,
//! fetches job and build snapshots, and waits for a build to finish with
//! a bounded, cancellable polling loop.

pub mod config;
pub mod console;
pub mod host;
pub mod mock;
pub mod runner;
pub mod signal;
pub mod timeout;
pub mod wait;

pub use config::{ConfigError, LaneConfig};
pub use console::{Console, MenuCommand};
pub use host::{
    Credentials, HttpConfig, HttpTransport, MockTransport, OrchestrationClient,
    OrchestrationResult, Transport, TransportError,
};
pub use jenkins_protocol::{
    BuildParameters, BuildResult, BuildSelector, BuildStatus, JobInfo, JobList, JobReference,
};
pub use runner::{Browser, RunRequest, TestRunner};
pub use signal::{CancelSignal, SignalHandler};
pub use timeout::TimeoutConfig;
pub use wait::{CompletionWaiter, ManualClock, SystemClock, WaitOutcome, WaitReport, POLL_INTERVAL};
