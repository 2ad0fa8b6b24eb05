//! Completion waiter
//!
//! Polls the most recent build of a job at a fixed interval until it
//! stops building, the status becomes unavailable, the wait is
//! interrupted, or the timeout elapses.
//!
//! The target is whatever the server reports as the last build at each
//! poll. Builds triggered concurrently by someone else can be observed
//! instead of the one this process triggered.

pub mod clock;

use std::sync::Arc;
use std::time::Duration;

use jenkins_protocol::{BuildResult, BuildSelector, BuildStatus, JobReference};
use tracing::{info, warn};

use crate::host::{OrchestrationClient, OrchestrationResult};
use crate::signal::CancelSignal;

pub use clock::{Clock, Interrupted, ManualClock, SystemClock};

/// Delay between status polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How a finished build is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Succeeded,
    Failed,
    /// Finished with a result other than SUCCESS/FAILURE/ABORTED, or none
    Unexpected,
}

/// Classify a build snapshot; `None` while it is still building
///
/// A building snapshot is never classified, whatever its result says.
pub fn classify(status: &BuildStatus) -> Option<Classification> {
    if status.building {
        return None;
    }
    Some(match status.result {
        Some(BuildResult::Success) => Classification::Succeeded,
        Some(BuildResult::Failure) | Some(BuildResult::Aborted) => Classification::Failed,
        _ => Classification::Unexpected,
    })
}

/// Terminal state of a wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Succeeded(BuildStatus),
    Failed(BuildStatus),
    Unexpected(BuildStatus),
    TimedOut,
    StatusUnavailable,
    Interrupted,
}

impl WaitOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            WaitOutcome::Succeeded(_) => "SUCCEEDED",
            WaitOutcome::Failed(_) | WaitOutcome::Unexpected(_) => "FAILED",
            WaitOutcome::TimedOut => "TIMED_OUT",
            WaitOutcome::StatusUnavailable => "STATUS_UNAVAILABLE",
            WaitOutcome::Interrupted => "INTERRUPTED",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WaitOutcome::Succeeded(_))
    }

    /// The last snapshot seen, for outcomes that carry one
    pub fn build(&self) -> Option<&BuildStatus> {
        match self {
            WaitOutcome::Succeeded(b) | WaitOutcome::Failed(b) | WaitOutcome::Unexpected(b) => {
                Some(b)
            }
            _ => None,
        }
    }
}

/// Outcome of a wait plus how long it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitReport {
    pub outcome: WaitOutcome,
    /// Status fetches performed
    pub polls: u32,
    pub elapsed: Duration,
}

impl WaitReport {
    pub fn into_result(self) -> OrchestrationResult {
        match self.outcome {
            WaitOutcome::Succeeded(build) => {
                OrchestrationResult::succeeded("Job completed successfully").with_build(build)
            }
            WaitOutcome::Failed(build) => OrchestrationResult::failed(format!(
                "Job failed with status: {}",
                build.result_str()
            ))
            .with_build(build),
            WaitOutcome::Unexpected(build) => OrchestrationResult::failed(format!(
                "Job completed with status: {}",
                build.result_str()
            ))
            .with_build(build),
            WaitOutcome::TimedOut => {
                OrchestrationResult::failed("Job did not complete within timeout period")
            }
            WaitOutcome::StatusUnavailable => {
                OrchestrationResult::failed("Failed to get job status")
            }
            WaitOutcome::Interrupted => OrchestrationResult::failed("Wait interrupted"),
        }
    }
}

/// Blocks the calling thread polling a job until it completes
///
/// Run it on a dedicated thread if the caller must stay responsive.
pub struct CompletionWaiter<'a> {
    client: &'a OrchestrationClient,
    clock: Arc<dyn Clock>,
    cancel: Arc<CancelSignal>,
}

impl<'a> CompletionWaiter<'a> {
    /// Create a waiter on the system clock
    pub fn new(client: &'a OrchestrationClient, cancel: Arc<CancelSignal>) -> Self {
        Self {
            client,
            clock: Arc::new(SystemClock),
            cancel,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Poll `job` until a terminal state or `timeout`
    ///
    /// A poll is only started while less than `timeout` has elapsed, so
    /// the wait returns `TimedOut` no later than one poll interval (plus
    /// the last request's latency) after the deadline.
    pub fn wait(&self, job: &JobReference, timeout: Duration) -> WaitReport {
        let _guard = self.client.span().enter();

        let start = self.clock.now();
        let mut polls = 0u32;

        let outcome = loop {
            let elapsed = self.clock.now().duration_since(start);
            if elapsed >= timeout {
                warn!(
                    job = %job,
                    elapsed_secs = elapsed.as_secs(),
                    "Job did not complete within timeout period"
                );
                break WaitOutcome::TimedOut;
            }
            if self.cancel.is_cancelled() {
                break WaitOutcome::Interrupted;
            }

            polls += 1;
            let Some(status) = self.client.fetch_build_status(job, BuildSelector::Last) else {
                break WaitOutcome::StatusUnavailable;
            };

            match classify(&status) {
                None => {
                    info!(
                        job = %job,
                        build = status.number,
                        elapsed_secs = elapsed.as_secs(),
                        "Job still building, waiting... ({}s elapsed)",
                        elapsed.as_secs()
                    );
                    if self.clock.sleep(POLL_INTERVAL, &self.cancel).is_err() {
                        warn!(job = %job, "Wait interrupted");
                        break WaitOutcome::Interrupted;
                    }
                }
                Some(Classification::Succeeded) => {
                    info!(job = %job, build = status.number, "Job completed successfully");
                    break WaitOutcome::Succeeded(status);
                }
                Some(Classification::Failed) => {
                    warn!(
                        job = %job,
                        build = status.number,
                        result = %status.result_str(),
                        "Job failed"
                    );
                    break WaitOutcome::Failed(status);
                }
                Some(Classification::Unexpected) => {
                    warn!(
                        job = %job,
                        build = status.number,
                        result = %status.result_str(),
                        "Job completed with unexpected status"
                    );
                    break WaitOutcome::Unexpected(status);
                }
            }
        };

        WaitReport {
            outcome,
            polls,
            elapsed: self.clock.now().duration_since(start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Credentials, MockTransport};
    use crate::mock::{BuildScript, FailureConfig, MockServer, Route};

    fn client_for(server: &MockServer) -> OrchestrationClient {
        let transport = Box::new(MockTransport::with_server(server.clone()));
        OrchestrationClient::new(server.base_url(), Credentials::new("admin", "token"), transport)
    }

    fn snapshot(building: bool, result: Option<&str>) -> BuildStatus {
        BuildStatus {
            number: 1,
            result: result.map(BuildResult::from),
            building,
            duration: 0,
            timestamp: 0,
            url: "http://mock.jenkins/job/a/1/".to_string(),
        }
    }

    fn job(name: &str) -> JobReference {
        JobReference::new(name).unwrap()
    }

    #[test]
    fn test_classify_is_total() {
        assert_eq!(classify(&snapshot(false, Some("SUCCESS"))), Some(Classification::Succeeded));
        assert_eq!(classify(&snapshot(false, Some("FAILURE"))), Some(Classification::Failed));
        assert_eq!(classify(&snapshot(false, Some("ABORTED"))), Some(Classification::Failed));
        assert_eq!(classify(&snapshot(false, Some("UNSTABLE"))), Some(Classification::Unexpected));
        assert_eq!(classify(&snapshot(false, Some("NOT_BUILT"))), Some(Classification::Unexpected));
        assert_eq!(classify(&snapshot(false, Some("weird"))), Some(Classification::Unexpected));
        assert_eq!(classify(&snapshot(false, None)), Some(Classification::Unexpected));
    }

    #[test]
    fn test_building_is_never_classified() {
        for result in [None, Some("SUCCESS"), Some("FAILURE"), Some("ABORTED"), Some("x")] {
            assert_eq!(classify(&snapshot(true, result)), None);
        }
    }

    #[test]
    fn test_report_messages() {
        let report = |outcome| WaitReport {
            outcome,
            polls: 1,
            elapsed: Duration::ZERO,
        };

        let ok = report(WaitOutcome::Succeeded(snapshot(false, Some("SUCCESS")))).into_result();
        assert!(ok.success);
        assert_eq!(ok.message, "Job completed successfully");
        assert!(ok.build.is_some());

        let failed = report(WaitOutcome::Failed(snapshot(false, Some("ABORTED")))).into_result();
        assert!(!failed.success);
        assert_eq!(failed.message, "Job failed with status: ABORTED");

        let odd = report(WaitOutcome::Unexpected(snapshot(false, None))).into_result();
        assert!(!odd.success);
        assert_eq!(odd.message, "Job completed with status: N/A");

        let timed_out = report(WaitOutcome::TimedOut).into_result();
        assert_eq!(timed_out.message, "Job did not complete within timeout period");
        assert!(timed_out.build.is_none());

        assert_eq!(
            report(WaitOutcome::StatusUnavailable).into_result().message,
            "Failed to get job status"
        );
        assert_eq!(report(WaitOutcome::Interrupted).into_result().message, "Wait interrupted");
    }

    #[test]
    fn test_wait_succeeds_after_building_polls() {
        let server = MockServer::new();
        server.add_job("deploy");
        server.add_running_build("deploy", BuildScript::finishes_after(2, "SUCCESS"));

        let client = client_for(&server);
        let clock = Arc::new(ManualClock::new());
        let waiter = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
            .with_clock(clock.clone());

        let report = waiter.wait(&job("deploy"), Duration::from_secs(600));

        assert!(report.outcome.is_success());
        assert_eq!(report.polls, 3);
        assert_eq!(report.elapsed, Duration::from_secs(20));
        assert_eq!(clock.sleeps(), vec![POLL_INTERVAL; 2]);
    }

    #[test]
    fn test_wait_failed_build() {
        let server = MockServer::new();
        server.add_job("deploy");
        server.add_finished_build("deploy", "FAILURE", "boom\n");

        let client = client_for(&server);
        let waiter = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
            .with_clock(Arc::new(ManualClock::new()));

        let report = waiter.wait(&job("deploy"), Duration::from_secs(60));

        assert_eq!(report.outcome.name(), "FAILED");
        assert_eq!(report.polls, 1);
        assert_eq!(report.elapsed, Duration::ZERO);
    }

    #[test]
    fn test_wait_result_absent_is_unexpected() {
        let server = MockServer::new();
        server.add_job("deploy");
        server.add_running_build("deploy", BuildScript::finishes_without_result(0));

        let client = client_for(&server);
        let waiter = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
            .with_clock(Arc::new(ManualClock::new()));

        let report = waiter.wait(&job("deploy"), Duration::from_secs(60));
        assert!(matches!(report.outcome, WaitOutcome::Unexpected(_)));
        assert!(!report.into_result().success);
    }

    #[test]
    fn test_wait_status_unavailable() {
        let server = MockServer::new();
        server.add_job("deploy");
        server.add_running_build("deploy", BuildScript::never_finishes());
        server.inject(Route::BuildStatus, FailureConfig::status(500));

        let client = client_for(&server);
        let waiter = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
            .with_clock(Arc::new(ManualClock::new()));

        let report = waiter.wait(&job("deploy"), Duration::from_secs(60));
        assert_eq!(report.outcome, WaitOutcome::StatusUnavailable);
        assert_eq!(report.polls, 1);
    }

    #[test]
    fn test_wait_job_without_builds_is_unavailable() {
        let server = MockServer::new();
        server.add_job("fresh");

        let client = client_for(&server);
        let waiter = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
            .with_clock(Arc::new(ManualClock::new()));

        let report = waiter.wait(&job("fresh"), Duration::from_secs(60));
        assert_eq!(report.outcome, WaitOutcome::StatusUnavailable);
    }

    #[test]
    fn test_wait_times_out_at_deadline() {
        let server = MockServer::new();
        server.add_job("deploy");
        server.add_running_build("deploy", BuildScript::never_finishes());

        let client = client_for(&server);
        let waiter = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
            .with_clock(Arc::new(ManualClock::new()));

        let report = waiter.wait(&job("deploy"), Duration::from_secs(60));
        assert_eq!(report.outcome, WaitOutcome::TimedOut);
        assert_eq!(report.polls, 6);
        assert_eq!(report.elapsed, Duration::from_secs(60));
    }

    #[test]
    fn test_wait_already_cancelled() {
        let server = MockServer::new();
        server.add_job("deploy");
        server.add_running_build("deploy", BuildScript::never_finishes());

        let cancel = Arc::new(CancelSignal::new());
        cancel.cancel();

        let client = client_for(&server);
        let waiter = CompletionWaiter::new(&client, Arc::clone(&cancel))
            .with_clock(Arc::new(ManualClock::new()));

        let report = waiter.wait(&job("deploy"), Duration::from_secs(60));
        assert_eq!(report.outcome, WaitOutcome::Interrupted);
        assert_eq!(report.polls, 0);
        assert!(cancel.is_cancelled());
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_wait_logs_inside_client_span() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let server = MockServer::new();
            server.add_job("deploy");
            server.add_running_build("deploy", BuildScript::finishes_after(1, "SUCCESS"));

            let client =
                client_for(&server).with_span(tracing::info_span!("nightly", lane = 3));
            let report = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
                .with_clock(Arc::new(ManualClock::new()))
                .wait(&job("deploy"), Duration::from_secs(600));
            assert!(report.outcome.is_success());
        });

        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = logs.lines().collect();
        assert!(lines.iter().any(|l| l.contains("Job still building")));
        assert!(lines.iter().any(|l| l.contains("Job completed successfully")));
        assert!(lines.iter().all(|l| l.contains("nightly{lane=3}")));
    }
}
