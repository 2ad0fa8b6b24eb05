//! End-to-end trigger and wait scenarios
//!
//! Drives OrchestrationClient through MockTransport with simulated time.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use jenkins_lane::host::{Credentials, MockTransport};
use jenkins_lane::mock::{BuildScript, FailureConfig, MockServer, Route};
use jenkins_lane::wait::{Clock, CompletionWaiter, ManualClock, WaitOutcome, POLL_INTERVAL};
use jenkins_lane::{CancelSignal, JobReference, OrchestrationClient};

fn client_for(server: &MockServer) -> OrchestrationClient {
    let transport = Box::new(MockTransport::with_server(server.clone()));
    OrchestrationClient::new(server.base_url(), Credentials::new("admin", "token"), transport)
}

fn job(name: &str) -> JobReference {
    JobReference::new(name).unwrap()
}

// =============================================================================
// Scenario A: accepted trigger, three building polls, then SUCCESS
// =============================================================================

#[test]
fn test_trigger_then_wait_succeeds_on_fourth_poll() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.script_next_build("selenium-tests", BuildScript::finishes_after(3, "SUCCESS"));

    let client = client_for(&server);
    let triggered = client.trigger_build(&job("selenium-tests"), None);
    assert!(triggered.success);

    let clock = Arc::new(ManualClock::new());
    let report = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
        .with_clock(clock.clone())
        .wait(&job("selenium-tests"), Duration::from_secs(30 * 60));

    assert!(matches!(report.outcome, WaitOutcome::Succeeded(ref b) if b.number == 1));
    assert_eq!(report.polls, 4);
    assert_eq!(server.count(Route::BuildStatus), 4);
    assert_eq!(report.elapsed, Duration::from_secs(30));
    assert_eq!(clock.sleeps(), vec![POLL_INTERVAL; 3]);

    let result = report.into_result();
    assert!(result.success);
    assert_eq!(result.message, "Job completed successfully");
}

// =============================================================================
// Scenario B: trigger rejected with 500
// =============================================================================

#[test]
fn test_rejected_trigger_is_a_failed_result() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.inject(Route::Trigger, FailureConfig::status(500));

    let client = client_for(&server);
    let triggered = client.trigger_build(&job("selenium-tests"), None);

    assert!(!triggered.success);
    assert!(triggered.message.contains("Status code: 500"));
    assert_eq!(server.build_count("selenium-tests"), 0);

    // A correct caller stops here; the runner does exactly that
    let runner = jenkins_lane::TestRunner::new(&client, Arc::new(CancelSignal::new()))
        .with_clock(Arc::new(ManualClock::new()));
    let result = runner.run(&jenkins_lane::RunRequest::new(job("selenium-tests")));
    assert!(!result.success);
    assert_eq!(server.count(Route::BuildStatus), 0);
}

// =============================================================================
// Scenario C: never finishes within the window
// =============================================================================

#[test]
fn test_times_out_exactly_at_deadline() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.add_running_build("selenium-tests", BuildScript::never_finishes());

    let client = client_for(&server);
    let report = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
        .with_clock(Arc::new(ManualClock::new()))
        .wait(&job("selenium-tests"), Duration::from_secs(5 * 60));

    assert_eq!(report.outcome, WaitOutcome::TimedOut);
    assert_eq!(report.elapsed, Duration::from_secs(300));
    assert_eq!(report.polls, 30);
    assert_eq!(
        report.into_result().message,
        "Job did not complete within timeout period"
    );
}

#[test]
fn test_timeout_bounded_by_one_interval() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.add_running_build("selenium-tests", BuildScript::never_finishes());
    let client = client_for(&server);

    for secs in 1..=95 {
        let timeout = Duration::from_secs(secs);
        let report = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
            .with_clock(Arc::new(ManualClock::new()))
            .wait(&job("selenium-tests"), timeout);

        assert_eq!(report.outcome, WaitOutcome::TimedOut, "timeout {}s", secs);
        assert!(report.elapsed >= timeout, "returned early for {}s", secs);
        assert!(report.elapsed <= timeout + POLL_INTERVAL, "overran for {}s", secs);
    }
}

#[test]
fn test_finishing_after_deadline_still_times_out() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.add_running_build("selenium-tests", BuildScript::finishes_after(6, "SUCCESS"));

    let client = client_for(&server);
    let report = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
        .with_clock(Arc::new(ManualClock::new()))
        .wait(&job("selenium-tests"), Duration::from_secs(60));

    assert_eq!(report.outcome, WaitOutcome::TimedOut);
    assert_eq!(report.polls, 6);
}

// =============================================================================
// Status unavailable mid-wait
// =============================================================================

#[test]
fn test_status_failure_mid_wait_is_terminal() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.add_running_build("selenium-tests", BuildScript::never_finishes());

    server.inject(
        Route::BuildStatus,
        FailureConfig::transport("connection reset").with_fail_count(1),
    );

    let client = client_for(&server);
    let report = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
        .with_clock(Arc::new(ManualClock::new()))
        .wait(&job("selenium-tests"), Duration::from_secs(600));

    // No retry, even though the next poll would have succeeded
    assert_eq!(report.outcome, WaitOutcome::StatusUnavailable);
    assert_eq!(report.polls, 1);
    assert_eq!(report.into_result().message, "Failed to get job status");
}

// =============================================================================
// Interruption
// =============================================================================

#[test]
fn test_cancel_interrupts_real_sleep_promptly() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.add_running_build("selenium-tests", BuildScript::never_finishes());

    let client = client_for(&server);
    let cancel = Arc::new(CancelSignal::new());

    let canceller = {
        let cancel = Arc::clone(&cancel);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            cancel.cancel();
        })
    };

    let start = Instant::now();
    let report = CompletionWaiter::new(&client, Arc::clone(&cancel))
        .wait(&job("selenium-tests"), Duration::from_secs(30 * 60));
    canceller.join().unwrap();

    assert_eq!(report.outcome, WaitOutcome::Interrupted);
    assert_eq!(report.polls, 1);
    assert!(start.elapsed() < POLL_INTERVAL);
    // The caller still sees the cancellation
    assert!(cancel.is_cancelled());
    assert_eq!(report.into_result().message, "Wait interrupted");
}

/// Clock that sets the cancel signal after a number of sleeps
struct CancellingClock {
    inner: ManualClock,
    cancel: Arc<CancelSignal>,
    after: usize,
}

impl Clock for CancellingClock {
    fn now(&self) -> Instant {
        self.inner.now()
    }

    fn sleep(
        &self,
        duration: Duration,
        cancel: &CancelSignal,
    ) -> Result<(), jenkins_lane::wait::Interrupted> {
        if self.inner.sleeps().len() + 1 >= self.after {
            self.cancel.cancel();
        }
        self.inner.sleep(duration, cancel)
    }
}

#[test]
fn test_interrupt_after_some_polls() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.add_running_build("selenium-tests", BuildScript::never_finishes());

    let client = client_for(&server);
    let cancel = Arc::new(CancelSignal::new());
    let clock = Arc::new(CancellingClock {
        inner: ManualClock::new(),
        cancel: Arc::clone(&cancel),
        after: 3,
    });

    let report = CompletionWaiter::new(&client, Arc::clone(&cancel))
        .with_clock(clock)
        .wait(&job("selenium-tests"), Duration::from_secs(600));

    assert_eq!(report.outcome, WaitOutcome::Interrupted);
    assert_eq!(report.polls, 3);
    assert_eq!(report.elapsed, Duration::from_secs(20));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_waiter_on_worker_thread_reports_over_channel() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.add_running_build("selenium-tests", BuildScript::finishes_after(2, "ABORTED"));

    let client = client_for(&server);
    let (tx, rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        let report = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
            .with_clock(Arc::new(ManualClock::new()))
            .wait(&job("selenium-tests"), Duration::from_secs(600));
        tx.send(report.into_result()).unwrap();
        client.shutdown();
    });

    let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    worker.join().unwrap();

    assert!(!result.success);
    assert_eq!(result.message, "Job failed with status: ABORTED");
}

#[test]
fn test_independent_clients_share_nothing() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            thread::spawn(move || {
                let server = MockServer::new();
                let name = format!("job-{}", i);
                server.add_job(&name);
                server.script_next_build(&name, BuildScript::finishes_after(i, "SUCCESS"));

                let client = client_for(&server);
                assert!(client.trigger_build(&job(&name), None).success);
                CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
                    .with_clock(Arc::new(ManualClock::new()))
                    .wait(&job(&name), Duration::from_secs(600))
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let report = handle.join().unwrap();
        assert!(report.outcome.is_success());
        assert_eq!(report.polls, i as u32 + 1);
    }
}

// =============================================================================
// The wait targets whatever the last build is at poll time
// =============================================================================

#[test]
fn test_wait_follows_newest_build() {
    let server = MockServer::new();
    server.add_job("selenium-tests");
    server.script_next_build("selenium-tests", BuildScript::never_finishes());

    let client = client_for(&server);
    assert!(client.trigger_build(&job("selenium-tests"), None).success);

    // Someone else triggers a second build that finishes at once
    server.script_next_build("selenium-tests", BuildScript::finishes_after(0, "FAILURE"));
    assert!(client.trigger_build(&job("selenium-tests"), None).success);

    let report = CompletionWaiter::new(&client, Arc::new(CancelSignal::new()))
        .with_clock(Arc::new(ManualClock::new()))
        .wait(&job("selenium-tests"), Duration::from_secs(600));

    match report.outcome {
        WaitOutcome::Failed(build) => assert_eq!(build.number, 2),
        other => panic!("expected the second build to be observed, got {:?}", other),
    }
}
