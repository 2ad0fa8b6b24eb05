//! Automated test runner
//!
//! Triggers the test job with `BROWSER` and `CSV_FILE` parameters and
//! optionally waits for it to finish. A rejected trigger never starts a
//! wait.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use jenkins_protocol::{BuildParameters, BuildSelector, BuildStatus, JobReference};
use serde::Serialize;
use tracing::{error, info};

use crate::config::DEFAULT_CSV_FILE;
use crate::host::{OrchestrationClient, OrchestrationResult};
use crate::signal::CancelSignal;
use crate::wait::{Clock, CompletionWaiter, SystemClock};

/// Parameter carrying the browser name
pub const BROWSER_PARAM: &str = "BROWSER";

/// Parameter carrying the test data file path
pub const CSV_FILE_PARAM: &str = "CSV_FILE";

/// Browser the remote tests run in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
    Other(String),
}

impl Browser {
    pub fn as_str(&self) -> &str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Other(name) => name,
        }
    }
}

impl From<&str> for Browser {
    /// Case-insensitive; an empty name means the default browser
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "chrome" => Browser::Chrome,
            "firefox" => Browser::Firefox,
            _ => Browser::Other(trimmed.to_string()),
        }
    }
}

impl FromStr for Browser {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Browser::from(s))
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One run of the test job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub job: JobReference,
    pub browser: Browser,
    pub csv_file: String,
    pub wait: bool,
    pub timeout: Duration,
}

impl RunRequest {
    /// Chrome, the default data file, waiting up to 30 minutes
    pub fn new(job: JobReference) -> Self {
        Self {
            job,
            browser: Browser::default(),
            csv_file: DEFAULT_CSV_FILE.to_string(),
            wait: true,
            timeout: Duration::from_secs(30 * 60),
        }
    }

    pub fn with_browser(mut self, browser: Browser) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_csv_file(mut self, csv_file: impl Into<String>) -> Self {
        self.csv_file = csv_file.into();
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn parameters(&self) -> BuildParameters {
        BuildParameters::new()
            .with(BROWSER_PARAM, self.browser.as_str())
            .with(CSV_FILE_PARAM, self.csv_file.as_str())
    }
}

/// Latest build of a job together with its console log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestResults {
    pub status: Option<BuildStatus>,
    pub console: String,
}

impl LatestResults {
    /// Result of the latest build, `UNKNOWN` when its status is unavailable
    pub fn result_str(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.result_str())
            .unwrap_or("UNKNOWN")
    }
}

pub struct TestRunner<'a> {
    client: &'a OrchestrationClient,
    cancel: Arc<CancelSignal>,
    clock: Arc<dyn Clock>,
}

impl<'a> TestRunner<'a> {
    pub fn new(client: &'a OrchestrationClient, cancel: Arc<CancelSignal>) -> Self {
        Self {
            client,
            cancel,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Trigger the job for `request` and wait if asked to
    pub fn run(&self, request: &RunRequest) -> OrchestrationResult {
        let _guard = self.client.span().enter();
        info!(
            job = %request.job,
            browser = %request.browser,
            csv_file = %request.csv_file,
            "Starting test execution"
        );

        let trigger = self
            .client
            .trigger_build(&request.job, Some(&request.parameters()));
        if !trigger.success {
            error!(job = %request.job, "Failed to trigger Jenkins job: {}", trigger.message);
            return OrchestrationResult::failed(format!(
                "Failed to trigger job: {}",
                trigger.message
            ));
        }

        if !request.wait {
            info!(job = %request.job, "Job triggered, not waiting for completion");
            return OrchestrationResult::succeeded("Job triggered successfully");
        }

        info!(
            job = %request.job,
            timeout_minutes = request.timeout.as_secs() / 60,
            "Waiting for job completion"
        );
        let waited = CompletionWaiter::new(self.client, Arc::clone(&self.cancel))
            .with_clock(Arc::clone(&self.clock))
            .wait(&request.job, request.timeout)
            .into_result();

        let result = if waited.success {
            OrchestrationResult::succeeded("Tests completed successfully")
        } else {
            error!(job = %request.job, "Job failed or timed out: {}", waited.message);
            OrchestrationResult::failed(format!("Tests failed: {}", waited.message))
        };
        match waited.build {
            Some(build) => result.with_build(build),
            None => result,
        }
    }

    /// Run each named scenario in order
    ///
    /// Later scenarios run even when earlier ones fail, unless the wait
    /// was interrupted.
    pub fn run_scenarios(
        &self,
        scenarios: &[(String, RunRequest)],
    ) -> BTreeMap<String, OrchestrationResult> {
        info!("Running {} test scenarios", scenarios.len());

        let mut results = BTreeMap::new();
        for (name, request) in scenarios {
            if self.cancel.is_cancelled() {
                results.insert(name.clone(), OrchestrationResult::failed("Wait interrupted"));
                continue;
            }

            info!(scenario = %name, "Running scenario");
            let result = self.run(request);
            if result.success {
                info!(scenario = %name, "Scenario completed successfully");
            } else {
                error!(scenario = %name, "Scenario failed: {}", result.message);
            }
            results.insert(name.clone(), result);
        }
        results
    }

    /// Last build status of `job`, or None if unavailable
    pub fn status(&self, job: &JobReference) -> Option<BuildStatus> {
        self.client.fetch_build_status(job, BuildSelector::Last)
    }

    /// Last build status of `job` plus its console log
    pub fn latest_results(&self, job: &JobReference) -> LatestResults {
        LatestResults {
            status: self.status(job),
            console: self.client.fetch_console_output(job, BuildSelector::Last),
        }
    }
}

/// Process exit code for a run
pub fn exit_code(result: &OrchestrationResult) -> i32 {
    result.exit_code()
}
