//! Mock Server State Management
//!
//! Jobs and builds held by the mock server. Builds advance only when
//! their status is polled, so tests control progress by polling.

use jenkins_protocol::BuildParameters;
use serde_json::{json, Value};

/// Base start time for mock builds (epoch milliseconds)
const BASE_TIMESTAMP_MS: i64 = 1_700_000_000_000;

/// Duration reported for finished mock builds
const FINISHED_DURATION_MS: u64 = 42_000;

/// How a build progresses under polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildScript {
    /// Status polls that still report `building: true`
    pub building_polls: u32,
    /// Result reported once the build stops; None reports `"result": null`
    pub result: Option<String>,
}

impl BuildScript {
    /// Report building for `polls` polls, then finish with `result`
    pub fn finishes_after(polls: u32, result: impl Into<String>) -> Self {
        Self {
            building_polls: polls,
            result: Some(result.into()),
        }
    }

    /// Finish without a result string
    pub fn finishes_without_result(polls: u32) -> Self {
        Self {
            building_polls: polls,
            result: None,
        }
    }

    /// Stay in the building state for every poll
    pub fn never_finishes() -> Self {
        Self {
            building_polls: u32::MAX,
            result: None,
        }
    }
}

impl Default for BuildScript {
    fn default() -> Self {
        Self::finishes_after(0, "SUCCESS")
    }
}

/// A build held by the mock server
#[derive(Debug, Clone)]
pub struct MockBuild {
    pub number: u32,
    pub building: bool,
    pub result: Option<String>,
    pub duration: u64,
    pub timestamp: i64,
    pub console: String,
    pub parameters: BuildParameters,
    script: BuildScript,
}

impl MockBuild {
    /// Create a build that is running and follows `script`
    pub fn running(number: u32, script: BuildScript, parameters: BuildParameters) -> Self {
        Self {
            number,
            building: true,
            result: None,
            duration: 0,
            timestamp: BASE_TIMESTAMP_MS + i64::from(number) * 60_000,
            console: format!("Started by user admin\nBuilding #{}\n", number),
            parameters,
            script,
        }
    }

    /// Create a build that already finished with `result`
    pub fn finished(number: u32, result: impl Into<String>, console: impl Into<String>) -> Self {
        Self {
            number,
            building: false,
            result: Some(result.into()),
            duration: FINISHED_DURATION_MS,
            timestamp: BASE_TIMESTAMP_MS + i64::from(number) * 60_000,
            console: console.into(),
            parameters: BuildParameters::new(),
            script: BuildScript::default(),
        }
    }

    /// Apply one status poll to the build's script
    pub fn observe(&mut self) {
        if !self.building {
            return;
        }
        if self.script.building_polls > 0 {
            self.script.building_polls -= 1;
            return;
        }
        self.building = false;
        self.result = self.script.result.clone();
        self.duration = FINISHED_DURATION_MS;
        self.console.push_str(&format!(
            "Finished: {}\n",
            self.result.as_deref().unwrap_or("NOT_BUILT")
        ));
    }

    pub fn url(&self, job_url: &str) -> String {
        format!("{}{}/", job_url, self.number)
    }

    pub fn to_json(&self, job_url: &str) -> Value {
        json!({
            "_class": "hudson.model.FreeStyleBuild",
            "number": self.number,
            "result": self.result,
            "building": self.building,
            "duration": self.duration,
            "timestamp": self.timestamp,
            "url": self.url(job_url),
        })
    }
}

/// A job held by the mock server
#[derive(Debug, Clone)]
pub struct MockJob {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub buildable: bool,
    pub builds: Vec<MockBuild>,
    /// Script applied to the next triggered build
    pub next_script: BuildScript,
}

impl MockJob {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            color: "notbuilt".to_string(),
            buildable: true,
            builds: Vec::new(),
            next_script: BuildScript::default(),
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}job/{}/", base_url, self.name)
    }

    pub fn last_build(&self) -> Option<&MockBuild> {
        self.builds.last()
    }

    pub fn next_number(&self) -> u32 {
        self.builds.last().map(|b| b.number + 1).unwrap_or(1)
    }

    pub fn to_json(&self, base_url: &str) -> Value {
        let job_url = self.url(base_url);
        let last_build = self.last_build().map(|b| {
            json!({
                "number": b.number,
                "url": b.url(&job_url),
                "result": b.result,
                "building": b.building,
            })
        });

        json!({
            "_class": "hudson.model.FreeStyleProject",
            "name": self.name,
            "description": self.description,
            "url": job_url,
            "color": self.color,
            "buildable": self.buildable,
            "lastBuild": last_build,
        })
    }
}

/// All mutable state of the mock server
#[derive(Debug, Default)]
pub struct MockState {
    /// Jobs in registration order (the order listings return)
    pub jobs: Vec<MockJob>,
}

impl MockState {
    pub fn job(&self, name: &str) -> Option<&MockJob> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn job_mut(&mut self, name: &str) -> Option<&mut MockJob> {
        self.jobs.iter_mut().find(|j| j.name == name)
    }
}
