//! Build types.
//!
//! `BuildStatus` is one poll's view of a build. Each poll decodes a new
//! snapshot; nothing is carried between polls.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Result string reported by the server once a build stops running.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildResult {
    Success,
    Failure,
    Aborted,
    Unstable,
    NotBuilt,
    /// Any value this client does not know about.
    Other(String),
}

impl BuildResult {
    pub fn as_str(&self) -> &str {
        match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Failure => "FAILURE",
            BuildResult::Aborted => "ABORTED",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::NotBuilt => "NOT_BUILT",
            BuildResult::Other(s) => s,
        }
    }
}

impl From<String> for BuildResult {
    fn from(s: String) -> Self {
        match s.as_str() {
            "SUCCESS" => BuildResult::Success,
            "FAILURE" => BuildResult::Failure,
            "ABORTED" => BuildResult::Aborted,
            "UNSTABLE" => BuildResult::Unstable,
            "NOT_BUILT" => BuildResult::NotBuilt,
            _ => BuildResult::Other(s),
        }
    }
}

impl From<&str> for BuildResult {
    fn from(s: &str) -> Self {
        BuildResult::from(s.to_string())
    }
}

impl From<BuildResult> for String {
    fn from(result: BuildResult) -> Self {
        match result {
            BuildResult::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which build of a job to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildSelector {
    /// Whatever the server currently considers the most recent build.
    #[default]
    Last,
    Number(u32),
}

impl BuildSelector {
    /// Path segment used in build URLs.
    pub fn path_segment(&self) -> String {
        match self {
            BuildSelector::Last => "lastBuild".to_string(),
            BuildSelector::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for BuildSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildSelector::Last => write!(f, "last"),
            BuildSelector::Number(n) => write!(f, "#{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid build selector '{0}': expected 'last' or a positive build number")]
pub struct InvalidSelector(pub String);

impl FromStr for BuildSelector {
    type Err = InvalidSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "" | "last" | "lastBuild" => Ok(BuildSelector::Last),
            _ => match trimmed.trim_start_matches('#').parse::<u32>() {
                Ok(n) if n > 0 => Ok(BuildSelector::Number(n)),
                _ => Err(InvalidSelector(s.to_string())),
            },
        }
    }
}

/// Snapshot of a single build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatus {
    pub number: u32,
    /// Absent while the build is running.
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub building: bool,
    /// Milliseconds; 0 until the build finishes.
    #[serde(default)]
    pub duration: u64,
    /// Start time in epoch milliseconds.
    #[serde(default)]
    pub timestamp: i64,
    pub url: String,
}

impl BuildStatus {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        if self.timestamp == 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    pub fn result_str(&self) -> &str {
        self.result.as_ref().map(|r| r.as_str()).unwrap_or("N/A")
    }

    pub fn format_duration(&self) -> String {
        format_duration(self.duration)
    }
}

/// Render a millisecond duration as `1h 2m 3s`, `2m 3s`, or `3s`.
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms == 0 {
        return "N/A".to_string();
    }

    let seconds = duration_ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
