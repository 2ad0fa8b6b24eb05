//! Job types.
//!
//! A job is addressed by name only. `JobInfo` and `JobList` are snapshots
//! built fresh from each response and never updated in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::build::BuildResult;

/// Name of a job on the upstream server.
///
/// The name is opaque: only the empty string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobReference(String);

/// Returned when a job reference is built from an empty name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("job name cannot be empty")]
pub struct InvalidJobReference;

impl JobReference {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidJobReference> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidJobReference);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JobReference {
    type Err = InvalidJobReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for JobReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Summary of the most recent build, as embedded in job payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRef {
    pub number: u32,
    /// Not requested by the job-list tree query, so often absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub building: bool,
}

/// Snapshot of a job's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub url: String,
    /// Server-defined status color, e.g. `blue`, `red_anime`.
    pub color: String,
    pub buildable: bool,
    #[serde(rename = "lastBuild", default)]
    pub last_build: Option<BuildRef>,
}

impl JobInfo {
    /// Number of the most recent build, 0 when the job never ran.
    pub fn last_build_number(&self) -> u32 {
        self.last_build.as_ref().map(|b| b.number).unwrap_or(0)
    }

    pub fn last_build_result(&self) -> Option<&BuildResult> {
        self.last_build.as_ref().and_then(|b| b.result.as_ref())
    }

    pub fn last_build_building(&self) -> bool {
        self.last_build.as_ref().map(|b| b.building).unwrap_or(false)
    }
}

/// Jobs in the order the server returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobList {
    pub jobs: Vec<JobInfo>,
}

impl JobList {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JobInfo> {
        self.jobs.iter()
    }

    pub fn find(&self, name: &str) -> Option<&JobInfo> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

impl<'a> IntoIterator for &'a JobList {
    type Item = &'a JobInfo;
    type IntoIter = std::slice::Iter<'a, JobInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.iter()
    }
}

/// Jenkins sends `"description": null` for jobs that never had one.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
