//! Upstream endpoints.
//!
//! Paths are relative to the server base URL, which always ends in `/`.

use std::fmt;

use crate::build::BuildSelector;
use crate::job::JobReference;
use crate::JOB_LIST_TREE;

/// HTTP method used by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// One of the REST routes this client consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// `POST job/{name}/build`
    Build(&'a JobReference),
    /// `POST job/{name}/buildWithParameters`
    BuildWithParameters(&'a JobReference),
    /// `GET job/{name}/api/json`
    JobInfo(&'a JobReference),
    /// `GET job/{name}/{number|lastBuild}/api/json`
    BuildStatus(&'a JobReference, BuildSelector),
    /// `GET job/{name}/{number|lastBuild}/consoleText`
    ConsoleText(&'a JobReference, BuildSelector),
    /// `GET api/json?tree=jobs[...]`
    JobList,
}

impl Endpoint<'_> {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::Build(_) | Endpoint::BuildWithParameters(_) => Method::Post,
            _ => Method::Get,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::Build(job) => format!("job/{}/build", job),
            Endpoint::BuildWithParameters(job) => format!("job/{}/buildWithParameters", job),
            Endpoint::JobInfo(job) => format!("job/{}/api/json", job),
            Endpoint::BuildStatus(job, selector) => {
                format!("job/{}/{}/api/json", job, selector.path_segment())
            }
            Endpoint::ConsoleText(job, selector) => {
                format!("job/{}/{}/consoleText", job, selector.path_segment())
            }
            Endpoint::JobList => format!("api/json?tree={}", JOB_LIST_TREE),
        }
    }

    /// Join with a base URL that ends in `/`.
    pub fn url(&self, base: &str) -> String {
        format!("{}{}", base, self.path())
    }
}
