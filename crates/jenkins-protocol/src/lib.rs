//! Jenkins REST Payload Types
//!
//! Value objects for jobs and builds, the JSON decoder that produces them,
//! and the relative paths of the upstream endpoints.

pub mod build;
pub mod decode;
pub mod endpoint;
pub mod job;
pub mod params;

pub use build::{format_duration, BuildResult, BuildSelector, BuildStatus, InvalidSelector};
pub use decode::{decode_build_status, decode_job_info, decode_job_list, MalformedResponseError};
pub use endpoint::{Endpoint, Method};
pub use job::{BuildRef, InvalidJobReference, JobInfo, JobList, JobReference};
pub use params::{BuildParameters, InvalidAssignment};

/// Content type sent with every trigger request.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Field selection used when listing jobs.
pub const JOB_LIST_TREE: &str =
    "jobs[name,url,color,description,buildable,lastBuild[number,result,building]]";
