//! Response decoding.
//!
//! Required fields must be present with the right type; optional fields
//! fall back to defaults because the server omits them situationally
//! (`lastBuild` is absent for jobs that never ran, `result` while a build
//! is running).

use serde::de::DeserializeOwned;

use crate::build::BuildStatus;
use crate::job::{JobInfo, JobList};

/// A payload that does not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum MalformedResponseError {
    #[error("malformed {shape} payload: {source}")]
    Json {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed {shape} payload: field '{field}' {reason}")]
    InvalidField {
        shape: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl MalformedResponseError {
    pub fn shape(&self) -> &'static str {
        match self {
            MalformedResponseError::Json { shape, .. } => shape,
            MalformedResponseError::InvalidField { shape, .. } => shape,
        }
    }
}

fn decode<T: DeserializeOwned>(
    shape: &'static str,
    body: &str,
) -> Result<T, MalformedResponseError> {
    serde_json::from_str(body).map_err(|source| MalformedResponseError::Json { shape, source })
}

pub fn decode_job_info(body: &str) -> Result<JobInfo, MalformedResponseError> {
    decode("job", body)
}

pub fn decode_build_status(body: &str) -> Result<BuildStatus, MalformedResponseError> {
    let status: BuildStatus = decode("build", body)?;
    if status.number == 0 {
        return Err(MalformedResponseError::InvalidField {
            shape: "build",
            field: "number",
            reason: "must be a positive integer".to_string(),
        });
    }
    Ok(status)
}

pub fn decode_job_list(body: &str) -> Result<JobList, MalformedResponseError> {
    decode("job list", body)
}
