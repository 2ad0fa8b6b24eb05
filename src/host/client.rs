//! Orchestration Client
//!
//! Triggers and inspects builds on the upstream server. Every operation
//! performs one transport exchange and converts transport and decoding
//! failures into the uniform result contract: a failed
//! `OrchestrationResult`, `None`, or a sentinel string. Nothing here
//! returns an error to the caller.

use jenkins_protocol::{
    decode_build_status, decode_job_info, decode_job_list, BuildParameters, BuildSelector,
    BuildStatus, Endpoint, JobInfo, JobList, JobReference,
};
use tracing::{debug, error, info, warn};

use super::auth::Credentials;
use super::result::OrchestrationResult;
use super::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Console text returned when the server answers with a non-200 status
pub const CONSOLE_FETCH_FAILED: &str = "Failed to retrieve console output";

/// Console text returned when the exchange itself fails
pub const CONSOLE_FETCH_ERROR: &str = "Error retrieving console output";

/// Client for one upstream server
pub struct OrchestrationClient {
    /// Base URL, always ending in exactly one `/`
    base_url: String,
    credentials: Credentials,
    /// Owned by this client alone and released by `shutdown`
    transport: Box<dyn Transport>,
    /// Every log line of this client is emitted inside this span
    span: tracing::Span,
}

impl OrchestrationClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str, credentials: Credentials, transport: Box<dyn Transport>) -> Self {
        let base_url = normalize_base_url(base_url);
        let span = tracing::info_span!(
            "jenkins",
            server = %base_url,
            user = %credentials.username()
        );
        Self {
            base_url,
            credentials,
            transport,
            span,
        }
    }

    /// Replace the span log lines are emitted in
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    fn execute(
        &self,
        endpoint: &Endpoint<'_>,
        body: Option<String>,
    ) -> Result<HttpResponse, TransportError> {
        let request = HttpRequest::for_endpoint(endpoint, &self.base_url, &self.credentials, body);
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(&request)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");
        Ok(response)
    }

    // === Public Operations ===

    /// Trigger a build, with parameters when a non-empty set is given
    ///
    /// Success means the server accepted the trigger (HTTP 200 or 201).
    /// The server does not say which build number the trigger produced.
    pub fn trigger_build(
        &self,
        job: &JobReference,
        parameters: Option<&BuildParameters>,
    ) -> OrchestrationResult {
        let _guard = self.span.enter();

        let parameters = parameters.filter(|p| !p.is_empty());
        let (endpoint, body) = match parameters {
            Some(params) => match params.encode_form() {
                Ok(body) => (Endpoint::BuildWithParameters(job), Some(body)),
                Err(e) => {
                    let message =
                        format!("Error encoding parameters for Jenkins job: {}: {}", job, e);
                    error!("{}", message);
                    return OrchestrationResult::failed(message);
                }
            },
            None => (Endpoint::Build(job), None),
        };

        match self.execute(&endpoint, body) {
            Ok(response) if response.status == 200 || response.status == 201 => {
                match parameters {
                    Some(params) => info!(
                        job = %job,
                        parameters = %params,
                        "Successfully triggered Jenkins job"
                    ),
                    None => info!(job = %job, "Successfully triggered Jenkins job"),
                }
                OrchestrationResult::succeeded("Job triggered successfully")
            }
            Ok(response) => {
                let message = format!(
                    "Failed to trigger Jenkins job: {}. Status code: {}",
                    job, response.status
                );
                error!("{}", message);
                OrchestrationResult::failed(message)
            }
            Err(e) => {
                let message = format!("Error triggering Jenkins job: {}: {}", job, e);
                error!("{}", message);
                OrchestrationResult::failed(message)
            }
        }
    }

    /// Fetch a snapshot of a job's metadata
    pub fn fetch_job_info(&self, job: &JobReference) -> Option<JobInfo> {
        let _guard = self.span.enter();

        let response = self.fetch_ok(&Endpoint::JobInfo(job), "job info")?;
        match decode_job_info(&response.body) {
            Ok(info) => {
                info!(job = %job, "Retrieved job info");
                Some(info)
            }
            Err(e) => {
                error!(job = %job, error = %e, "Failed to decode job info");
                None
            }
        }
    }

    /// Fetch a snapshot of one build
    pub fn fetch_build_status(
        &self,
        job: &JobReference,
        selector: BuildSelector,
    ) -> Option<BuildStatus> {
        let _guard = self.span.enter();

        let response = self.fetch_ok(&Endpoint::BuildStatus(job, selector), "build status")?;
        match decode_build_status(&response.body) {
            Ok(status) => {
                info!(job = %job, build = %selector, "Retrieved build status");
                Some(status)
            }
            Err(e) => {
                error!(job = %job, build = %selector, error = %e, "Failed to decode build status");
                None
            }
        }
    }

    /// Fetch the console log of a build
    ///
    /// Returns `CONSOLE_FETCH_FAILED` or `CONSOLE_FETCH_ERROR` on failure.
    pub fn fetch_console_output(&self, job: &JobReference, selector: BuildSelector) -> String {
        let _guard = self.span.enter();

        match self.execute(&Endpoint::ConsoleText(job, selector), None) {
            Ok(response) if response.is_ok() => {
                info!(job = %job, build = %selector, "Retrieved console output");
                response.body
            }
            Ok(response) => {
                error!(
                    job = %job,
                    build = %selector,
                    status = response.status,
                    "Failed to get console output"
                );
                CONSOLE_FETCH_FAILED.to_string()
            }
            Err(e) => {
                error!(job = %job, build = %selector, error = %e, "Error getting console output");
                CONSOLE_FETCH_ERROR.to_string()
            }
        }
    }

    /// List every job on the server, in server order
    pub fn list_jobs(&self) -> Option<JobList> {
        let _guard = self.span.enter();

        let response = self.fetch_ok(&Endpoint::JobList, "job list")?;
        match decode_job_list(&response.body) {
            Ok(list) => {
                info!(count = list.len(), "Retrieved jobs");
                Some(list)
            }
            Err(e) => {
                error!(error = %e, "Failed to decode job list");
                None
            }
        }
    }

    /// Release the transport
    ///
    /// Consumes the client, so release happens exactly once.
    pub fn shutdown(self) {
        let _guard = self.span.enter();
        info!("Closing Jenkins client");
    }

    // === Internal Helpers ===

    /// Execute a GET and keep only 200 responses
    fn fetch_ok(&self, endpoint: &Endpoint<'_>, what: &str) -> Option<HttpResponse> {
        match self.execute(endpoint, None) {
            Ok(response) if response.is_ok() => Some(response),
            Ok(response) => {
                warn!(path = %endpoint.path(), status = response.status, "Failed to get {}", what);
                None
            }
            Err(e) => {
                error!(path = %endpoint.path(), error = %e, "Error getting {}", what);
                None
            }
        }
    }
}

/// Ensure exactly one trailing `/`
fn normalize_base_url(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}
