//! Mock Server Implementation
//!
//! Configurable in-process stand-in for the upstream REST API.

use std::sync::{Arc, Mutex, MutexGuard};

use jenkins_protocol::{BuildParameters, Method};
use serde_json::json;

use crate::host::auth::Credentials;
use crate::host::transport::{HttpRequest, HttpResponse, TransportError};

use super::failure::{FailureConfig, FailureInjector, Route};
use super::state::{BuildScript, MockBuild, MockJob, MockState};

/// Base URL the mock server answers under
pub const MOCK_BASE_URL: &str = "http://mock.jenkins/";

/// Configurable mock server for testing
///
/// Clones share state, so a test can keep one handle while the transport
/// owns another.
#[derive(Clone)]
pub struct MockServer {
    /// Mutable state (wrapped for interior mutability)
    state: Arc<Mutex<MockState>>,
    /// Failure injector
    failures: Arc<Mutex<FailureInjector>>,
    /// Authorization header every request must carry, if set
    expected_auth: Arc<Mutex<Option<String>>>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockServer {
    /// Create an empty mock server
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            failures: Arc::new(Mutex::new(FailureInjector::new())),
            expected_auth: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn base_url(&self) -> &'static str {
        MOCK_BASE_URL
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // === Configuration ===

    /// Register a job (no builds yet)
    pub fn add_job(&self, name: &str) {
        let mut state = self.state();
        if state.job(name).is_none() {
            state.jobs.push(MockJob::new(name));
        }
    }

    pub fn set_description(&self, job: &str, description: &str) {
        self.with_job(job, |j| j.description = Some(description.to_string()));
    }

    pub fn set_buildable(&self, job: &str, buildable: bool) {
        self.with_job(job, |j| j.buildable = buildable);
    }

    pub fn set_color(&self, job: &str, color: &str) {
        self.with_job(job, |j| j.color = color.to_string());
    }

    /// Script the progression of the next build the job gets triggered into
    pub fn script_next_build(&self, job: &str, script: BuildScript) {
        self.with_job(job, |j| j.next_script = script);
    }

    /// Append an already-finished build, returning its number
    pub fn add_finished_build(&self, job: &str, result: &str, console: &str) -> u32 {
        self.with_job(job, |j| {
            let number = j.next_number();
            j.builds.push(MockBuild::finished(number, result, console));
            number
        })
        .unwrap_or(0)
    }

    /// Append a running build following `script`, returning its number
    pub fn add_running_build(&self, job: &str, script: BuildScript) -> u32 {
        self.with_job(job, |j| {
            let number = j.next_number();
            j.builds
                .push(MockBuild::running(number, script, BuildParameters::new()));
            number
        })
        .unwrap_or(0)
    }

    /// Reject requests whose Authorization header does not match
    pub fn require_credentials(&self, credentials: &Credentials) {
        if let Ok(mut expected) = self.expected_auth.lock() {
            *expected = Some(credentials.basic_auth());
        }
    }

    /// Inject a failure for a route
    pub fn inject(&self, route: Route, config: FailureConfig) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.set(route, config);
        }
    }

    /// Remove every injected failure
    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear_all();
        }
    }

    // === Inspection ===

    /// All requests received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of requests received for a route
    pub fn count(&self, route: Route) -> usize {
        self.requests()
            .iter()
            .filter(|r| Self::route_of(r) == Some(route))
            .count()
    }

    /// Number of builds a job has
    pub fn build_count(&self, job: &str) -> usize {
        self.state().job(job).map(|j| j.builds.len()).unwrap_or(0)
    }

    /// Parameters the last build of a job was triggered with
    pub fn last_parameters(&self, job: &str) -> Option<BuildParameters> {
        self.state()
            .job(job)
            .and_then(|j| j.last_build())
            .map(|b| b.parameters.clone())
    }

    // === Request Handling ===

    /// Handle a request as the upstream server would
    pub fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let route = Self::route_of(request);

        if let Some(route) = route {
            let failure = self.failures.lock().ok().and_then(|mut f| f.check(route));
            if let Some(failure) = failure {
                return Self::apply_failure(failure);
            }
        }

        let expected = self.expected_auth.lock().ok().and_then(|e| e.clone());
        if let Some(expected) = expected {
            if request.authorization != expected {
                return Ok(HttpResponse::new(401, "Unauthorized"));
            }
        }

        let path = match request.url.strip_prefix(MOCK_BASE_URL) {
            Some(path) => path,
            None => return Ok(HttpResponse::new(404, "Not Found")),
        };

        let (path, _query) = path.split_once('?').unwrap_or((path, ""));
        if path == "api/json" {
            return Ok(self.job_list(request));
        }

        let segments: Vec<&str> = match path.strip_prefix("job/") {
            Some(rest) => rest.split('/').filter(|s| !s.is_empty()).collect(),
            None => return Ok(HttpResponse::new(404, "Not Found")),
        };

        match (request.method, segments.as_slice()) {
            (Method::Post, [job, "build"]) => Ok(self.trigger(job, None)),
            (Method::Post, [job, "buildWithParameters"]) => {
                Ok(self.trigger(job, request.body.as_deref()))
            }
            (Method::Get, [job, "api", "json"]) => Ok(self.job_info(job)),
            (Method::Get, [job, selector, "api", "json"]) => Ok(self.build_status(job, selector)),
            (Method::Get, [job, selector, "consoleText"]) => Ok(self.console_text(job, selector)),
            (Method::Get, [_, "build"]) | (Method::Get, [_, "buildWithParameters"]) => {
                Ok(HttpResponse::new(405, "Method Not Allowed"))
            }
            _ => Ok(HttpResponse::new(404, "Not Found")),
        }
    }

    fn route_of(request: &HttpRequest) -> Option<Route> {
        let path = request.url.strip_prefix(MOCK_BASE_URL)?;
        let path = path.split('?').next().unwrap_or(path);
        if path == "api/json" {
            return Some(Route::JobList);
        }
        if path.ends_with("/build") || path.ends_with("/buildWithParameters") {
            return Some(Route::Trigger);
        }
        if path.ends_with("/consoleText") {
            return Some(Route::ConsoleText);
        }
        let segments = path.strip_prefix("job/")?.trim_end_matches('/').split('/').count();
        match segments {
            3 => Some(Route::JobInfo),
            4 => Some(Route::BuildStatus),
            _ => None,
        }
    }

    fn apply_failure(failure: FailureConfig) -> Result<HttpResponse, TransportError> {
        if let Some(message) = failure.transport_error {
            return Err(TransportError::Injected(message));
        }
        Ok(HttpResponse::new(
            failure.status.unwrap_or(500),
            failure.body.unwrap_or_else(|| "Server Error".to_string()),
        ))
    }

    fn with_job<T>(&self, name: &str, f: impl FnOnce(&mut MockJob) -> T) -> Option<T> {
        self.state().job_mut(name).map(f)
    }

    fn trigger(&self, job: &str, body: Option<&str>) -> HttpResponse {
        let parameters = match body.map(BuildParameters::decode_form) {
            Some(Ok(params)) => params,
            Some(Err(_)) => return HttpResponse::new(400, "Bad Request"),
            None => BuildParameters::new(),
        };

        let mut state = self.state();
        let job = match state.job_mut(job) {
            Some(job) => job,
            None => return HttpResponse::new(404, "Not Found"),
        };
        if !job.buildable {
            return HttpResponse::new(409, "Job is disabled");
        }

        let number = job.next_number();
        let script = job.next_script.clone();
        job.builds.push(MockBuild::running(number, script, parameters));
        job.color = "blue_anime".to_string();

        HttpResponse::new(201, "")
    }

    fn job_info(&self, job: &str) -> HttpResponse {
        match self.state().job(job) {
            Some(job) => HttpResponse::new(200, job.to_json(MOCK_BASE_URL).to_string()),
            None => HttpResponse::new(404, "Not Found"),
        }
    }

    fn find_build<'a>(job: &'a mut MockJob, selector: &str) -> Option<&'a mut MockBuild> {
        if selector == "lastBuild" {
            return job.builds.last_mut();
        }
        let number: u32 = selector.parse().ok()?;
        job.builds.iter_mut().find(|b| b.number == number)
    }

    fn build_status(&self, job: &str, selector: &str) -> HttpResponse {
        let mut state = self.state();
        let job = match state.job_mut(job) {
            Some(job) => job,
            None => return HttpResponse::new(404, "Not Found"),
        };
        let job_url = job.url(MOCK_BASE_URL);
        let build = match Self::find_build(job, selector) {
            Some(build) => build,
            None => return HttpResponse::new(404, "Not Found"),
        };

        build.observe();
        let body = build.to_json(&job_url).to_string();
        let color = match (build.building, build.result.as_deref()) {
            (true, _) => None,
            (false, Some("SUCCESS")) => Some("blue"),
            (false, Some("UNSTABLE")) => Some("yellow"),
            (false, Some("ABORTED")) => Some("aborted"),
            (false, _) => Some("red"),
        };
        if let Some(color) = color {
            job.color = color.to_string();
        }
        HttpResponse::new(200, body)
    }

    fn console_text(&self, job: &str, selector: &str) -> HttpResponse {
        let mut state = self.state();
        let job = match state.job_mut(job) {
            Some(job) => job,
            None => return HttpResponse::new(404, "Not Found"),
        };
        match Self::find_build(job, selector) {
            Some(build) => HttpResponse::new(200, build.console.clone()),
            None => HttpResponse::new(404, "Not Found"),
        }
    }

    fn job_list(&self, request: &HttpRequest) -> HttpResponse {
        if request.method != Method::Get {
            return HttpResponse::new(405, "Method Not Allowed");
        }
        let state = self.state();
        let jobs: Vec<_> = state.jobs.iter().map(|j| j.to_json(MOCK_BASE_URL)).collect();
        HttpResponse::new(
            200,
            json!({"_class": "hudson.model.Hudson", "jobs": jobs}).to_string(),
        )
    }
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> HttpRequest {
        HttpRequest {
            method: Method::Get,
            url: format!("{}{}", MOCK_BASE_URL, path),
            authorization: Credentials::new("admin", "t").basic_auth(),
            content_type: None,
            body: None,
        }
    }

    fn post(path: &str, body: Option<&str>) -> HttpRequest {
        HttpRequest {
            method: Method::Post,
            body: body.map(String::from),
            ..get(path)
        }
    }

    #[test]
    fn test_unknown_job_is_404() {
        let server = MockServer::new();
        let response = server.handle(&get("job/missing/api/json")).unwrap();
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_trigger_creates_running_build() {
        let server = MockServer::new();
        server.add_job("a");

        let response = server.handle(&post("job/a/build", None)).unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(server.build_count("a"), 1);

        let status = server.handle(&get("job/a/lastBuild/api/json")).unwrap();
        assert_eq!(status.status, 200);
        assert!(status.body.contains("\"number\":1"));
    }

    #[test]
    fn test_trigger_with_parameters_records_them() {
        let server = MockServer::new();
        server.add_job("a");

        let response = server
            .handle(&post("job/a/buildWithParameters", Some("BROWSER=firefox&CSV_FILE=x.csv")))
            .unwrap();
        assert_eq!(response.status, 201);

        let params = server.last_parameters("a").unwrap();
        assert_eq!(params.get("BROWSER"), Some("firefox"));
        assert_eq!(params.get("CSV_FILE"), Some("x.csv"));
    }

    #[test]
    fn test_disabled_job_rejects_trigger() {
        let server = MockServer::new();
        server.add_job("a");
        server.set_buildable("a", false);

        let response = server.handle(&post("job/a/build", None)).unwrap();
        assert_eq!(response.status, 409);
    }

    #[test]
    fn test_credentials_enforced() {
        let server = MockServer::new();
        server.add_job("a");
        server.require_credentials(&Credentials::new("admin", "other"));

        let response = server.handle(&get("job/a/api/json")).unwrap();
        assert_eq!(response.status, 401);
    }

    #[test]
    fn test_wrong_method_for_trigger() {
        let server = MockServer::new();
        server.add_job("a");
        let response = server.handle(&get("job/a/build")).unwrap();
        assert_eq!(response.status, 405);
    }

    #[test]
    fn test_route_counting() {
        let server = MockServer::new();
        server.add_job("a");
        server.add_finished_build("a", "SUCCESS", "ok");

        server.handle(&get("job/a/lastBuild/api/json")).unwrap();
        server.handle(&get("job/a/1/api/json")).unwrap();
        server.handle(&get("job/a/1/consoleText")).unwrap();
        server.handle(&get("job/a/api/json")).unwrap();

        assert_eq!(server.count(Route::BuildStatus), 2);
        assert_eq!(server.count(Route::ConsoleText), 1);
        assert_eq!(server.count(Route::JobInfo), 1);
    }

    #[test]
    fn test_injected_transport_failure() {
        let server = MockServer::new();
        server.inject(Route::JobList, FailureConfig::transport("connection reset"));
        let result = server.handle(&get("api/json?tree=jobs[name]"));
        assert!(matches!(result, Err(TransportError::Injected(_))));
    }

    #[test]
    fn test_color_reported_in_job_info() {
        let server = MockServer::new();
        server.add_job("a");
        server.set_color("a", "red_anime");

        let response = server.handle(&get("job/a/api/json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(value["color"], "red_anime");
    }

    #[test]
    fn test_clear_failures_restores_routes() {
        let server = MockServer::new();
        server.add_job("a");
        server.inject(Route::JobInfo, FailureConfig::status(503));
        assert_eq!(server.handle(&get("job/a/api/json")).unwrap().status, 503);

        server.clear_failures();
        assert_eq!(server.handle(&get("job/a/api/json")).unwrap().status, 200);
    }
}
