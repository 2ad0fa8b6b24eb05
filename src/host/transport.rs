//! Transport Layer for the Orchestration Client
//!
//! Abstracts the HTTP exchange for testability. Provides:
//! - Transport trait: one synchronous request/response exchange
//! - MockTransport: in-process mock server for unit tests
//! - HttpTransport: pooled HTTP client for production

use std::io;
use std::time::Duration;

use jenkins_protocol::{Endpoint, Method, FORM_CONTENT_TYPE};

use crate::mock::MockServer;

use super::auth::Credentials;

/// Transport trait for HTTP communication
///
/// Implementations perform exactly one exchange per call. A failed
/// exchange is returned as-is; retrying is never the transport's job.
pub trait Transport: Send + Sync {
    /// Execute a request and return the status code and raw body
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Injected failure: {0}")]
    Injected(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// A single outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Full `Authorization` header value
    pub authorization: String,
    pub content_type: Option<&'static str>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Build the request for an endpoint under `base_url`
    ///
    /// POST endpoints always carry the form content type, with or
    /// without a body.
    pub fn for_endpoint(
        endpoint: &Endpoint<'_>,
        base_url: &str,
        credentials: &Credentials,
        body: Option<String>,
    ) -> Self {
        let method = endpoint.method();
        Self {
            method,
            url: endpoint.url(base_url),
            authorization: credentials.basic_auth(),
            content_type: match method {
                Method::Post => Some(FORM_CONTENT_TYPE),
                Method::Get => None,
            },
            body,
        }
    }
}

/// Status code and body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Mock transport for testing - connects directly to MockServer in-process
pub struct MockTransport {
    server: MockServer,
}

impl MockTransport {
    /// Create a new mock transport with an empty mock server
    pub fn new() -> Self {
        Self {
            server: MockServer::new(),
        }
    }

    /// Create a mock transport with a pre-configured server
    pub fn with_server(server: MockServer) -> Self {
        Self { server }
    }

    /// Get a reference to the underlying mock server for test configuration
    pub fn server(&self) -> &MockServer {
        &self.server
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.server.handle(request)
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Value of the User-Agent header
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            user_agent: format!("jenkins-lane/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP transport for production use
///
/// Owns a connection pool that lives as long as the transport. There is
/// no total-request timeout: only the connect phase is bounded, and the
/// completion waiter bounds the overall wait. Redirects are never
/// followed, so a 3xx reaches the caller as its own status.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a new HTTP transport, acquiring its connection pool
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(None)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        builder = builder.header(AUTHORIZATION, &request.authorization);
        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}
