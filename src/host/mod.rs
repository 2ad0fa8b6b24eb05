//! Host-Side Components
//!
//! Implements the client side of the upstream REST API: credentials,
//! transport, and the orchestration operations built on them.

pub mod auth;
pub mod client;
pub mod result;
pub mod transport;

pub use auth::Credentials;
pub use client::{OrchestrationClient, CONSOLE_FETCH_ERROR, CONSOLE_FETCH_FAILED};
pub use result::OrchestrationResult;
pub use transport::{
    HttpConfig, HttpRequest, HttpResponse, HttpTransport, MockTransport, Transport, TransportError,
};
