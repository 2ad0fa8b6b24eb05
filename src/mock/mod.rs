//! Mock Server Implementation
//!
//! Implements a configurable in-process stand-in for the upstream REST API
//! used by unit and integration tests.
//!
//! # Routes
//!
//! - `POST job/{name}/build`: start a build following the job's script
//! - `POST job/{name}/buildWithParameters`: same, recording the form body
//! - `GET job/{name}/api/json`: job metadata with `lastBuild`
//! - `GET job/{name}/{number|lastBuild}/api/json`: build status; each poll
//!   advances the build's script by one step
//! - `GET job/{name}/{number|lastBuild}/consoleText`: console log
//! - `GET api/json?tree=...`: every job in registration order

mod failure;
mod server;
mod state;

pub use failure::{FailureConfig, FailureInjector, Route};
pub use server::{MockServer, MOCK_BASE_URL};
pub use state::{BuildScript, MockBuild, MockJob, MockState};
