//! Uniform outcome of trigger, wait and run operations
//!
//! Expected negative outcomes (rejected trigger, failed build, timeout)
//! are values, not errors.

use jenkins_protocol::BuildStatus;
use serde::Serialize;

/// Success flag, message, and the build the outcome refers to (if any)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrchestrationResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildStatus>,
}

impl OrchestrationResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            build: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            build: None,
        }
    }

    /// Attach the build the outcome refers to
    pub fn with_build(mut self, build: BuildStatus) -> Self {
        self.build = Some(build);
        self
    }

    /// `✓` or `✗`, as shown by interactive front-ends
    pub fn glyph(&self) -> char {
        if self.success {
            '✓'
        } else {
            '✗'
        }
    }

    /// Process exit code for automated runners
    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }
}

impl std::fmt::Display for OrchestrationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.glyph(), self.message)
    }
}
