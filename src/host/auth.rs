//! Basic-auth credentials
//!
//! The API token is a secret: it is only ever rendered inside the
//! `Authorization` header and is redacted from `Debug` output.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Username + API token pair for HTTP Basic authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether a token was supplied at all
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// `Basic base64(username:token)`, computed fresh for each request
    pub fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.username, self.token);
        format!("Basic {}", STANDARD.encode(raw.as_bytes()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
