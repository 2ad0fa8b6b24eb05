//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

pub const DEFAULT_URL: &str = "http://localhost:8080";
pub const DEFAULT_JOB: &str = "selenium-tests";
pub const DEFAULT_CSV_FILE: &str = "src/test/resources/testdata.csv";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    pub url: String,
    pub username: String,
    /// Empty: a token must come from a later layer
    pub token: String,
    pub job: String,
    pub browser: String,
    pub csv_file: String,
    pub wait: bool,
    pub wait_minutes: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: "admin".to_string(),
            token: String::new(),
            job: DEFAULT_JOB.to_string(),
            browser: "chrome".to_string(),
            csv_file: DEFAULT_CSV_FILE.to_string(),
            wait: true,
            wait_minutes: 30,
            connect_timeout_seconds: 30,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "server": {
                "url": self.url,
                "username": self.username,
                "token": self.token
            },
            "job": {
                "name": self.job,
                "browser": self.browser,
                "csv_file": self.csv_file,
                "wait": self.wait
            },
            "timeouts": {
                "wait_minutes": self.wait_minutes,
                "connect_timeout_seconds": self.connect_timeout_seconds
            }
        })
    }
}
