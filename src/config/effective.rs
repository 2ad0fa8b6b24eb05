//! Effective configuration with provenance
//!
//! `LaneConfig` is the typed result of merging every layer, plus the list
//! of sources that contributed to it.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::host::Credentials;
use crate::timeout::TimeoutConfig;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;

/// Environment variables read by the env layer: (variable, section, key)
pub const ENV_VARS: &[(&str, &str, &str)] = &[
    ("JENKINS_URL", "server", "url"),
    ("JENKINS_USERNAME", "server", "username"),
    ("JENKINS_TOKEN", "server", "token"),
    ("JENKINS_JOB", "job", "name"),
];

/// Keys that contain secrets and should be redacted
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "api_key", "credential"];

const REDACTED: &str = "[REDACTED]";

/// Origin of a configuration source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    fn layer(origin: ConfigOrigin) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Jenkins API token is required (set JENKINS_TOKEN, pass --token, or set server.token in the config file)")]
    MissingToken,

    #[error("Jenkins server URL is required")]
    MissingUrl,
}

#[derive(Deserialize)]
struct RawConfig {
    server: RawServer,
    job: RawJob,
    timeouts: RawTimeouts,
}

#[derive(Deserialize)]
struct RawServer {
    url: String,
    username: String,
    #[serde(default)]
    token: String,
}

#[derive(Deserialize)]
struct RawJob {
    name: String,
    browser: String,
    csv_file: String,
    wait: bool,
}

#[derive(Deserialize)]
struct RawTimeouts {
    wait_minutes: Option<u64>,
    connect_timeout_seconds: Option<u64>,
}

/// Serializable view of the effective configuration with secrets masked
#[derive(Debug, Clone, Serialize)]
pub struct RedactedConfig {
    pub created_at: DateTime<Utc>,
    pub config: Value,
    pub sources: Vec<ConfigSource>,
    /// Dotted paths whose values were masked
    pub redactions: Vec<String>,
}

/// Effective, typed configuration
#[derive(Clone)]
pub struct LaneConfig {
    pub url: String,
    pub username: String,
    token: String,
    pub job: String,
    pub browser: String,
    pub csv_file: String,
    pub wait: bool,
    pub timeouts: TimeoutConfig,
    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
    merged: Value,
}

impl LaneConfig {
    /// Load from the process environment and the file system
    ///
    /// An explicit `config_path` must exist. Without one, the default
    /// path is used only when present.
    pub fn load(config_path: Option<&Path>, cli: Option<Value>) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Io(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|p| p.exists()),
        };

        let env = env_layer(|name| std::env::var(name).ok());
        Self::build(file.as_deref(), env, cli)
    }

    /// Build from explicit layers
    pub fn build(
        config_path: Option<&Path>,
        env: Option<Value>,
        cli: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource::layer(ConfigOrigin::Builtin)];

        if let Some(path) = config_path {
            let (value, digest) = load_toml_file(path)?;
            tracing::debug!(path = %path.display(), digest = %digest, "loaded config file");
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(env) = env {
            layers.push(env);
            sources.push(ConfigSource::layer(ConfigOrigin::Env));
        }

        if let Some(cli) = cli {
            layers.push(cli);
            sources.push(ConfigSource::layer(ConfigOrigin::Cli));
        }

        let merged = merge_layers(layers);
        let raw: RawConfig = serde_json::from_value(merged.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if raw.server.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }

        let timeouts = TimeoutConfig::from_config(
            raw.timeouts.wait_minutes,
            raw.timeouts.connect_timeout_seconds,
        );
        timeouts
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            url: raw.server.url,
            username: raw.server.username,
            token: raw.server.token,
            job: raw.job.name,
            browser: raw.job.browser,
            csv_file: raw.job.csv_file,
            wait: raw.job.wait,
            timeouts,
            sources,
            merged,
        })
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Credentials for the server; fails when no token was configured
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if !self.has_token() {
            return Err(ConfigError::MissingToken);
        }
        Ok(Credentials::new(self.username.clone(), self.token.clone()))
    }

    /// Get a merged value by dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.merged;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// The merged configuration with secret-like keys masked
    pub fn redacted(&self) -> RedactedConfig {
        let mut config = self.merged.clone();
        let mut redactions = Vec::new();
        redact_recursive(&mut config, "", &mut redactions);
        RedactedConfig {
            created_at: Utc::now(),
            config,
            sources: self.sources.clone(),
            redactions,
        }
    }
}

impl fmt::Debug for LaneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaneConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("token", &if self.has_token() { REDACTED } else { "" })
            .field("job", &self.job)
            .field("browser", &self.browser)
            .field("csv_file", &self.csv_file)
            .field("wait", &self.wait)
            .field("timeouts", &self.timeouts)
            .field("sources", &self.sources)
            .finish()
    }
}

/// `$HOME/.config/jenkins-lane/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("jenkins-lane")
            .join("config.toml")
    })
}

/// Build the environment layer from a variable lookup
///
/// Unset and empty variables are skipped. Returns None when nothing is set.
pub fn env_layer(lookup: impl Fn(&str) -> Option<String>) -> Option<Value> {
    let mut layer = Map::new();
    for (var, section, key) in ENV_VARS {
        let Some(value) = lookup(var).filter(|v| !v.is_empty()) else {
            continue;
        };
        let entry = layer
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), Value::String(value));
        }
    }
    if layer.is_empty() {
        None
    } else {
        Some(Value::Object(layer))
    }
}

/// Load and parse a TOML file, returning the value and digest
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

    let digest = hex::encode(Sha256::digest(&bytes));

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::Parse(format!("Invalid UTF-8: {}", e)))?;
    let table: toml::Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))?;

    Ok((toml_to_json(table), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn redact_recursive(value: &mut Value, path: &str, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let current_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                let key_lower = key.to_lowercase();
                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                if is_secret && !val.is_object() && !val.is_array() {
                    *val = Value::String(REDACTED.to_string());
                    redactions.push(current_path);
                } else {
                    redact_recursive(val, &current_path, redactions);
                }
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter_mut().enumerate() {
                redact_recursive(val, &format!("{}[{}]", path, i), redactions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env_of(vars: &[(&str, &str)]) -> Option<Value> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_layer(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_build_with_defaults_only() {
        let config = LaneConfig::build(None, None, None).unwrap();

        assert_eq!(config.url, "http://localhost:8080");
        assert_eq!(config.username, "admin");
        assert_eq!(config.job, "selenium-tests");
        assert_eq!(config.browser, "chrome");
        assert_eq!(config.csv_file, "src/test/resources/testdata.csv");
        assert!(config.wait);
        assert_eq!(config.timeouts, TimeoutConfig::default());
        assert!(!config.has_token());
        assert_eq!(config.sources, vec![ConfigSource::layer(ConfigOrigin::Builtin)]);
    }

    #[test]
    fn test_missing_token() {
        let config = LaneConfig::build(None, None, None).unwrap();
        assert!(matches!(config.credentials(), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn test_empty_url_rejected() {
        let cli = json!({"server": {"url": "  "}});
        assert!(matches!(
            LaneConfig::build(None, None, Some(cli)),
            Err(ConfigError::MissingUrl)
        ));
    }

    #[test]
    fn test_env_layer() {
        assert!(env_of(&[]).is_none());
        assert!(env_of(&[("JENKINS_TOKEN", "")]).is_none());

        let env = env_of(&[("JENKINS_URL", "http://ci:8080"), ("JENKINS_JOB", "nightly")]).unwrap();
        assert_eq!(env, json!({"server": {"url": "http://ci:8080"}, "job": {"name": "nightly"}}));
    }

    #[test]
    fn test_layer_precedence() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[server]").unwrap();
        writeln!(temp, "url = \"http://file:8080\"").unwrap();
        writeln!(temp, "username = \"file-user\"").unwrap();
        writeln!(temp, "[job]").unwrap();
        writeln!(temp, "name = \"from-file\"").unwrap();
        writeln!(temp, "browser = \"firefox\"").unwrap();

        let env = env_of(&[("JENKINS_URL", "http://env:8080"), ("JENKINS_TOKEN", "env-token")]);
        let cli = json!({"server": {"url": "http://cli:8080"}});

        let config = LaneConfig::build(Some(temp.path()), env, Some(cli)).unwrap();

        assert_eq!(config.url, "http://cli:8080");
        assert_eq!(config.username, "file-user");
        assert_eq!(config.job, "from-file");
        assert_eq!(config.browser, "firefox");
        assert!(config.has_token());

        let origins: Vec<_> = config.sources.iter().map(|s| s.origin).collect();
        assert_eq!(
            origins,
            vec![ConfigOrigin::Builtin, ConfigOrigin::File, ConfigOrigin::Env, ConfigOrigin::Cli]
        );
    }

    #[test]
    fn test_file_source_has_digest() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "[timeouts]\nwait_minutes = 5\n").unwrap();

        let config = LaneConfig::build(Some(temp.path()), None, None).unwrap();

        assert_eq!(config.timeouts.wait_minutes, 5);
        let digest = config.sources[1].digest.as_deref().unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(
            digest,
            hex::encode(Sha256::digest(b"[timeouts]\nwait_minutes = 5\n"))
        );
    }

    #[test]
    fn test_invalid_toml() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[server").unwrap();

        assert!(matches!(
            LaneConfig::build(Some(temp.path()), None, None),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let cli = json!({"job": {"wait": "yes"}});
        assert!(matches!(
            LaneConfig::build(None, None, Some(cli)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_timeout_validation() {
        let cli = json!({"timeouts": {"wait_minutes": 0}});
        let err = LaneConfig::build(None, None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("wait timeout"));

        let cli = json!({"timeouts": {"connect_timeout_seconds": 500}});
        let err = LaneConfig::build(None, None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("connect_timeout_seconds"));
    }

    #[test]
    fn test_explicit_missing_file() {
        let result = LaneConfig::load(Some(Path::new("/nonexistent/jenkins-lane.toml")), None);
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_redaction() {
        let cli = json!({
            "server": {"token": "11aa22bb"},
            "extra": {"api_key": "k", "note": "visible"}
        });
        let config = LaneConfig::build(None, None, Some(cli)).unwrap();

        let view = config.redacted();
        assert_eq!(view.config["server"]["token"], "[REDACTED]");
        assert_eq!(view.config["extra"]["api_key"], "[REDACTED]");
        assert_eq!(view.config["extra"]["note"], "visible");
        assert!(view.redactions.contains(&"server.token".to_string()));

        // The typed config still holds the real token
        assert_eq!(config.get("server.token"), Some(&json!("11aa22bb")));
    }

    #[test]
    fn test_debug_hides_token() {
        let cli = json!({"server": {"token": "11aa22bb"}});
        let config = LaneConfig::build(None, None, Some(cli)).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("11aa22bb"));
        assert!(debug.contains("[REDACTED]"));
    }
}
