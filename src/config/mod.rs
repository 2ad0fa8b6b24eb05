//! Configuration merge system
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, else ~/.config/jenkins-lane/config.toml)
//! 3. Environment (JENKINS_URL, JENKINS_USERNAME, JENKINS_TOKEN, JENKINS_JOB)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{BuiltinDefaults, DEFAULT_CSV_FILE, DEFAULT_JOB, DEFAULT_URL};
pub use effective::{
    default_config_path, env_layer, ConfigError, ConfigOrigin, ConfigSource, LaneConfig,
    RedactedConfig, ENV_VARS,
};
pub use merge::{deep_merge, merge_layers};
