//! Harness configuration.
//!
//! The harness reads the same YAML file the replication engine under test is
//! started with, and only looks at the `source` and `target` sections:
//!
//! ```yaml
//! source:
//!   addr: "127.0.0.1:6380"
//!   password: ""
//! target:
//!   type: redis
//!   seed: "127.0.0.1:6379"
//!   password: "secret"
//! ```

pub mod duration;
pub mod resolve;

pub use duration::parse_duration;
pub use resolve::{discover_from_processes, find_config_arg, resolve_config_path, ConfigSource};

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Store types the harness can talk to. All of them speak the Redis protocol.
const SUPPORTED_TARGET_TYPES: &[&str] = &["redis", "redis-standalone", "dragonfly", "valkey"];

/// Errors raised while locating or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No configuration file found (tried: {tried})")]
    NotFound { tried: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Connection settings for the source store.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// `host:port`
    pub addr: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Connection settings for the target store.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    #[serde(rename = "type", default = "default_target_type")]
    pub store_type: String,
    /// `host:port`; the replication engine's own config calls it `seed`.
    #[serde(alias = "seed")]
    pub addr: String,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_target_type() -> String {
    "redis".to_string()
}

/// The parts of the configuration file the harness uses.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    pub source: SourceConfig,
    pub target: TargetConfig,
}

impl HarnessConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: HarnessConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_addr("source.addr", &self.source.addr)?;
        validate_addr("target.addr", &self.target.addr)?;
        let store_type = self.target.store_type.to_ascii_lowercase();
        if !SUPPORTED_TARGET_TYPES.contains(&store_type.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "target.type '{}' is not supported (expected one of: {})",
                self.target.store_type,
                SUPPORTED_TARGET_TYPES.join(", ")
            )));
        }
        Ok(())
    }
}

fn validate_addr(field: &str, addr: &str) -> Result<(), ConfigError> {
    let valid = addr
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be host:port, got '{addr}'"
        )))
    }
}

/// Treat an empty password the same as no password.
pub fn password(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|p| !p.is_empty())
}
