//! Oracle configuration: a toml file with environment overrides.
//!
//! Priority: environment variables > config file > defaults. With no
//! endpoint configured the oracle is disabled and every extraction
//! uses the deterministic path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    oracle: OracleConfig,
}

/// Default config file location: `$FLOAT_CONFIG` or
/// `~/.config/floatctl/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("FLOAT_CONFIG") {
        return PathBuf::from(path);
    }
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".config")
        .join("floatctl")
        .join("config.toml")
}

/// Load oracle config from a file (missing file is fine) and apply
/// environment overrides.
pub fn load_oracle_config(path: &Path) -> OracleConfig {
    let mut config = match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => file.oracle,
            Err(e) => {
                tracing::warn!("ignoring malformed config {}: {e}", path.display());
                OracleConfig::default()
            }
        },
        Err(_) => OracleConfig::default(),
    };

    if let Ok(endpoint) = std::env::var("FLOAT_ORACLE_URL") {
        config.endpoint = Some(endpoint);
    }
    if let Ok(model) = std::env::var("FLOAT_ORACLE_MODEL") {
        config.model = Some(model);
    }
    if let Ok(key) = std::env::var("FLOAT_ORACLE_KEY") {
        config.api_key = Some(key);
    }
    if let Ok(secs) = std::env::var("FLOAT_ORACLE_TIMEOUT_SECS")
        && let Ok(secs) = secs.parse()
    {
        config.timeout_secs = Some(secs);
    }

    config
}
