//! Settings
//!
//! Loaded from a TOML file and then overridden by `SQLDOCTOR_*` environment
//! variables:
//!
//! ```toml
//! query_timeout_secs = 60
//!
//! [connection]
//! host = "db01"
//! database = "Sales"
//!
//! [analyzer]
//! dmv_top_n = 10
//! ```

use serde::{Deserialize, Serialize};
use sqldoctor_analyzer::AnalyzerConfig;
use sqldoctor_core::ConnectionConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_HOST: &str = "SQLDOCTOR_HOST";
pub const ENV_PORT: &str = "SQLDOCTOR_PORT";
pub const ENV_DATABASE: &str = "SQLDOCTOR_DATABASE";
pub const ENV_USER: &str = "SQLDOCTOR_USER";
pub const ENV_PASSWORD: &str = "SQLDOCTOR_PASSWORD";
pub const ENV_TRUST_CERT: &str = "SQLDOCTOR_TRUST_CERT";

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorSettings {
    pub connection: ConnectionConfig,
    pub analyzer: AnalyzerConfig,
    /// Upper bound on any single server round trip
    pub query_timeout_secs: u64,
}

impl Default for DoctorSettings {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            analyzer: AnalyzerConfig::default(),
            query_timeout_secs: 30,
        }
    }
}

impl DoctorSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Applies overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self, SettingsError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by the `SQLDOCTOR_*` names
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.connection.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.connection.port = port
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_PORT, &port))?;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.connection.database = Some(database);
        }
        if let Some(user) = lookup(ENV_USER) {
            self.connection.username = Some(user);
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.connection.password = Some(password);
        }
        if let Some(trust) = lookup(ENV_TRUST_CERT) {
            self.connection.trust_cert = parse_bool(&trust).ok_or_else(|| invalid(ENV_TRUST_CERT, &trust))?;
        }
        Ok(self)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }
}

fn invalid(key: &str, value: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
