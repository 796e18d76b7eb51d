//! Configuration settings for the validator.

use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::auth::Credentials;
use crate::error::{ConfigErrorKind, ValidateError};
use crate::quorum::QuorumMode;
use crate::validate::{HostPool, DEFAULT_HOSTS};

/// Main configuration structure.
///
/// Every section is optional; a missing file section uses its defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub hosts: HostsConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub quorum: QuorumConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API credentials.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    /// Base64-encoded API key.
    pub api_key: Option<String>,
    /// Client ID (string or integer in the file).
    #[serde(default, deserialize_with = "deserialize_client_id")]
    pub client_id: Option<String>,
}

/// Validation hosts.
#[derive(Debug, Clone, Deserialize)]
pub struct HostsConfig {
    /// Hostnames queried, in order. The first one serves single-host checks.
    #[serde(default = "default_pool")]
    pub pool: Vec<String>,
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Use https (true) or plain http (false).
    #[serde(default = "default_secure")]
    pub secure: bool,
    /// Per-request timeout in milliseconds. Timed out hosts are dropped.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// TCP/TLS connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

/// Quorum configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QuorumConfig {
    /// "all" (every host must agree) or "first" (fastest host decides).
    #[serde(default)]
    pub mode: QuorumMode,
    /// Query every host in the pool instead of one.
    #[serde(default)]
    pub multi_host: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_pool() -> Vec<String> {
    DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect()
}

fn default_secure() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    5000
}

fn default_connect_timeout() -> u64 {
    2000
}

fn default_max_body_size() -> usize {
    65_536
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            pool: default_pool(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            secure: default_secure(),
            request_timeout_ms: default_request_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn deserialize_client_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ClientId {
        Text(String),
        Number(u64),
    }

    Ok(Option::<ClientId>::deserialize(deserializer)?.map(|id| match id {
        ClientId::Text(text) => text,
        ClientId::Number(number) => number.to_string(),
    }))
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ValidateError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidateError::config(ConfigErrorKind::File {
                message: format!("Failed to read config file '{}': {}", path.display(), e),
            })
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| {
            ValidateError::config(ConfigErrorKind::File {
                message: format!("Failed to parse config file '{}': {}", path.display(), e),
            })
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ValidateError> {
        let invalid = |message: String| ValidateError::config(ConfigErrorKind::Invalid { message });

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "Invalid log level '{}'. Valid levels: {:?}",
                self.logging.level, valid_levels
            )));
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "Invalid log format '{}'. Valid formats: {:?}",
                self.logging.format, valid_formats
            )));
        }

        if self.transport.request_timeout_ms == 0 || self.transport.connect_timeout_ms == 0 {
            return Err(invalid("Transport timeouts must be greater than zero".to_string()));
        }

        self.host_pool()?;

        Ok(())
    }

    /// Build credentials from the `[credentials]` section.
    ///
    /// A missing client ID is left empty and rejected when a check runs.
    pub fn credentials(&self) -> Result<Credentials, ValidateError> {
        let api_key = self
            .credentials
            .api_key
            .as_deref()
            .ok_or_else(|| ValidateError::config(ConfigErrorKind::InvalidApiKey))?;

        Credentials::new(api_key, self.credentials.client_id.clone().unwrap_or_default())
    }

    /// Build the host pool from the `[hosts]` section.
    pub fn host_pool(&self) -> Result<HostPool, ValidateError> {
        HostPool::new(self.hosts.pool.iter().cloned())
    }
}
