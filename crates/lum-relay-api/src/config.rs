//! Configuration types for the HTTP service
//!
//! Every section carries serde defaults so a partially specified file (or no
//! file at all) still yields a complete [`ServiceConfig`]. Call
//! [`ServiceConfig::validate`] before wiring the service.

use crate::errors::ConfigError;
use lum_relay_core::{MonitorSettings, ServiceSettings, TransportSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Downstream engine and public URL settings
    pub relay: RelayConfig,

    /// Management API authentication
    pub auth: AuthConfig,

    /// Webhook config persistence
    pub storage: StorageConfig,

    /// Periodic downstream health checks
    pub health_checks: HealthCheckConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub enable_cors: bool,

    /// Enable compression
    pub enable_compression: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
            enable_cors: true,
            enable_compression: true,
        }
    }
}

/// Downstream relay configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Base URL of the automation engine
    pub n8n_base_url: String,

    /// API key sent to the engine, if any
    pub n8n_api_key: Option<String>,

    /// Base of the public webhook URLs handed to users
    pub public_base_url: String,

    /// Forward timeout in milliseconds; unset waits indefinitely
    pub forward_timeout_ms: Option<u64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            n8n_base_url: "http://localhost:5678".to_string(),
            n8n_api_key: None,
            public_base_url: "http://localhost:3000".to_string(),
            forward_timeout_ms: None,
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("n8n_base_url", &self.n8n_base_url)
            .field("n8n_api_key", &self.n8n_api_key.as_ref().map(|_| "<REDACTED>"))
            .field("public_base_url", &self.public_base_url)
            .field("forward_timeout_ms", &self.forward_timeout_ms)
            .finish()
    }
}

/// Management API authentication
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<REDACTED>")
            .finish()
    }
}

/// Store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Filesystem,
    Mongodb,
}

/// Webhook config persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Directory for the filesystem backend
    pub data_dir: PathBuf,

    /// Connection string for the MongoDB backend
    pub mongodb_uri: Option<String>,

    /// Database name for the MongoDB backend
    pub database: String,

    /// Collection name for the MongoDB backend
    pub collection: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: PathBuf::from("./data"),
            mongodb_uri: None,
            database: "lum".to_string(),
            collection: "webhook_configs".to_string(),
        }
    }
}

/// Health check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub enabled: bool,

    /// Interval between ticks in milliseconds
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds
    pub probe_timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5 * 60 * 1000,
            probe_timeout_ms: 5000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

// ============================================================================
// Validation and conversion
// ============================================================================

fn check_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Invalid {
        message: format!("{key} is not a valid URL ({value}): {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            message: format!("{key} must use http or https, got '{other}'"),
        }),
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        message: format!("{name} has an invalid value: '{value}'"),
    })
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Missing`] when the JWT secret or MongoDB URI is absent
    /// - [`ConfigError::Invalid`] for a zero port, zero interval or malformed URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be greater than zero".to_string(),
            });
        }

        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "auth.jwt_secret".to_string(),
            });
        }

        check_url("relay.n8n_base_url", &self.relay.n8n_base_url)?;
        check_url("relay.public_base_url", &self.relay.public_base_url)?;

        if self.health_checks.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "health_checks.interval_ms must be greater than zero".to_string(),
            });
        }

        if self.storage.backend == StorageBackend::Mongodb
            && self
                .storage
                .mongodb_uri
                .as_deref()
                .map_or(true, |uri| uri.trim().is_empty())
        {
            return Err(ConfigError::Missing {
                key: "storage.mongodb_uri".to_string(),
            });
        }

        Ok(())
    }

    /// Apply the flat deployment variables (`PORT`, `MONGODB_URI`, ...)
    ///
    /// `lookup` returns the value of a variable, if set. Values override
    /// anything loaded from files or `LUM__` variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a numeric or boolean variable
    /// cannot be parsed.
    pub fn apply_legacy_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(uri) = lookup("MONGODB_URI") {
            self.storage.mongodb_uri = Some(uri);
            self.storage.backend = StorageBackend::Mongodb;
        }
        if let Some(url) = lookup("N8N_BASE_URL") {
            self.relay.n8n_base_url = url;
        }
        if let Some(key) = lookup("N8N_API_KEY") {
            self.relay.n8n_api_key = Some(key);
        }
        if let Some(url) = lookup("WEBHOOK_BASE_URL") {
            self.relay.public_base_url = url;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(level) = lookup("LOGGING_LEVEL") {
            self.logging.level = level;
        }
        if let Some(enabled) = lookup("ENABLE_HEALTH_CHECKS") {
            self.health_checks.enabled = parse_env("ENABLE_HEALTH_CHECKS", &enabled)?;
        }
        if let Some(interval) = lookup("HEALTH_CHECK_INTERVAL") {
            self.health_checks.interval_ms = parse_env("HEALTH_CHECK_INTERVAL", &interval)?;
        }
        Ok(())
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            public_base_url: self.relay.public_base_url.clone(),
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            forward_timeout: self.relay.forward_timeout_ms.map(Duration::from_millis),
            probe_timeout: Duration::from_millis(self.health_checks.probe_timeout_ms),
            api_key: self.relay.n8n_api_key.clone(),
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            enabled: self.health_checks.enabled,
            interval: Duration::from_millis(self.health_checks.interval_ms),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
