//! Tests for configuration loading and wiring.
//!
//! Configuration tests mutate process environment variables and therefore
//! run serially.

use super::*;
use serial_test::serial;
use std::io::Write;

const MANAGED_VARS: &[&str] = &[
    CONFIG_FILE_ENV,
    "LUM__SERVER__PORT",
    "LUM__AUTH__JWT_SECRET",
    "LUM__HEALTH_CHECKS__ENABLED",
    "PORT",
    "MONGODB_URI",
    "N8N_BASE_URL",
    "N8N_API_KEY",
    "WEBHOOK_BASE_URL",
    "JWT_SECRET",
    "LOGGING_LEVEL",
    "ENABLE_HEALTH_CHECKS",
    "HEALTH_CHECK_INTERVAL",
];

/// Clears every variable the loader reads, before and after the test
struct EnvGuard;

impl EnvGuard {
    fn new() -> Self {
        clear_managed_vars();
        Self
    }

    fn set(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        clear_managed_vars();
    }
}

fn clear_managed_vars() {
    for name in MANAGED_VARS {
        std::env::remove_var(name);
    }
}

fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ============================================================================
// load_config
// ============================================================================

#[test]
#[serial]
fn test_explicit_file_is_loaded() {
    let env = EnvGuard::new();
    let file = yaml_file(
        r#"
server:
  port: 8081
auth:
  jwt_secret: from-file
relay:
  n8n_base_url: http://engine.internal:5678
"#,
    );
    env.set(CONFIG_FILE_ENV, file.path().to_str().unwrap());

    let config = load_config().unwrap();

    assert_eq!(config.server.port, 8081);
    assert_eq!(config.auth.jwt_secret, "from-file");
    assert_eq!(config.relay.n8n_base_url, "http://engine.internal:5678");
    assert_eq!(config.storage.backend, StorageBackend::Filesystem);
}

#[test]
#[serial]
fn test_prefixed_env_overrides_file() {
    let env = EnvGuard::new();
    let file = yaml_file("server:\n  port: 8081\nauth:\n  jwt_secret: from-file\n");
    env.set(CONFIG_FILE_ENV, file.path().to_str().unwrap());
    env.set("LUM__SERVER__PORT", "9090");
    env.set("LUM__HEALTH_CHECKS__ENABLED", "false");

    let config = load_config().unwrap();

    assert_eq!(config.server.port, 9090);
    assert!(!config.health_checks.enabled);
}

#[test]
#[serial]
fn test_flat_variables_override_everything() {
    let env = EnvGuard::new();
    env.set("LUM__SERVER__PORT", "9090");
    env.set("PORT", "7070");
    env.set("JWT_SECRET", "flat-secret");
    env.set("WEBHOOK_BASE_URL", "https://hooks.example.com");
    env.set("HEALTH_CHECK_INTERVAL", "60000");

    let config = load_config().unwrap();

    assert_eq!(config.server.port, 7070);
    assert_eq!(config.auth.jwt_secret, "flat-secret");
    assert_eq!(config.relay.public_base_url, "https://hooks.example.com");
    assert_eq!(config.health_checks.interval_ms, 60000);
}

#[test]
#[serial]
fn test_missing_jwt_secret_is_rejected() {
    let _env = EnvGuard::new();

    let result = load_config();

    assert!(matches!(result, Err(ConfigError::Missing { key }) if key == "auth.jwt_secret"));
}

#[test]
#[serial]
fn test_missing_explicit_file_is_a_load_error() {
    let env = EnvGuard::new();
    env.set(CONFIG_FILE_ENV, "/nonexistent/lum-relay/service.yaml");
    env.set("JWT_SECRET", "secret");

    let result = load_config();

    assert!(matches!(result, Err(ConfigError::Load { .. })));
}

#[test]
#[serial]
fn test_unparsable_flat_variable_is_invalid() {
    let env = EnvGuard::new();
    env.set("JWT_SECRET", "secret");
    env.set("PORT", "not-a-port");

    let result = load_config();

    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

// ============================================================================
// Wiring
// ============================================================================

#[tokio::test]
async fn test_build_store_memory() {
    let storage = StorageConfig {
        backend: StorageBackend::Memory,
        ..StorageConfig::default()
    };

    let store = build_store(&storage).await.unwrap();

    assert!(store.ping().await.is_ok());
}

#[tokio::test]
async fn test_build_store_filesystem_creates_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("webhooks");
    let storage = StorageConfig {
        backend: StorageBackend::Filesystem,
        data_dir: data_dir.clone(),
        ..StorageConfig::default()
    };

    let store = build_store(&storage).await.unwrap();

    assert!(store.ping().await.is_ok());
    assert!(data_dir.exists());
}

#[tokio::test]
async fn test_build_state_wires_monitor_settings() {
    let mut config = ServiceConfig::default();
    config.auth.jwt_secret = "secret".to_string();
    config.storage.backend = StorageBackend::Memory;
    config.health_checks.enabled = false;

    let state = build_state(config).await.unwrap();

    assert!(!state.monitor.start().await);
    assert!(!state.monitor.is_running().await);
}
