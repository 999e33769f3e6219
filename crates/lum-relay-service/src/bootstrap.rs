//! Process bootstrap: configuration loading, logging and dependency wiring.

use anyhow::Context;
use lum_relay_api::{
    AppState, ConfigError, LoggingConfig, ServiceConfig, ServiceMetrics, StartupError,
    StorageBackend, StorageConfig,
};
use lum_relay_core::{
    FilesystemWebhookConfigStore, HealthMonitor, HttpDownstreamTransport,
    InMemoryWebhookConfigStore, StubAutomationEngine, WebhookConfigStore, WebhookService,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable naming an explicit configuration file
pub const CONFIG_FILE_ENV: &str = "LUM_CONFIG_FILE";

/// Prefix for structured environment overrides, e.g. `LUM__SERVER__PORT`
pub const ENV_PREFIX: &str = "LUM";

// ============================================================================
// Configuration
// ============================================================================

/// Load, override and validate the service configuration
///
/// Sources, later wins:
///  1. `/etc/lum-relay/service.yaml`
///  2. `./config/service.yaml`
///  3. the file named by `LUM_CONFIG_FILE` (required when set)
///  4. `LUM__SECTION__KEY` environment variables
///  5. the flat deployment variables (`PORT`, `JWT_SECRET`, ...)
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    let explicit_path = std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|path| !path.is_empty());

    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/lum-relay/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = &explicit_path {
        builder = builder.add_source(config::File::with_name(path).required(true));
    }

    let loaded = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

    let mut service_config: ServiceConfig =
        loaded.try_deserialize().map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

    service_config.apply_legacy_env(|name| std::env::var(name).ok())?;
    service_config.validate()?;

    if let Some(path) = explicit_path {
        info!(path = %path, "Loaded configuration from explicit path");
    }

    Ok(service_config)
}

// ============================================================================
// Logging
// ============================================================================

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `logging.level` when set.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// Open the configured webhook config store
pub async fn build_store(
    storage: &StorageConfig,
) -> Result<Arc<dyn WebhookConfigStore>, StartupError> {
    let store: Arc<dyn WebhookConfigStore> = match storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory webhook store; configurations are lost on restart");
            Arc::new(InMemoryWebhookConfigStore::new())
        }
        StorageBackend::Filesystem => {
            let store = FilesystemWebhookConfigStore::open(storage.data_dir.clone())
                .await
                .map_err(|e| StartupError::StoreFailed {
                    message: e.to_string(),
                })?;
            Arc::new(store)
        }
        StorageBackend::Mongodb => connect_mongodb(storage).await?,
    };

    Ok(store)
}

#[cfg(feature = "mongodb")]
async fn connect_mongodb(
    storage: &StorageConfig,
) -> Result<Arc<dyn WebhookConfigStore>, StartupError> {
    use lum_relay_core::adapters::MongoWebhookConfigStore;

    let uri = storage
        .mongodb_uri
        .as_deref()
        .ok_or_else(|| ConfigError::Missing {
            key: "storage.mongodb_uri".to_string(),
        })?;

    let store = MongoWebhookConfigStore::connect(uri, &storage.database, &storage.collection)
        .await
        .map_err(|e| StartupError::StoreFailed {
            message: e.to_string(),
        })?;
    info!(database = %storage.database, collection = %storage.collection, "Connected to MongoDB");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongodb"))]
async fn connect_mongodb(
    _storage: &StorageConfig,
) -> Result<Arc<dyn WebhookConfigStore>, StartupError> {
    Err(StartupError::Configuration(ConfigError::Invalid {
        message: "storage.backend 'mongodb' requires the 'mongodb' feature".to_string(),
    }))
}

/// Build the full application state from a validated configuration
pub async fn build_state(config: ServiceConfig) -> Result<AppState, StartupError> {
    let store = build_store(&config.storage).await?;

    let metrics = ServiceMetrics::new()
        .context("registering Prometheus metrics")
        .map_err(|e| StartupError::ServerFailed {
            message: format!("{e:#}"),
        })?;

    let transport = HttpDownstreamTransport::new(config.transport_settings())
        .context("building downstream HTTP client")
        .map_err(|e| StartupError::Configuration(ConfigError::Invalid {
            message: format!("{e:#}"),
        }))?;
    let transport = Arc::new(transport);

    let engine = Arc::new(StubAutomationEngine::new(&config.relay.n8n_base_url));

    let service = WebhookService::new(
        store.clone(),
        engine,
        transport.clone(),
        metrics.clone(),
        config.service_settings(),
    );

    let monitor = Arc::new(HealthMonitor::new(
        store,
        transport,
        metrics.clone(),
        config.monitor_settings(),
    ));

    Ok(AppState::new(config, service, monitor, metrics))
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
