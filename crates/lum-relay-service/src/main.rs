//! # Lum Relay Service
//!
//! Binary entry point for the webhook relay.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes structured logging
//! - Opens the webhook config store and wires the relay service
//! - Runs the downstream health monitor alongside the HTTP server
//!
//! Exit codes: 1 bind failure, 2 server failure, 3 configuration error,
//! 4 store initialization failure.

mod bootstrap;

use lum_relay_api::{start_server, LoggingConfig, StartupError};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let loaded = bootstrap::load_config();

    // Logging is needed to report a bad configuration, so fall back to defaults
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    bootstrap::init_logging(&logging);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Lum relay service");

    let config = match loaded {
        Ok(config) => config,
        Err(e) => exit_with(StartupError::from(e)),
    };

    info!(
        host = %config.server.host,
        port = config.server.port,
        storage = ?config.storage.backend,
        health_checks = config.health_checks.enabled,
        "Configuration loaded"
    );

    let state = match bootstrap::build_state(config).await {
        Ok(state) => state,
        Err(e) => exit_with(e),
    };

    let monitor = state.monitor.clone();
    monitor.start().await;

    let result = start_server(state).await;

    monitor.stop().await;

    if let Err(e) = result {
        exit_with(e);
    }

    info!("Lum relay service stopped");
}

fn exit_with(e: StartupError) -> ! {
    error!(error = %e, exit_code = e.exit_code(), "Service failed");
    std::process::exit(e.exit_code());
}
