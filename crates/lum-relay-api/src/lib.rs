//! # Lum Relay HTTP Service
//!
//! HTTP surface of the webhook relay.
//!
//! This crate provides:
//! - Public ingestion endpoint `POST /{userId}/webhook/{webhookId}`
//! - Bearer-authenticated management API under `/api/webhooks`
//! - Health and Prometheus endpoints
//! - Server startup with graceful shutdown

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod responses;

pub use auth::{AuthenticatedUser, Claims, JwtVerifier};
pub use config::{
    AuthConfig, HealthCheckConfig, LoggingConfig, RelayConfig, ServerConfig, ServiceConfig,
    StorageBackend, StorageConfig,
};
pub use errors::{ApiError, ConfigError, StartupError};
pub use metrics::ServiceMetrics;

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, State},
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use lum_relay_core::{HealthMonitor, WebhookService};
use std::future::{Future, IntoFuture};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

/// Header used to correlate a request across log lines
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Webhook orchestration service
    pub service: WebhookService,

    /// Downstream health monitor
    pub monitor: Arc<HealthMonitor>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,

    /// Bearer token verifier for the management API
    pub auth: JwtVerifier,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        service: WebhookService,
        monitor: Arc<HealthMonitor>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        let auth = JwtVerifier::new(&config.auth.jwt_secret);
        Self {
            config: Arc::new(config),
            service,
            monitor,
            metrics,
            auth,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let management_routes = Router::new()
        .route(
            "/api/webhooks",
            post(handlers::create_webhook).get(handlers::list_webhooks),
        )
        .route(
            "/api/webhooks/{webhook_id}",
            get(handlers::get_webhook)
                .put(handlers::update_webhook)
                .delete(handlers::delete_webhook),
        )
        .route("/api/webhooks/{webhook_id}/test", post(handlers::test_webhook))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let ingestion_routes =
        Router::new().route("/{user_id}/webhook/{webhook_id}", post(handlers::ingest_webhook));

    let operational_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/health/webhooks", get(handlers::webhook_health))
        .route("/metrics", get(handlers::metrics_endpoint));

    let server = &state.config.server;
    let mut router = Router::new()
        .merge(management_routes)
        .merge(ingestion_routes)
        .merge(operational_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(server.max_body_size));

    if server.enable_compression {
        router = router.layer(CompressionLayer::new());
    }
    if server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

/// Bind the configured address and serve until a shutdown signal arrives
pub async fn start_server(state: AppState) -> Result<(), StartupError> {
    let server = &state.config.server;
    let address = format!("{}:{}", server.host, server.port);
    let addr: SocketAddr = address.parse().map_err(|_| {
        StartupError::Configuration(ConfigError::Invalid {
            message: format!("Invalid listen address: {}", address),
        })
    })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| StartupError::BindFailed {
            address: addr.to_string(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", addr);
    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` completes
///
/// In-flight requests get `server.shutdown_timeout_seconds` to finish once
/// `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let drain_timeout = Duration::from_secs(state.config.server.shutdown_timeout_seconds);
    let app = create_router(state);

    let (signalled_tx, mut signalled_rx) = tokio::sync::watch::channel(false);
    let graceful = async move {
        shutdown.await;
        let _ = signalled_tx.send(true);
    };

    let drain_deadline = async move {
        if signalled_rx.changed().await.is_ok() {
            tokio::time::sleep(drain_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = axum::serve(listener, app).with_graceful_shutdown(graceful).into_future() => {
            result.map_err(|e| StartupError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!(
                timeout_secs = drain_timeout.as_secs(),
                "Graceful shutdown timed out; dropping in-flight requests"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Reuses the caller's `x-correlation-id` or generates one, records it on
/// the span, and echoes it on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| lum_relay_core::CorrelationId::new().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }

    let status = response.status();
    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

/// Records request count and latency labelled by route template
///
/// The matched route (`/{user_id}/webhook/{webhook_id}`) is used rather than
/// the raw path so user and webhook IDs never become label values.
async fn metrics_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    state
        .metrics
        .record_http_request(&method, &route, response.status().as_u16(), start.elapsed());
    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
