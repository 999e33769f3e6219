//! Common test utilities for lum-relay-api integration tests
//!
//! This module provides:
//! - A fully wired router over an in-memory store and the real HTTP transport
//! - Token and request builders
//! - Shared payload fixtures

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use lum_relay_api::{create_router, AppState, Claims, ServiceConfig, ServiceMetrics};
use lum_relay_core::{
    HealthMonitor, HttpDownstreamTransport, InMemoryWebhookConfigStore, MonitorSettings,
    StubAutomationEngine, WebhookConfigStore, WebhookService,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const PUBLIC_BASE_URL: &str = "https://hooks.example.com";

// ============================================================================
// Test Application
// ============================================================================

/// A wired application plus handles on its collaborators
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn WebhookConfigStore>,
    pub monitor: Arc<HealthMonitor>,
    pub metrics: Arc<ServiceMetrics>,
}

/// Build an application whose automation engine lives at `engine_base_url`
#[allow(dead_code)]
pub fn spawn_app(engine_base_url: &str) -> TestApp {
    spawn_app_with_store(engine_base_url, Arc::new(InMemoryWebhookConfigStore::new()))
}

/// Build an application over a caller-supplied store
pub fn spawn_app_with_store(engine_base_url: &str, store: Arc<dyn WebhookConfigStore>) -> TestApp {
    let mut config = ServiceConfig::default();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.relay.n8n_base_url = engine_base_url.to_string();
    config.relay.public_base_url = PUBLIC_BASE_URL.to_string();
    config.relay.forward_timeout_ms = Some(2_000);
    config.health_checks.probe_timeout_ms = 500;

    let metrics = ServiceMetrics::new().unwrap();
    let transport = Arc::new(HttpDownstreamTransport::new(config.transport_settings()).unwrap());

    let service = WebhookService::new(
        store.clone(),
        Arc::new(StubAutomationEngine::new(engine_base_url)),
        transport.clone(),
        metrics.clone(),
        config.service_settings(),
    );

    let monitor = Arc::new(HealthMonitor::new(
        store.clone(),
        transport,
        metrics.clone(),
        MonitorSettings {
            enabled: true,
            interval: Duration::from_secs(60),
        },
    ));

    let state = AppState::new(config, service, monitor.clone(), metrics.clone());

    TestApp {
        router: create_router(state),
        store,
        monitor,
        metrics,
    }
}

// ============================================================================
// Requests
// ============================================================================

/// `Authorization` header value for `user`
pub fn bearer(user: &str) -> String {
    let token = encode(
        &Header::default(),
        &Claims {
            sub: user.to_string(),
            exp: None,
        },
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

pub fn json_request(method: &str, uri: &str, user: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::empty()).unwrap()
}

/// Send a request and decode the JSON response body (`Null` when not JSON)
pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

// ============================================================================
// Fixtures
// ============================================================================

/// Create a webhook for `user` through the API and return its ID
pub async fn create_webhook(app: &TestApp, user: &str, selected: &[&str]) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/webhooks",
            Some(user),
            &json!({
                "workspaceId": "ws-1",
                "name": "Inbound calls",
                "description": "Calls from the tracking platform",
                "selectedParameters": selected,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body["data"]["webhookId"].as_str().unwrap().to_string()
}

/// A call-completion payload carrying every required parameter
#[allow(dead_code)]
pub fn call_payload() -> Value {
    json!({
        "campaign_name": "Spring Promo",
        "campaign_id": "cmp-001",
        "recording_url": "https://recordings.example.com/call-1.mp3",
        "caller_id": "+15550100",
        "duration": 184,
        "internal_notes": "not for forwarding",
    })
}
