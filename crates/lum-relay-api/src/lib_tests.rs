//! Router-level tests for the HTTP layer.

use super::*;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use jsonwebtoken::{encode, EncodingKey, Header};
use lum_relay_core::{
    DownstreamError, DownstreamTransport, ForwardResponse, InMemoryWebhookConfigStore,
    MonitorSettings, StubAutomationEngine, WebhookId,
};
use serde_json::{json, Map, Value};
use std::sync::Mutex;
use tower::ServiceExt;

const SECRET: &str = "router-test-secret";

// ============================================================================
// Test Doubles
// ============================================================================

/// Transport that records forwarded payloads and answers with a fixed body
#[derive(Default)]
struct RecordingTransport {
    forwarded: Mutex<Vec<(String, Map<String, Value>)>>,
}

#[async_trait]
impl DownstreamTransport for RecordingTransport {
    async fn forward(
        &self,
        url: &str,
        _webhook_id: &WebhookId,
        payload: &Map<String, Value>,
    ) -> Result<ForwardResponse, DownstreamError> {
        self.forwarded
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        Ok(ForwardResponse {
            status: 200,
            body: json!({"received": true}),
        })
    }

    async fn probe(&self, _url: &str) -> Result<(), DownstreamError> {
        Ok(())
    }
}

struct Harness {
    router: Router,
    transport: Arc<RecordingTransport>,
}

fn app_state(transport: Arc<RecordingTransport>) -> AppState {
    let mut config = ServiceConfig::default();
    config.auth.jwt_secret = SECRET.to_string();
    config.relay.public_base_url = "https://hooks.example.com".to_string();

    let store = Arc::new(InMemoryWebhookConfigStore::new());
    let metrics = ServiceMetrics::new().unwrap();

    let service = WebhookService::new(
        store.clone(),
        Arc::new(StubAutomationEngine::new("http://engine.internal")),
        transport.clone(),
        metrics.clone(),
        config.service_settings(),
    );
    let monitor = Arc::new(HealthMonitor::new(
        store,
        transport,
        metrics.clone(),
        MonitorSettings::default(),
    ));

    AppState::new(config, service, monitor, metrics)
}

fn harness() -> Harness {
    let transport = Arc::new(RecordingTransport::default());
    Harness {
        router: create_router(app_state(transport.clone())),
        transport,
    }
}

fn bearer(user: &str) -> String {
    let token = encode(
        &Header::default(),
        &Claims {
            sub: user.to_string(),
            exp: None,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn create(router: &Router, user: &str) -> String {
    let (status, body) = send(
        router,
        json_request(
            "POST",
            "/api/webhooks",
            Some(user),
            json!({
                "workspaceId": "ws-1",
                "name": "Inbound calls",
                "selectedParameters": ["campaign_name", "caller_id"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["webhookId"].as_str().unwrap().to_string()
}

// ============================================================================
// Management API
// ============================================================================

#[tokio::test]
async fn test_management_requires_bearer_token() {
    let h = harness();

    let (status, body) = send(&h.router, empty_request("GET", "/api/webhooks", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_management_rejects_bad_token() {
    let h = harness();
    let request = Request::builder()
        .uri("/api/webhooks")
        .header(header::AUTHORIZATION, "Bearer nonsense")
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&h.router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_returns_sanitized_view() {
    let h = harness();

    let (status, body) = send(
        &h.router,
        json_request(
            "POST",
            "/api/webhooks",
            Some("user-1"),
            json!({
                "workspaceId": "ws-1",
                "name": "Inbound calls",
                "description": "From the tracker",
                "selectedParameters": ["campaign_name"]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    let webhook_id = data["webhookId"].as_str().unwrap();
    assert_eq!(data["status"], json!("active"));
    assert_eq!(
        data["publicWebhookUrl"],
        json!(format!("https://hooks.example.com/user-1/webhook/{webhook_id}"))
    );
    assert!(data.get("n8nWebhookUrl").is_none());
    assert!(data.get("n8nWorkflowId").is_none());
}

#[tokio::test]
async fn test_create_with_missing_fields_is_bad_request() {
    let h = harness();

    let (status, body) = send(
        &h.router,
        json_request(
            "POST",
            "/api/webhooks",
            Some("user-1"),
            json!({"workspaceId": "ws-1", "selectedParameters": []}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!(handlers::CREATE_REQUIRED_MESSAGE));
}

#[tokio::test]
async fn test_webhooks_are_scoped_to_owner() {
    let h = harness();
    let webhook_id = create(&h.router, "user-1").await;

    let (status, _) = send(
        &h.router,
        empty_request("GET", &format!("/api/webhooks/{webhook_id}"), Some("user-2")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&h.router, empty_request("GET", "/api/webhooks", Some("user-2"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (_, body) = send(&h.router, empty_request("GET", "/api/webhooks", Some("user-1"))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_and_delete() {
    let h = harness();
    let webhook_id = create(&h.router, "user-1").await;
    let uri = format!("/api/webhooks/{webhook_id}");

    let (status, body) = send(
        &h.router,
        json_request("PUT", &uri, Some("user-1"), json!({"name": "Renamed", "status": "inactive"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("Renamed"));
    assert_eq!(body["data"]["status"], json!("inactive"));

    let (status, body) = send(&h.router, empty_request("DELETE", &uri, Some("user-1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!(handlers::DELETED_MESSAGE));

    let (status, _) = send(&h.router, empty_request("GET", &uri, Some("user-1"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Public Ingestion
// ============================================================================

#[tokio::test]
async fn test_ingest_forwards_mapped_payload() {
    let h = harness();
    let webhook_id = create(&h.router, "user-1").await;

    let (status, body) = send(
        &h.router,
        json_request(
            "POST",
            &format!("/user-1/webhook/{webhook_id}"),
            None,
            json!({
                "campaign_name": "Spring",
                "campaign_id": "c-1",
                "recording_url": "https://rec.example.com/1.mp3",
                "caller_id": "+15550100",
                "ignored": "x"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], json!({"received": true}));

    let forwarded = h.transport.forwarded.lock().unwrap();
    assert_eq!(forwarded.len(), 1);
    let (url, payload) = &forwarded[0];
    assert_eq!(url, &format!("http://engine.internal/webhook/{webhook_id}"));
    assert_eq!(payload["caller_id"], json!("+15550100"));
    assert!(payload.get("ignored").is_none());
}

#[tokio::test]
async fn test_ingest_missing_required_parameters() {
    let h = harness();
    let webhook_id = create(&h.router, "user-1").await;

    let (status, body) = send(
        &h.router,
        json_request(
            "POST",
            &format!("/user-1/webhook/{webhook_id}"),
            None,
            json!({"campaign_name": "Spring"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("Missing required parameters: campaign_id, recording_url")
    );
    assert!(h.transport.forwarded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_ingest_wrong_user_is_not_found() {
    let h = harness();
    let webhook_id = create(&h.router, "user-1").await;

    let (status, _) = send(
        &h.router,
        json_request(
            "POST",
            &format!("/user-2/webhook/{webhook_id}"),
            None,
            json!({"campaign_name": "Spring"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ingest_non_object_body_is_bad_request() {
    let h = harness();
    let webhook_id = create(&h.router, "user-1").await;

    let (status, _) = send(
        &h.router,
        json_request("POST", &format!("/user-1/webhook/{webhook_id}"), None, json!([1, 2])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Operational Endpoints
// ============================================================================

#[tokio::test]
async fn test_health_reports_store_status() {
    let h = harness();

    let (status, body) = send(&h.router, empty_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["store"], json!("ok"));
}

#[tokio::test]
async fn test_webhook_health_summarises_configs() {
    let h = harness();
    create(&h.router, "user-1").await;

    let (status, body) = send(&h.router, empty_request("GET", "/health/webhooks", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["active"], json!(1));
}

#[tokio::test]
async fn test_metrics_use_route_templates() {
    let h = harness();
    let webhook_id = create(&h.router, "user-1").await;
    send(
        &h.router,
        json_request("POST", &format!("/user-1/webhook/{webhook_id}"), None, json!({})),
    )
    .await;

    let response = h
        .router
        .clone()
        .oneshot(empty_request("GET", "/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("route=\"/{user_id}/webhook/{webhook_id}\""));
    assert!(!text.contains(&webhook_id));
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let h = harness();
    let request = Request::builder()
        .uri("/health")
        .header(CORRELATION_ID_HEADER, "corr-123")
        .body(Body::empty())
        .unwrap();

    let response = h.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(CORRELATION_ID_HEADER).unwrap(),
        "corr-123"
    );
}

#[tokio::test]
async fn test_correlation_id_is_generated_when_absent() {
    let h = harness();

    let response = h
        .router
        .clone()
        .oneshot(empty_request("GET", "/health", None))
        .await
        .unwrap();

    assert!(response.headers().get(CORRELATION_ID_HEADER).is_some());
}

#[tokio::test]
async fn test_serve_returns_after_shutdown_future_resolves() {
    let state = app_state(Arc::new(RecordingTransport::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let result = serve(listener, state, async {}).await;

    assert!(result.is_ok());
}
