//! HTTP handlers.
//!
//! Management handlers run behind [`require_auth`](crate::auth::require_auth)
//! and act on behalf of the [`AuthenticatedUser`]. The ingestion handler is
//! public: the user and webhook IDs in the path are the only credential.

use crate::auth::AuthenticatedUser;
use crate::errors::ApiError;
use crate::responses::{
    CreateWebhookRequest, DataResponse, HealthResponse, MessageResponse, TestWebhookRequest,
    UpdateWebhookRequest,
};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use lum_relay_core::{
    GenerateWebhook, HealthReport, ProcessResponse, ServiceError, Timestamp, UserId, WebhookId,
    WebhookView, WorkspaceId,
};
use serde_json::{Map, Value};
use tracing::{error, instrument};

/// 400 message for an incomplete create request
pub const CREATE_REQUIRED_MESSAGE: &str = "workspaceId, name, and selectedParameters are required";

/// Message returned after a successful delete
pub const DELETED_MESSAGE: &str = "Webhook deleted successfully";

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Unparsable IDs can never match a stored webhook
fn owned_webhook_id(raw: &str) -> Result<WebhookId, ApiError> {
    WebhookId::new(raw).map_err(|_| ApiError::NotFound {
        message: "Webhook not found".to_string(),
    })
}

fn payload_object(value: Value, what: &str) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request(format!("{what} must be a JSON object"))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Management API
// ============================================================================

/// `POST /api/webhooks`
#[instrument(skip(state, body), fields(user_id = %user_id))]
pub async fn create_webhook(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    body: Result<Json<CreateWebhookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<WebhookView>>), ApiError> {
    let request = json_body(body)?;

    let (Some(workspace_id), Some(name), Some(selected_parameters)) = (
        non_empty(request.workspace_id),
        non_empty(request.name),
        request.selected_parameters.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request(CREATE_REQUIRED_MESSAGE));
    };

    let workspace_id = WorkspaceId::new(workspace_id).map_err(ServiceError::from)?;

    let view = state
        .service
        .generate_webhook(GenerateWebhook {
            user_id,
            workspace_id,
            name,
            description: request.description,
            selected_parameters,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse::new(view))))
}

/// `GET /api/webhooks`
#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn list_webhooks(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> Result<Json<DataResponse<Vec<WebhookView>>>, ApiError> {
    let views = state.service.get_user_webhooks(&user_id).await?;
    Ok(Json(DataResponse::new(views)))
}

/// `GET /api/webhooks/{webhookId}`
#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn get_webhook(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(webhook_id): Path<String>,
) -> Result<Json<DataResponse<WebhookView>>, ApiError> {
    let webhook_id = owned_webhook_id(&webhook_id)?;
    let view = state
        .service
        .get_webhook_by_id(&user_id, &webhook_id)
        .await?;
    Ok(Json(DataResponse::new(view)))
}

/// `PUT /api/webhooks/{webhookId}`
#[instrument(skip(state, body), fields(user_id = %user_id))]
pub async fn update_webhook(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(webhook_id): Path<String>,
    body: Result<Json<UpdateWebhookRequest>, JsonRejection>,
) -> Result<Json<DataResponse<WebhookView>>, ApiError> {
    let webhook_id = owned_webhook_id(&webhook_id)?;
    let update = json_body(body)?;

    let view = state
        .service
        .update_webhook(&user_id, &webhook_id, update.into())
        .await?;
    Ok(Json(DataResponse::new(view)))
}

/// `DELETE /api/webhooks/{webhookId}`
#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn delete_webhook(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(webhook_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let webhook_id = owned_webhook_id(&webhook_id)?;
    state.service.delete_webhook(&user_id, &webhook_id).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: DELETED_MESSAGE.to_string(),
    }))
}

/// `POST /api/webhooks/{webhookId}/test`
#[instrument(skip(state, body), fields(user_id = %user_id))]
pub async fn test_webhook(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(webhook_id): Path<String>,
    body: Result<Json<TestWebhookRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let webhook_id = owned_webhook_id(&webhook_id)?;
    let payload = match json_body(body)?.payload {
        Some(value) => payload_object(value, "payload")?,
        None => Map::new(),
    };

    let response = state
        .service
        .test_webhook(&user_id, &webhook_id, &payload)
        .await?;
    Ok(Json(response))
}

// ============================================================================
// Public Ingestion
// ============================================================================

/// `POST /{userId}/webhook/{webhookId}`
#[instrument(skip(state, body))]
pub async fn ingest_webhook(
    State(state): State<AppState>,
    Path((user_id, webhook_id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let (Ok(user_id), Ok(webhook_id)) = (UserId::new(user_id), WebhookId::new(webhook_id)) else {
        return Err(ApiError::NotFound {
            message: "Webhook not found or inactive".to_string(),
        });
    };
    let payload = payload_object(json_body(body)?, "Request body")?;

    let response = state
        .service
        .process_webhook_request(&user_id, &webhook_id, &payload)
        .await?;
    Ok(Json(response))
}

// ============================================================================
// Health and Observability
// ============================================================================

/// `GET /health`
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status_code, status, store) = match state.service.check_store().await {
        Ok(()) => (StatusCode::OK, "healthy", "ok".to_string()),
        Err(e) => {
            error!(error = %e, "Store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "unhealthy",
                "unavailable".to_string(),
            )
        }
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            store,
            timestamp: Timestamp::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /health/webhooks`
#[instrument(skip(state))]
pub async fn webhook_health(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<HealthReport>>, ApiError> {
    let report = state
        .monitor
        .get_health_status()
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(DataResponse::new(report)))
}

/// `GET /metrics`
#[instrument(skip_all)]
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, ApiError> {
    state.metrics.encode().map_err(|e| ApiError::Internal {
        message: format!("Failed to encode metrics: {}", e),
    })
}
