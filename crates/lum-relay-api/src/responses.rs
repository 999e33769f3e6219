//! Request and response bodies for the HTTP API.

use lum_relay_core::{Timestamp, WebhookStatus, WebhookUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /api/webhooks`
///
/// Fields are optional at the serde level so that a missing field produces
/// the API's own 400 message instead of a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookRequest {
    pub workspace_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub selected_parameters: Option<Vec<String>>,
}

/// Body of `PUT /api/webhooks/{webhookId}`
///
/// Unknown fields are ignored; only these three can change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWebhookRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<WebhookStatus>,
}

impl From<UpdateWebhookRequest> for WebhookUpdate {
    fn from(request: UpdateWebhookRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            status: request.status,
        }
    }
}

/// Body of `POST /api/webhooks/{webhookId}/test`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestWebhookRequest {
    #[serde(default)]
    pub payload: Option<Value>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Envelope for successful data responses
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Envelope for successful responses that only carry a message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub timestamp: Timestamp,
    pub version: String,
}
