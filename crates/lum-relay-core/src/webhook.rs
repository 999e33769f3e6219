//! # Webhook Configuration Model
//!
//! The persisted [`WebhookConfig`] document and its client-facing projection
//! [`WebhookView`].
//!
//! The downstream workflow identifiers (`n8n_workflow_id`, `n8n_webhook_url`)
//! exist only on [`WebhookConfig`]. Everything returned to API clients goes
//! through [`sanitize_webhook_config`], so the engine endpoint cannot leak.

use crate::{Timestamp, UserId, WebhookId, WorkspaceId, DEFAULT_REQUIRED_PARAMETERS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a webhook
///
/// `Active ⇄ Error` is driven by the health monitor. `Inactive` is only
/// reachable through an explicit update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    #[default]
    Active,
    Inactive,
    Error,
}

impl WebhookStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookStatus {
    type Err = crate::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "error" => Ok(Self::Error),
            _ => Err(crate::ParseError::InvalidFormat {
                expected: "active, inactive, or error".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// Rolling delivery statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub last_call_at: Option<Timestamp>,
    pub last_error_at: Option<Timestamp>,
    pub last_error: Option<String>,
    /// Running mean over successful forwards, in milliseconds
    pub average_response_time: f64,
}

impl WebhookStats {
    /// Fold a successful forward into the statistics
    pub fn record_success(&mut self, response_time_ms: f64, at: Timestamp) {
        let previous = self.successful_calls as f64;
        self.average_response_time =
            (self.average_response_time * previous + response_time_ms) / (previous + 1.0);
        self.successful_calls += 1;
        self.total_calls += 1;
        self.last_call_at = Some(at);
    }

    /// Fold a failed call into the statistics
    pub fn record_failure(&mut self, error: impl Into<String>, at: Timestamp) {
        self.failed_calls += 1;
        self.total_calls += 1;
        self.last_call_at = Some(at);
        self.last_error = Some(error.into());
        self.last_error_at = Some(at);
    }
}

/// Persisted webhook configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub webhook_id: WebhookId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub selected_parameters: Vec<String>,
    #[serde(default = "default_required_parameters")]
    pub required_parameters: Vec<String>,
    pub n8n_workflow_id: String,
    pub n8n_webhook_url: String,
    pub public_webhook_url: String,
    #[serde(default)]
    pub stats: WebhookStats,
    #[serde(default)]
    pub status: WebhookStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The fixed required-parameter set applied to new webhooks
pub fn default_required_parameters() -> Vec<String> {
    DEFAULT_REQUIRED_PARAMETERS
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl WebhookConfig {
    /// Check whether the webhook accepts inbound traffic
    pub fn is_active(&self) -> bool {
        self.status == WebhookStatus::Active
    }

    /// Check whether `user_id` owns this webhook
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}

/// Client-facing webhook representation without downstream binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookView {
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub webhook_id: WebhookId,
    pub name: String,
    pub description: String,
    pub selected_parameters: Vec<String>,
    pub required_parameters: Vec<String>,
    pub public_webhook_url: String,
    pub stats: WebhookStats,
    pub status: WebhookStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Strip the downstream workflow binding from a config.
pub fn sanitize_webhook_config(config: &WebhookConfig) -> WebhookView {
    WebhookView {
        user_id: config.user_id.clone(),
        workspace_id: config.workspace_id.clone(),
        webhook_id: config.webhook_id.clone(),
        name: config.name.clone(),
        description: config.description.clone(),
        selected_parameters: config.selected_parameters.clone(),
        required_parameters: config.required_parameters.clone(),
        public_webhook_url: config.public_webhook_url.clone(),
        stats: config.stats.clone(),
        status: config.status,
        created_at: config.created_at,
        updated_at: config.updated_at,
    }
}

impl From<WebhookConfig> for WebhookView {
    fn from(config: WebhookConfig) -> Self {
        sanitize_webhook_config(&config)
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
