//! # Webhook Service
//!
//! Orchestrates the lifecycle of a webhook: creation and workflow binding,
//! inbound payload validation, mapping and forwarding, statistics, and the
//! owner-scoped management operations.
//!
//! Configurations only leave this service as [`WebhookView`]s, so the
//! internal downstream URL is never exposed to callers.

use crate::downstream::{AutomationEngine, DownstreamError, DownstreamTransport, WorkflowRequest};
use crate::metrics::RelayMetrics;
use crate::parameters::{map_parameters, missing_required_parameters};
use crate::store::{CallOutcome, StoreError, WebhookConfigStore, WebhookUpdate};
use crate::webhook::{
    default_required_parameters, sanitize_webhook_config, WebhookConfig, WebhookStats,
    WebhookStatus, WebhookView,
};
use crate::{Timestamp, UserId, ValidationError, WebhookId, WorkspaceId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Message returned for every successfully relayed payload
pub const PROCESSED_MESSAGE: &str = "Webhook processed successfully";

// ============================================================================
// Request / Response Types
// ============================================================================

/// Settings the service needs beyond its collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Base of every public webhook URL, e.g. `https://hooks.example.com`
    pub public_base_url: String,
}

/// Input for [`WebhookService::generate_webhook`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateWebhook {
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub selected_parameters: Vec<String>,
}

/// Result of relaying one inbound payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
    /// Body returned by the automation engine
    pub data: Value,
}

// ============================================================================
// Service
// ============================================================================

/// Webhook orchestration service
#[derive(Clone)]
pub struct WebhookService {
    store: Arc<dyn WebhookConfigStore>,
    engine: Arc<dyn AutomationEngine>,
    transport: Arc<dyn DownstreamTransport>,
    metrics: Arc<dyn RelayMetrics>,
    settings: ServiceSettings,
}

impl WebhookService {
    pub fn new(
        store: Arc<dyn WebhookConfigStore>,
        engine: Arc<dyn AutomationEngine>,
        transport: Arc<dyn DownstreamTransport>,
        metrics: Arc<dyn RelayMetrics>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            engine,
            transport,
            metrics,
            settings,
        }
    }

    /// Public URL callers POST payloads to
    pub fn public_webhook_url(&self, user_id: &UserId, webhook_id: &WebhookId) -> String {
        format!(
            "{}/{}/webhook/{}",
            self.settings.public_base_url.trim_end_matches('/'),
            user_id,
            webhook_id
        )
    }

    /// Create a webhook, bind it to a workflow and persist it as `active`
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidRequest`] when the name or parameter list is empty
    /// - [`ServiceError::Downstream`] when the workflow cannot be registered
    /// - [`ServiceError::Store`] when the configuration cannot be saved
    #[instrument(skip(self, request), fields(user_id = %request.user_id, workspace_id = %request.workspace_id))]
    pub async fn generate_webhook(
        &self,
        request: GenerateWebhook,
    ) -> Result<WebhookView, ServiceError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidRequest {
                message: "name must not be empty".to_string(),
            });
        }
        if request.selected_parameters.is_empty() {
            return Err(ServiceError::InvalidRequest {
                message: "selectedParameters must not be empty".to_string(),
            });
        }

        let webhook_id = WebhookId::generate();
        let binding = self
            .engine
            .register_workflow(&WorkflowRequest {
                user_id: request.user_id.clone(),
                workspace_id: request.workspace_id.clone(),
                webhook_id: webhook_id.clone(),
                name: name.to_string(),
                selected_parameters: request.selected_parameters.clone(),
            })
            .await?;

        let now = Timestamp::now();
        let config = WebhookConfig {
            public_webhook_url: self.public_webhook_url(&request.user_id, &webhook_id),
            user_id: request.user_id,
            workspace_id: request.workspace_id,
            webhook_id,
            name: name.to_string(),
            description: request.description.unwrap_or_default(),
            selected_parameters: request.selected_parameters,
            required_parameters: default_required_parameters(),
            n8n_workflow_id: binding.workflow_id,
            n8n_webhook_url: binding.webhook_url,
            stats: WebhookStats::default(),
            status: WebhookStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let view = sanitize_webhook_config(&config);
        self.store.insert(config).await?;

        info!(webhook_id = %view.webhook_id, "Generated webhook");
        Ok(view)
    }

    /// Validate, map and forward one inbound payload
    ///
    /// The call outcome is folded into the webhook's statistics whenever the
    /// configuration was resolved, including validation and forward failures.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFoundOrInactive`] when no `active` webhook matches
    /// - [`ServiceError::MissingParameters`] when required fields are absent
    /// - [`ServiceError::Downstream`] when the forward fails
    #[instrument(skip(self, payload), fields(user_id = %user_id, webhook_id = %webhook_id))]
    pub async fn process_webhook_request(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
        payload: &Map<String, Value>,
    ) -> Result<ProcessResponse, ServiceError> {
        let config = match self.store.find_active(user_id, webhook_id).await? {
            Some(config) => config,
            None => {
                self.metrics.record_validation_rejection("not_found");
                return Err(ServiceError::NotFoundOrInactive {
                    webhook_id: webhook_id.clone(),
                });
            }
        };

        let missing = missing_required_parameters(payload, &config.required_parameters);
        if !missing.is_empty() {
            let err = ServiceError::MissingParameters { missing };
            self.metrics.record_validation_rejection("missing_parameters");
            warn!(error = %err, "Rejected inbound payload");
            self.record_outcome(&config.webhook_id, CallOutcome::failed(err.to_string()))
                .await;
            return Err(err);
        }

        let mapped = map_parameters(payload, &config.selected_parameters);
        let started = Instant::now();
        let result = self
            .transport
            .forward(&config.n8n_webhook_url, &config.webhook_id, &mapped)
            .await;
        let elapsed = started.elapsed();

        match result {
            Ok(response) => {
                self.metrics.record_forward(elapsed, true);
                let response_time_ms = elapsed.as_secs_f64() * 1000.0;
                self.record_outcome(&config.webhook_id, CallOutcome::delivered(response_time_ms))
                    .await;

                info!(
                    status = response.status,
                    response_time_ms, "Relayed webhook payload"
                );
                Ok(ProcessResponse {
                    success: true,
                    message: PROCESSED_MESSAGE.to_string(),
                    data: response.body,
                })
            }
            Err(e) => {
                self.metrics.record_forward(elapsed, false);
                error!(error = %e, transient = e.is_transient(), "Failed to forward webhook payload");
                self.record_outcome(&config.webhook_id, CallOutcome::failed(e.to_string()))
                    .await;
                Err(ServiceError::Downstream(e))
            }
        }
    }

    async fn record_outcome(&self, webhook_id: &WebhookId, outcome: CallOutcome) {
        match self.store.record_call(webhook_id, &outcome).await {
            Ok(true) => {}
            Ok(false) => debug!(webhook_id = %webhook_id, "Webhook removed before stats update"),
            Err(e) => error!(
                webhook_id = %webhook_id,
                error = %e,
                "Failed to update webhook stats"
            ),
        }
    }

    /// All webhooks owned by `user_id`, newest first
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user_webhooks(&self, user_id: &UserId) -> Result<Vec<WebhookView>, ServiceError> {
        let configs = self.store.list_for_user(user_id).await?;
        Ok(configs.iter().map(sanitize_webhook_config).collect())
    }

    /// One webhook owned by `user_id`
    #[instrument(skip(self), fields(user_id = %user_id, webhook_id = %webhook_id))]
    pub async fn get_webhook_by_id(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<WebhookView, ServiceError> {
        self.store
            .find_for_user(user_id, webhook_id)
            .await?
            .map(|config| sanitize_webhook_config(&config))
            .ok_or_else(|| ServiceError::NotFound {
                webhook_id: webhook_id.clone(),
            })
    }

    /// Change the name, description or status of an owned webhook
    ///
    /// A supplied name is trimmed and must not be empty, as on creation.
    #[instrument(skip(self, update), fields(user_id = %user_id, webhook_id = %webhook_id))]
    pub async fn update_webhook(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
        mut update: WebhookUpdate,
    ) -> Result<WebhookView, ServiceError> {
        if let Some(name) = update.name.as_mut() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ServiceError::InvalidRequest {
                    message: "name must not be empty".to_string(),
                });
            }
            *name = trimmed.to_string();
        }

        let updated = self
            .store
            .update(user_id, webhook_id, &update)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                webhook_id: webhook_id.clone(),
            })?;

        info!(status = %updated.status, "Updated webhook");
        Ok(sanitize_webhook_config(&updated))
    }

    /// Hard-delete an owned webhook
    ///
    /// The downstream workflow is left in place.
    #[instrument(skip(self), fields(user_id = %user_id, webhook_id = %webhook_id))]
    pub async fn delete_webhook(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<(), ServiceError> {
        if !self.store.delete(user_id, webhook_id).await? {
            return Err(ServiceError::NotFound {
                webhook_id: webhook_id.clone(),
            });
        }
        info!("Deleted webhook");
        Ok(())
    }

    /// Send a sample payload through an owned webhook
    #[instrument(skip(self, payload), fields(user_id = %user_id, webhook_id = %webhook_id))]
    pub async fn test_webhook(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
        payload: &Map<String, Value>,
    ) -> Result<ProcessResponse, ServiceError> {
        self.get_webhook_by_id(user_id, webhook_id).await?;
        self.process_webhook_request(user_id, webhook_id, payload)
            .await
    }

    /// Check that the config store is reachable
    pub async fn check_store(&self) -> Result<(), ServiceError> {
        self.store.ping().await.map_err(ServiceError::from)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by [`WebhookService`]
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Webhook not found or inactive")]
    NotFoundOrInactive { webhook_id: WebhookId },

    #[error("Webhook not found")]
    NotFound { webhook_id: WebhookId },

    #[error("Missing required parameters: {}", missing.join(", "))]
    MissingParameters { missing: Vec<String> },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Downstream(#[from] DownstreamError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Check if the caller could succeed by retrying unchanged
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Downstream(e) => e.is_transient(),
            Self::Store(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Check if the error was caused by the request rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFoundOrInactive { .. }
                | Self::NotFound { .. }
                | Self::MissingParameters { .. }
                | Self::InvalidRequest { .. }
                | Self::Validation(_)
        )
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
