//! # Webhook Config Store
//!
//! Persistence interface for [`WebhookConfig`] documents.
//!
//! Identity is the globally unique [`WebhookId`]; every tenant-facing lookup
//! is additionally scoped by [`UserId`]. Statistics and health writes are
//! single atomic operations on the store so concurrent requests for the same
//! webhook cannot lose updates.
//!
//! # Implementations
//!
//! - [`InMemoryWebhookConfigStore`](crate::adapters::InMemoryWebhookConfigStore)
//! - [`FilesystemWebhookConfigStore`](crate::adapters::FilesystemWebhookConfigStore)
//! - `MongoWebhookConfigStore` (feature `mongodb`)

use crate::webhook::{WebhookConfig, WebhookStatus};
use crate::{Timestamp, UserId, WebhookId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persistence operations for webhook configurations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookConfigStore: Send + Sync {
    /// Persist a new configuration
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if a configuration with the same
    /// webhook ID already exists.
    async fn insert(&self, config: WebhookConfig) -> Result<(), StoreError>;

    /// Look up a configuration owned by `user_id`
    async fn find_for_user(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<Option<WebhookConfig>, StoreError>;

    /// Look up an `active` configuration owned by `user_id`
    async fn find_active(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<Option<WebhookConfig>, StoreError>;

    /// All configurations owned by `user_id`, newest first
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<WebhookConfig>, StoreError>;

    /// All configurations whose status is one of `statuses`
    async fn list_by_status(
        &self,
        statuses: &[WebhookStatus],
    ) -> Result<Vec<WebhookConfig>, StoreError>;

    /// Apply a whitelisted update and return the updated configuration
    ///
    /// Returns `None` when no configuration owned by `user_id` matches.
    async fn update(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
        update: &WebhookUpdate,
    ) -> Result<Option<WebhookConfig>, StoreError>;

    /// Hard-delete a configuration, returning whether one was removed
    async fn delete(&self, user_id: &UserId, webhook_id: &WebhookId) -> Result<bool, StoreError>;

    /// Atomically fold one call outcome into the configuration's statistics
    ///
    /// Returns `false` if the webhook no longer exists.
    async fn record_call(
        &self,
        webhook_id: &WebhookId,
        outcome: &CallOutcome,
    ) -> Result<bool, StoreError>;

    /// Atomically write a health-check result
    ///
    /// The write is conditional on the webhook's current status (see
    /// [`HealthUpdate::applies_to`]). Returns `false` if the webhook no
    /// longer exists or its status no longer admits the update.
    async fn set_health(
        &self,
        webhook_id: &WebhookId,
        update: &HealthUpdate,
    ) -> Result<bool, StoreError>;

    /// Verify the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

// ============================================================================
// Supporting Types
// ============================================================================

/// Fields an owner may change after creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<WebhookStatus>,
}

impl WebhookUpdate {
    /// Check whether the update changes anything
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }

    /// Apply the update to a configuration in place
    pub fn apply_to(&self, config: &mut WebhookConfig, at: Timestamp) {
        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(description) = &self.description {
            config.description = description.clone();
        }
        if let Some(status) = self.status {
            config.status = status;
        }
        config.updated_at = at;
    }
}

/// Outcome of one inbound call
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Payload forwarded; latency in milliseconds
    Delivered { response_time_ms: f64, at: Timestamp },
    /// Validation or forwarding failed
    Failed { error: String, at: Timestamp },
}

impl CallOutcome {
    /// Successful delivery observed now
    pub fn delivered(response_time_ms: f64) -> Self {
        Self::Delivered {
            response_time_ms,
            at: Timestamp::now(),
        }
    }

    /// Failure observed now
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
            at: Timestamp::now(),
        }
    }

    /// Apply the outcome to a configuration in place
    pub fn apply_to(&self, config: &mut WebhookConfig) {
        match self {
            Self::Delivered {
                response_time_ms,
                at,
            } => config.stats.record_success(*response_time_ms, *at),
            Self::Failed { error, at } => config.stats.record_failure(error.clone(), *at),
        }
    }
}

/// Result of one downstream health probe
#[derive(Debug, Clone, PartialEq)]
pub enum HealthUpdate {
    /// Probe succeeded; status returns to `active`
    Recovered { at: Timestamp },
    /// Probe failed; status becomes `error`
    Failed { error: String, at: Timestamp },
}

impl HealthUpdate {
    /// Statuses from which this update may be applied
    ///
    /// `inactive` is absent from both: only an owner update leaves it.
    pub fn source_statuses(&self) -> &'static [WebhookStatus] {
        match self {
            Self::Recovered { .. } => &[WebhookStatus::Error],
            Self::Failed { .. } => &[WebhookStatus::Active, WebhookStatus::Error],
        }
    }

    /// Check whether the update may be applied to a webhook in `status`
    pub fn applies_to(&self, status: WebhookStatus) -> bool {
        self.source_statuses().contains(&status)
    }

    /// Apply the update to a configuration in place
    ///
    /// Callers check [`HealthUpdate::applies_to`] first.
    pub fn apply_to(&self, config: &mut WebhookConfig) {
        match self {
            Self::Recovered { at } => {
                config.status = WebhookStatus::Active;
                config.updated_at = *at;
            }
            Self::Failed { error, at } => {
                config.status = WebhookStatus::Error;
                config.stats.last_error = Some(error.clone());
                config.stats.last_error_at = Some(*at);
                config.updated_at = *at;
            }
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A configuration with this webhook ID already exists
    #[error("Duplicate webhook ID: {webhook_id}")]
    Duplicate { webhook_id: WebhookId },

    /// Backing store cannot be reached
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    /// Document could not be encoded or decoded
    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    /// Any other backend failure
    #[error("Internal store error: {message}")]
    Internal { message: String },
}

impl StoreError {
    /// Check if error is transient
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Internal { .. })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
