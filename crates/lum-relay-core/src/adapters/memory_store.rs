//! # In-Memory Webhook Config Store
//!
//! Thread-safe in-memory implementation for testing and development.

use super::config_map::ConfigMap;
use crate::store::{CallOutcome, HealthUpdate, StoreError, WebhookConfigStore, WebhookUpdate};
use crate::webhook::{WebhookConfig, WebhookStatus};
use crate::{UserId, WebhookId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory webhook config store
///
/// Every mutation runs under a single write lock, so stats and health
/// updates are atomic with respect to each other.
#[derive(Clone, Default)]
pub struct InMemoryWebhookConfigStore {
    configs: Arc<RwLock<ConfigMap>>,
}

impl InMemoryWebhookConfigStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store pre-populated with configurations
    pub fn with_configs(configs: impl IntoIterator<Item = WebhookConfig>) -> Self {
        Self {
            configs: Arc::new(RwLock::new(ConfigMap::from_configs(configs))),
        }
    }

    /// Copy of every stored configuration, oldest first
    pub async fn snapshot(&self) -> Vec<WebhookConfig> {
        self.configs.read().await.all()
    }
}

#[async_trait]
impl WebhookConfigStore for InMemoryWebhookConfigStore {
    async fn insert(&self, config: WebhookConfig) -> Result<(), StoreError> {
        self.configs.write().await.insert(config)
    }

    async fn find_for_user(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<Option<WebhookConfig>, StoreError> {
        Ok(self.configs.read().await.find_for_user(user_id, webhook_id))
    }

    async fn find_active(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<Option<WebhookConfig>, StoreError> {
        Ok(self.configs.read().await.find_active(user_id, webhook_id))
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<WebhookConfig>, StoreError> {
        Ok(self.configs.read().await.list_for_user(user_id))
    }

    async fn list_by_status(
        &self,
        statuses: &[WebhookStatus],
    ) -> Result<Vec<WebhookConfig>, StoreError> {
        Ok(self.configs.read().await.list_by_status(statuses))
    }

    async fn update(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
        update: &WebhookUpdate,
    ) -> Result<Option<WebhookConfig>, StoreError> {
        Ok(self.configs.write().await.update(user_id, webhook_id, update))
    }

    async fn delete(&self, user_id: &UserId, webhook_id: &WebhookId) -> Result<bool, StoreError> {
        Ok(self.configs.write().await.delete(user_id, webhook_id))
    }

    async fn record_call(
        &self,
        webhook_id: &WebhookId,
        outcome: &CallOutcome,
    ) -> Result<bool, StoreError> {
        Ok(self.configs.write().await.record_call(webhook_id, outcome))
    }

    async fn set_health(
        &self,
        webhook_id: &WebhookId,
        update: &HealthUpdate,
    ) -> Result<bool, StoreError> {
        Ok(self.configs.write().await.set_health(webhook_id, update))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
