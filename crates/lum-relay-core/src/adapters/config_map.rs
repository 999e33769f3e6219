//! Map-backed store operations shared by the in-process adapters.
//!
//! Callers hold the surrounding lock for the duration of each call, which is
//! what makes `record_call` and `set_health` atomic.

use crate::store::{CallOutcome, HealthUpdate, StoreError, WebhookUpdate};
use crate::webhook::{WebhookConfig, WebhookStatus};
use crate::{Timestamp, UserId, WebhookId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub(crate) struct ConfigMap {
    configs: HashMap<WebhookId, WebhookConfig>,
}

impl ConfigMap {
    pub(crate) fn from_configs(configs: impl IntoIterator<Item = WebhookConfig>) -> Self {
        Self {
            configs: configs
                .into_iter()
                .map(|c| (c.webhook_id.clone(), c))
                .collect(),
        }
    }

    pub(crate) fn all(&self) -> Vec<WebhookConfig> {
        let mut configs: Vec<WebhookConfig> = self.configs.values().cloned().collect();
        configs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        configs
    }

    pub(crate) fn insert(&mut self, config: WebhookConfig) -> Result<(), StoreError> {
        if self.configs.contains_key(&config.webhook_id) {
            return Err(StoreError::Duplicate {
                webhook_id: config.webhook_id,
            });
        }
        self.configs.insert(config.webhook_id.clone(), config);
        Ok(())
    }

    pub(crate) fn find_for_user(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Option<WebhookConfig> {
        self.configs
            .get(webhook_id)
            .filter(|c| c.is_owned_by(user_id))
            .cloned()
    }

    pub(crate) fn find_active(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Option<WebhookConfig> {
        self.find_for_user(user_id, webhook_id)
            .filter(WebhookConfig::is_active)
    }

    pub(crate) fn list_for_user(&self, user_id: &UserId) -> Vec<WebhookConfig> {
        let mut configs: Vec<WebhookConfig> = self
            .configs
            .values()
            .filter(|c| c.is_owned_by(user_id))
            .cloned()
            .collect();
        configs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        configs
    }

    pub(crate) fn list_by_status(&self, statuses: &[WebhookStatus]) -> Vec<WebhookConfig> {
        self.configs
            .values()
            .filter(|c| statuses.contains(&c.status))
            .cloned()
            .collect()
    }

    pub(crate) fn update(
        &mut self,
        user_id: &UserId,
        webhook_id: &WebhookId,
        update: &WebhookUpdate,
    ) -> Option<WebhookConfig> {
        let config = self
            .configs
            .get_mut(webhook_id)
            .filter(|c| c.is_owned_by(user_id))?;
        update.apply_to(config, Timestamp::now());
        Some(config.clone())
    }

    pub(crate) fn delete(&mut self, user_id: &UserId, webhook_id: &WebhookId) -> bool {
        let owned = self
            .configs
            .get(webhook_id)
            .is_some_and(|c| c.is_owned_by(user_id));
        owned && self.configs.remove(webhook_id).is_some()
    }

    pub(crate) fn record_call(&mut self, webhook_id: &WebhookId, outcome: &CallOutcome) -> bool {
        match self.configs.get_mut(webhook_id) {
            Some(config) => {
                outcome.apply_to(config);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_health(&mut self, webhook_id: &WebhookId, update: &HealthUpdate) -> bool {
        match self.configs.get_mut(webhook_id) {
            Some(config) if update.applies_to(config.status) => {
                update.apply_to(config);
                true
            }
            _ => false,
        }
    }
}
