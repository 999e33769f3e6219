//! # Filesystem Webhook Config Store
//!
//! Local JSON-file implementation of [`WebhookConfigStore`] for single-node
//! deployments and development.

use super::config_map::ConfigMap;
use crate::store::{CallOutcome, HealthUpdate, StoreError, WebhookConfigStore, WebhookUpdate};
use crate::webhook::{WebhookConfig, WebhookStatus};
use crate::{UserId, WebhookId};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Name of the snapshot file inside the data directory
pub const SNAPSHOT_FILE_NAME: &str = "webhooks.json";

/// Filesystem-backed webhook config store
///
/// Holds every configuration in memory and rewrites the snapshot file after
/// each mutation. The write goes to a temporary file that is then renamed
/// over the snapshot, so a crash never leaves a half-written file behind.
/// A mutation becomes visible to readers only once its snapshot is on disk.
///
/// # Examples
///
/// ```no_run
/// use lum_relay_core::FilesystemWebhookConfigStore;
/// use std::path::PathBuf;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FilesystemWebhookConfigStore::open(PathBuf::from("./data")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FilesystemWebhookConfigStore {
    snapshot_path: PathBuf,
    configs: Arc<Mutex<ConfigMap>>,
}

impl FilesystemWebhookConfigStore {
    /// Open the store rooted at `data_dir`, loading any existing snapshot
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or the snapshot
    /// cannot be read or parsed.
    pub async fn open(data_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| StoreError::Unavailable {
                message: format!("Failed to create data directory: {}", e),
            })?;

        let snapshot_path = data_dir.join(SNAPSHOT_FILE_NAME);
        let configs = load_snapshot(&snapshot_path).await?;

        info!(
            path = %snapshot_path.display(),
            webhooks = configs.len(),
            "Opened filesystem webhook store"
        );

        Ok(Self {
            snapshot_path,
            configs: Arc::new(Mutex::new(ConfigMap::from_configs(configs))),
        })
    }

    /// Path of the snapshot file
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Apply `change` to a copy of the map and publish it after persisting
    ///
    /// `change` returns its result and whether anything was modified; an
    /// unmodified copy is discarded without touching the disk.
    async fn commit<T>(
        &self,
        change: impl FnOnce(&mut ConfigMap) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let mut configs = self.configs.lock().await;
        let mut staged = configs.clone();
        let (result, modified) = change(&mut staged)?;
        if modified {
            self.persist(&staged).await?;
            *configs = staged;
        }
        Ok(result)
    }

    async fn persist(&self, configs: &ConfigMap) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&configs.all()).map_err(|e| {
            StoreError::Serialization {
                message: format!("Failed to serialize webhooks: {}", e),
            }
        })?;

        let temp_path = self.snapshot_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::Internal {
                message: format!("Failed to create temp file: {}", e),
            })?;

        file.write_all(&json)
            .await
            .map_err(|e| StoreError::Internal {
                message: format!("Failed to write snapshot: {}", e),
            })?;

        file.flush().await.map_err(|e| StoreError::Internal {
            message: format!("Failed to flush snapshot: {}", e),
        })?;

        fs::rename(&temp_path, &self.snapshot_path)
            .await
            .map_err(|e| StoreError::Internal {
                message: format!("Failed to replace snapshot: {}", e),
            })?;

        debug!(path = %self.snapshot_path.display(), bytes = json.len(), "Persisted webhook snapshot");
        Ok(())
    }
}

async fn load_snapshot(path: &Path) -> Result<Vec<WebhookConfig>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StoreError::Unavailable {
                message: format!("Failed to read snapshot: {}", e),
            })
        }
    };

    serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
        message: format!("Failed to parse snapshot {}: {}", path.display(), e),
    })
}

#[async_trait]
impl WebhookConfigStore for FilesystemWebhookConfigStore {
    async fn insert(&self, config: WebhookConfig) -> Result<(), StoreError> {
        self.commit(|configs| configs.insert(config).map(|()| ((), true)))
            .await
    }

    async fn find_for_user(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<Option<WebhookConfig>, StoreError> {
        Ok(self.configs.lock().await.find_for_user(user_id, webhook_id))
    }

    async fn find_active(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<Option<WebhookConfig>, StoreError> {
        Ok(self.configs.lock().await.find_active(user_id, webhook_id))
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<WebhookConfig>, StoreError> {
        Ok(self.configs.lock().await.list_for_user(user_id))
    }

    async fn list_by_status(
        &self,
        statuses: &[WebhookStatus],
    ) -> Result<Vec<WebhookConfig>, StoreError> {
        Ok(self.configs.lock().await.list_by_status(statuses))
    }

    async fn update(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
        update: &WebhookUpdate,
    ) -> Result<Option<WebhookConfig>, StoreError> {
        self.commit(|configs| {
            let updated = configs.update(user_id, webhook_id, update);
            let modified = updated.is_some();
            Ok((updated, modified))
        })
        .await
    }

    async fn delete(&self, user_id: &UserId, webhook_id: &WebhookId) -> Result<bool, StoreError> {
        self.commit(|configs| {
            let removed = configs.delete(user_id, webhook_id);
            Ok((removed, removed))
        })
        .await
    }

    async fn record_call(
        &self,
        webhook_id: &WebhookId,
        outcome: &CallOutcome,
    ) -> Result<bool, StoreError> {
        self.commit(|configs| {
            let found = configs.record_call(webhook_id, outcome);
            Ok((found, found))
        })
        .await
    }

    async fn set_health(
        &self,
        webhook_id: &WebhookId,
        update: &HealthUpdate,
    ) -> Result<bool, StoreError> {
        self.commit(|configs| {
            let applied = configs.set_health(webhook_id, update);
            Ok((applied, applied))
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let dir = self
            .snapshot_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        fs::metadata(dir)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable {
                message: format!("Data directory not accessible: {}", e),
            })
    }
}

#[cfg(test)]
#[path = "filesystem_store_tests.rs"]
mod tests;
