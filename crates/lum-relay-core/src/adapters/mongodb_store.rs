//! # MongoDB Webhook Config Store
//!
//! Production implementation of [`WebhookConfigStore`] on a single MongoDB
//! collection, indexed on `(userId, workspaceId)` and uniquely on `webhookId`.
//!
//! Statistics are written with one pipeline update per call so counters and
//! the running mean are computed server-side from the stored values.

use crate::store::{CallOutcome, HealthUpdate, StoreError, WebhookConfigStore, WebhookUpdate};
use crate::webhook::{WebhookConfig, WebhookStatus};
use crate::{Timestamp, UserId, WebhookId};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client, Collection, Database, IndexModel,
};
use tracing::info;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB-backed webhook config store
#[derive(Clone)]
pub struct MongoWebhookConfigStore {
    database: Database,
    collection: Collection<WebhookConfig>,
}

impl MongoWebhookConfigStore {
    /// Connect to `uri`, select `database`/`collection` and ensure indexes
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the connection string is
    /// invalid, the server cannot be reached or index creation fails.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::Unavailable {
                message: format!("Failed to create MongoDB client: {}", e),
            })?;

        let database = client.database(database);
        let store = Self {
            collection: database.collection::<WebhookConfig>(collection),
            database,
        };

        store.ping().await?;
        store.ensure_indexes().await?;

        info!(collection = %collection, "Connected MongoDB webhook store");
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique_id = IndexModel::builder()
            .keys(doc! { "webhookId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let by_owner = IndexModel::builder()
            .keys(doc! { "userId": 1, "workspaceId": 1 })
            .build();

        self.collection
            .create_indexes(vec![unique_id, by_owner], None)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable {
                message: format!("Failed to create indexes: {}", e),
            })
    }
}

fn backend_error(e: mongodb::error::Error) -> StoreError {
    StoreError::Internal {
        message: e.to_string(),
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Bson, StoreError> {
    to_bson(value).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })
}

fn owned_filter(user_id: &UserId, webhook_id: &WebhookId) -> Document {
    doc! { "userId": user_id.as_str(), "webhookId": webhook_id.as_str() }
}

/// Match the webhook only while its status still admits `update`
fn health_filter(webhook_id: &WebhookId, update: &HealthUpdate) -> Document {
    let statuses: Vec<&str> = update
        .source_statuses()
        .iter()
        .map(WebhookStatus::as_str)
        .collect();
    doc! { "webhookId": webhook_id.as_str(), "status": { "$in": statuses } }
}

fn stats_pipeline(outcome: &CallOutcome) -> Result<Vec<Document>, StoreError> {
    let stage = match outcome {
        CallOutcome::Delivered {
            response_time_ms,
            at,
        } => {
            let response_time_ms = *response_time_ms;
            let at = encode(at)?;
            doc! {
                "$set": {
                    "stats.averageResponseTime": {
                        "$divide": [
                            { "$add": [
                                { "$multiply": ["$stats.averageResponseTime", "$stats.successfulCalls"] },
                                response_time_ms,
                            ] },
                            { "$add": ["$stats.successfulCalls", 1] },
                        ]
                    },
                    "stats.successfulCalls": { "$add": ["$stats.successfulCalls", 1] },
                    "stats.totalCalls": { "$add": ["$stats.totalCalls", 1] },
                    "stats.lastCallAt": { "$literal": at },
                }
            }
        }
        CallOutcome::Failed { error, at } => {
            let at = encode(at)?;
            doc! {
                "$set": {
                    "stats.failedCalls": { "$add": ["$stats.failedCalls", 1] },
                    "stats.totalCalls": { "$add": ["$stats.totalCalls", 1] },
                    "stats.lastCallAt": { "$literal": at.clone() },
                    "stats.lastErrorAt": { "$literal": at },
                    "stats.lastError": { "$literal": error.as_str() },
                }
            }
        }
    };
    Ok(vec![stage])
}

#[async_trait]
impl WebhookConfigStore for MongoWebhookConfigStore {
    async fn insert(&self, config: WebhookConfig) -> Result<(), StoreError> {
        let webhook_id = config.webhook_id.clone();
        match self.collection.insert_one(config, None).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let duplicate = matches!(
                    *e.kind,
                    ErrorKind::Write(WriteFailure::WriteError(ref write_error))
                        if write_error.code == DUPLICATE_KEY_CODE
                );
                if duplicate {
                    Err(StoreError::Duplicate { webhook_id })
                } else {
                    Err(backend_error(e))
                }
            }
        }
    }

    async fn find_for_user(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<Option<WebhookConfig>, StoreError> {
        self.collection
            .find_one(owned_filter(user_id, webhook_id), None)
            .await
            .map_err(backend_error)
    }

    async fn find_active(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
    ) -> Result<Option<WebhookConfig>, StoreError> {
        let mut filter = owned_filter(user_id, webhook_id);
        filter.insert("status", WebhookStatus::Active.as_str());
        self.collection
            .find_one(filter, None)
            .await
            .map_err(backend_error)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<WebhookConfig>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let cursor = self
            .collection
            .find(doc! { "userId": user_id.as_str() }, options)
            .await
            .map_err(backend_error)?;
        cursor.try_collect().await.map_err(backend_error)
    }

    async fn list_by_status(
        &self,
        statuses: &[WebhookStatus],
    ) -> Result<Vec<WebhookConfig>, StoreError> {
        let statuses: Vec<&str> = statuses.iter().map(WebhookStatus::as_str).collect();
        let cursor = self
            .collection
            .find(doc! { "status": { "$in": statuses } }, None)
            .await
            .map_err(backend_error)?;
        cursor.try_collect().await.map_err(backend_error)
    }

    async fn update(
        &self,
        user_id: &UserId,
        webhook_id: &WebhookId,
        update: &WebhookUpdate,
    ) -> Result<Option<WebhookConfig>, StoreError> {
        let now = encode(&Timestamp::now())?;
        let mut set = doc! { "updatedAt": now };
        if let Some(name) = &update.name {
            set.insert("name", name.as_str());
        }
        if let Some(description) = &update.description {
            set.insert("description", description.as_str());
        }
        if let Some(status) = update.status {
            set.insert("status", status.as_str());
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.collection
            .find_one_and_update(owned_filter(user_id, webhook_id), doc! { "$set": set }, options)
            .await
            .map_err(backend_error)
    }

    async fn delete(&self, user_id: &UserId, webhook_id: &WebhookId) -> Result<bool, StoreError> {
        let result = self
            .collection
            .delete_one(owned_filter(user_id, webhook_id), None)
            .await
            .map_err(backend_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn record_call(
        &self,
        webhook_id: &WebhookId,
        outcome: &CallOutcome,
    ) -> Result<bool, StoreError> {
        let result = self
            .collection
            .update_one(
                doc! { "webhookId": webhook_id.as_str() },
                stats_pipeline(outcome)?,
                None,
            )
            .await
            .map_err(backend_error)?;
        Ok(result.matched_count > 0)
    }

    async fn set_health(
        &self,
        webhook_id: &WebhookId,
        update: &HealthUpdate,
    ) -> Result<bool, StoreError> {
        let set = match update {
            HealthUpdate::Recovered { at } => {
                let at = encode(at)?;
                doc! {
                    "status": WebhookStatus::Active.as_str(),
                    "updatedAt": at,
                }
            }
            HealthUpdate::Failed { error, at } => {
                let at = encode(at)?;
                doc! {
                    "status": WebhookStatus::Error.as_str(),
                    "stats.lastError": error.as_str(),
                    "stats.lastErrorAt": at.clone(),
                    "updatedAt": at,
                }
            }
        };

        let result = self
            .collection
            .update_one(health_filter(webhook_id, update), doc! { "$set": set }, None)
            .await
            .map_err(backend_error)?;
        Ok(result.matched_count > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable {
                message: format!("MongoDB ping failed: {}", e),
            })
    }
}

#[cfg(test)]
#[path = "mongodb_store_tests.rs"]
mod tests;
