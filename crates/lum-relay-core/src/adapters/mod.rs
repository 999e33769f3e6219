//! # Infrastructure Adapters
//!
//! Implementations of the [`WebhookConfigStore`](crate::store::WebhookConfigStore) interface.

mod config_map;

pub mod filesystem_store;
pub mod memory_store;

#[cfg(feature = "mongodb")]
pub mod mongodb_store;

pub use filesystem_store::FilesystemWebhookConfigStore;
pub use memory_store::InMemoryWebhookConfigStore;

#[cfg(feature = "mongodb")]
pub use mongodb_store::MongoWebhookConfigStore;
