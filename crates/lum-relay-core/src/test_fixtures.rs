//! Shared builders for unit tests.

use crate::webhook::{default_required_parameters, WebhookConfig, WebhookStats, WebhookStatus};
use crate::{Timestamp, UserId, WebhookId, WorkspaceId};
use chrono::{DateTime, Utc};

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn at(rfc3339: &str) -> Timestamp {
    rfc3339.parse::<DateTime<Utc>>().unwrap().into()
}

pub fn sample_config(user_id: &str, webhook_id: &str) -> WebhookConfig {
    let now = Timestamp::now();
    WebhookConfig {
        user_id: user(user_id),
        workspace_id: WorkspaceId::new("ws-1").unwrap(),
        webhook_id: WebhookId::new(webhook_id).unwrap(),
        name: "Inbound calls".to_string(),
        description: "Calls from the tracking platform".to_string(),
        selected_parameters: vec![
            "campaign_name".to_string(),
            "campaign_id".to_string(),
            "recording_url".to_string(),
            "caller_id".to_string(),
        ],
        required_parameters: default_required_parameters(),
        n8n_workflow_id: format!("wf_{webhook_id}"),
        n8n_webhook_url: format!("http://engine.internal/webhook/{webhook_id}"),
        public_webhook_url: format!("https://hooks.example.com/{user_id}/webhook/{webhook_id}"),
        stats: WebhookStats::default(),
        status: WebhookStatus::Active,
        created_at: now,
        updated_at: now,
    }
}
