//! # Downstream Integration
//!
//! Seams to the workflow automation engine that receives relayed payloads.
//!
//! - [`AutomationEngine`] binds a new webhook to a workflow and yields the
//!   internal URL payloads are forwarded to.
//! - [`DownstreamTransport`] performs the forward itself and the periodic
//!   reachability probe used by the health monitor.

use crate::{WebhookId, HEALTH_CHECK_HEADER, WEBHOOK_ID_HEADER};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Header carrying the engine API key when one is configured
pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// Default timeout for health probes
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Automation Engine
// ============================================================================

/// Details of a webhook being bound to a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub user_id: crate::UserId,
    pub workspace_id: crate::WorkspaceId,
    pub webhook_id: WebhookId,
    pub name: String,
    pub selected_parameters: Vec<String>,
}

/// Workflow created for a webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowBinding {
    pub workflow_id: String,
    /// Internal URL payloads are forwarded to
    pub webhook_url: String,
}

/// Registers webhooks with the downstream automation engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AutomationEngine: Send + Sync {
    /// Create (or locate) the workflow that will receive this webhook's payloads
    async fn register_workflow(
        &self,
        request: &WorkflowRequest,
    ) -> Result<WorkflowBinding, DownstreamError>;
}

/// Engine that derives the binding from the webhook ID without any network call
///
/// The engine is expected to expose a generic webhook trigger at
/// `<base_url>/webhook/<webhookId>`.
#[derive(Debug, Clone)]
pub struct StubAutomationEngine {
    base_url: String,
}

impl StubAutomationEngine {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AutomationEngine for StubAutomationEngine {
    async fn register_workflow(
        &self,
        request: &WorkflowRequest,
    ) -> Result<WorkflowBinding, DownstreamError> {
        let binding = WorkflowBinding {
            workflow_id: format!("wf_{}", request.webhook_id),
            webhook_url: format!("{}/webhook/{}", self.base_url, request.webhook_id),
        };
        debug!(
            webhook_id = %request.webhook_id,
            workflow_id = %binding.workflow_id,
            "Bound webhook to workflow"
        );
        Ok(binding)
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Successful downstream response
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardResponse {
    pub status: u16,
    /// Response body as JSON, or a JSON string when the body is not JSON
    pub body: Value,
}

/// HTTP transport to the automation engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DownstreamTransport: Send + Sync {
    /// POST a mapped payload to `url`
    ///
    /// # Errors
    ///
    /// Non-2xx responses are returned as [`DownstreamError::Status`].
    async fn forward(
        &self,
        url: &str,
        webhook_id: &WebhookId,
        payload: &Map<String, Value>,
    ) -> Result<ForwardResponse, DownstreamError>;

    /// Check that `url` answers an OPTIONS request with a 2xx status
    async fn probe(&self, url: &str) -> Result<(), DownstreamError>;
}

/// Settings for [`HttpDownstreamTransport`]
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Timeout for forwards; `None` waits for the engine indefinitely
    pub forward_timeout: Option<Duration>,
    pub probe_timeout: Duration,
    pub api_key: Option<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            forward_timeout: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            api_key: None,
        }
    }
}

/// `reqwest` implementation of [`DownstreamTransport`]
#[derive(Debug, Clone)]
pub struct HttpDownstreamTransport {
    client: reqwest::Client,
    settings: TransportSettings,
}

impl HttpDownstreamTransport {
    /// Build the transport
    ///
    /// # Errors
    ///
    /// Returns [`DownstreamError::Configuration`] if the HTTP client cannot be created.
    pub fn new(settings: TransportSettings) -> Result<Self, DownstreamError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lum-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownstreamError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, settings })
    }

    fn with_api_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

fn parse_url(url: &str) -> Result<Url, DownstreamError> {
    Url::parse(url).map_err(|e| DownstreamError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn transport_error(url: &Url, e: reqwest::Error) -> DownstreamError {
    if e.is_timeout() {
        DownstreamError::Timeout {
            url: url.to_string(),
        }
    } else {
        DownstreamError::Connection {
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl DownstreamTransport for HttpDownstreamTransport {
    async fn forward(
        &self,
        url: &str,
        webhook_id: &WebhookId,
        payload: &Map<String, Value>,
    ) -> Result<ForwardResponse, DownstreamError> {
        let target = parse_url(url)?;

        let mut request = self
            .client
            .post(target.clone())
            .header(WEBHOOK_ID_HEADER, webhook_id.as_str())
            .json(payload);
        if let Some(timeout) = self.settings.forward_timeout {
            request = request.timeout(timeout);
        }

        let response = self
            .with_api_key(request)
            .send()
            .await
            .map_err(|e| transport_error(&target, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(&target, e))?;

        if !status.is_success() {
            warn!(
                webhook_id = %webhook_id,
                status = status.as_u16(),
                "Downstream rejected forwarded payload"
            );
            return Err(DownstreamError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(ForwardResponse {
            status: status.as_u16(),
            body,
        })
    }

    async fn probe(&self, url: &str) -> Result<(), DownstreamError> {
        let target = parse_url(url)?;

        let request = self
            .client
            .request(reqwest::Method::OPTIONS, target.clone())
            .header(HEALTH_CHECK_HEADER, "true")
            .timeout(self.settings.probe_timeout);

        let response = self
            .with_api_key(request)
            .send()
            .await
            .map_err(|e| transport_error(&target, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DownstreamError::Status {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failures talking to the automation engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownstreamError {
    #[error("Invalid downstream URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Downstream request to {url} timed out")]
    Timeout { url: String },

    #[error("Downstream connection failed: {message}")]
    Connection { message: String },

    #[error("Request failed with status code {status}")]
    Status { status: u16, body: String },

    #[error("Workflow registration failed: {message}")]
    Registration { message: String },

    #[error("Downstream configuration error: {message}")]
    Configuration { message: String },
}

impl DownstreamError {
    /// Check if retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidUrl { .. } | Self::Registration { .. } | Self::Configuration { .. } => {
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "downstream_tests.rs"]
mod tests;
