//! # Lum Relay Core
//!
//! Core business logic for the Lum webhook relay.
//!
//! Call-tracking platforms POST call-completion data to a per-tenant public
//! webhook URL. This crate validates those payloads against the webhook's
//! configuration, maps them to the field set the owner opted into, forwards
//! them to the downstream automation engine and records delivery statistics.
//!
//! ## Architecture
//!
//! - Business logic depends only on trait abstractions
//!   ([`WebhookConfigStore`], [`AutomationEngine`], [`DownstreamTransport`],
//!   [`RelayMetrics`])
//! - Infrastructure implementations are injected at runtime
//! - The HTTP surface lives in `lum-relay-api`
//!
//! ## Usage
//!
//! ```rust
//! use lum_relay_core::{UserId, WebhookId};
//!
//! let user_id = UserId::new("user-123").unwrap();
//! let webhook_id = WebhookId::generate();
//! assert!(!webhook_id.as_str().is_empty());
//! assert_eq!(user_id.as_str(), "user-123");
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub use ulid::Ulid;
pub use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the webhook identifier on every forwarded request
pub const WEBHOOK_ID_HEADER: &str = "X-Lum-Webhook-Id";

/// Header marking downstream health probes
pub const HEALTH_CHECK_HEADER: &str = "X-Lum-Health-Check";

/// Source tag written into the `metadata` block of every mapped payload
pub const PAYLOAD_SOURCE: &str = "lum-webhook-service";

/// Fields every inbound payload must carry
pub const DEFAULT_REQUIRED_PARAMETERS: [&str; 3] = ["campaign_name", "campaign_id", "recording_url"];

/// Maximum length of any externally supplied identifier
const MAX_IDENTIFIER_LENGTH: usize = 128;

// ============================================================================
// Domain Identifier Types
// ============================================================================

fn validate_identifier(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length: MAX_IDENTIFIER_LENGTH,
        });
    }

    // Identifiers end up as URL path segments
    if !value.chars().all(|c| c.is_ascii_graphic() && c != '/') {
        return Err(ValidationError::InvalidCharacters {
            field: field.to_string(),
            invalid_chars: "non-ASCII, whitespace or '/'".to_string(),
        });
    }

    Ok(())
}

/// Identifier of the tenant user that owns a webhook
///
/// Issued by the authentication provider; treated as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create new user ID with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_identifier("user_id", &value)?;
        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// Identifier of the workspace a webhook belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Create new workspace ID with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_identifier("workspace_id", &value)?;
        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkspaceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for WorkspaceId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkspaceId> for String {
    fn from(value: WorkspaceId) -> Self {
        value.0
    }
}

/// Globally unique webhook identifier
///
/// Generated from a ULID at creation time and immutable afterwards. Inbound
/// identifiers are parsed with the generic identifier rules so that unknown
/// IDs surface as "not found" rather than as format errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WebhookId(String);

impl WebhookId {
    /// Generate a new unique webhook ID
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    /// Create webhook ID from an existing value
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        validate_identifier("webhook_id", &value)?;
        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WebhookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WebhookId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for WebhookId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WebhookId> for String {
    fn from(value: WebhookId) -> Self {
        value.0
    }
}

// ============================================================================
// Time and Metadata Types
// ============================================================================

/// UTC timestamp
///
/// Serialized as RFC3339 with a fixed nine-digit fraction and a `Z` suffix,
/// so stored values sort lexicographically in time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// RFC3339 with millisecond precision, e.g. `2024-03-01T12:30:00.000Z`
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn to_storage_string(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_storage_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DateTime::<Utc>::deserialize(deserializer).map(Self)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// Identifier for tracing requests across system boundaries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate new correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get string representation
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = s.parse::<Uuid>().map_err(|_| ParseError::InvalidFormat {
            expected: "UUID format".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self(uuid))
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Field-level validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    TooLong { field: String, max_length: usize },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Payload filtering and renaming
pub mod parameters;

/// Webhook configuration model
pub mod webhook;

/// Persistence abstraction for webhook configurations
pub mod store;

/// Store implementations
pub mod adapters;

/// Downstream automation engine integration
pub mod downstream;

/// Webhook orchestration service
pub mod service;

/// Periodic downstream health checks
pub mod monitoring;

/// Metrics collection abstraction
pub mod metrics;

pub use adapters::{FilesystemWebhookConfigStore, InMemoryWebhookConfigStore};
pub use downstream::{
    AutomationEngine, DownstreamError, DownstreamTransport, ForwardResponse,
    HttpDownstreamTransport, StubAutomationEngine, TransportSettings, WorkflowBinding,
    WorkflowRequest,
};
pub use metrics::{NoOpRelayMetrics, RelayMetrics};
pub use monitoring::{
    HealthCheckSummary, HealthMonitor, HealthReport, MonitorSettings, RecentError,
};
pub use parameters::{map_parameters, missing_required_parameters};
pub use service::{
    GenerateWebhook, ProcessResponse, ServiceError, ServiceSettings, WebhookService,
};
pub use store::{CallOutcome, HealthUpdate, StoreError, WebhookConfigStore, WebhookUpdate};
pub use webhook::{
    sanitize_webhook_config, WebhookConfig, WebhookStats, WebhookStatus, WebhookView,
};

#[cfg(test)]
pub(crate) mod test_fixtures;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
