//! Metrics collection for relay operations.
//!
//! The domain layer states *what* is measured through [`RelayMetrics`]; the
//! API crate implements it with Prometheus. Recording is best-effort and never
//! fails, so a broken metrics backend cannot affect webhook delivery.
//!
//! # Examples
//!
//! ```rust
//! use lum_relay_core::metrics::{NoOpRelayMetrics, RelayMetrics};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let metrics: Arc<dyn RelayMetrics> = Arc::new(NoOpRelayMetrics);
//!
//! metrics.record_forward(Duration::from_millis(150), true);
//! metrics.record_validation_rejection("missing_parameters");
//! metrics.record_health_probe(false);
//! ```

use std::time::Duration;

/// Metrics sink for relay operations
///
/// All methods take `&self` so an `Arc<dyn RelayMetrics>` can be shared
/// across request handlers and the health monitor task.
pub trait RelayMetrics: Send + Sync {
    /// Record one forward to the downstream engine.
    ///
    /// # Metrics Updated
    ///
    /// - `relay_forwards_total{outcome}`: Incremented by 1
    /// - `relay_forward_duration_seconds`: Histogram observation
    fn record_forward(&self, duration: Duration, success: bool);

    /// Record an inbound payload rejected before forwarding.
    ///
    /// `reason` is a short label such as `"not_found"` or `"missing_parameters"`.
    fn record_validation_rejection(&self, reason: &str);

    /// Record one downstream health probe.
    fn record_health_probe(&self, healthy: bool);

    /// Record a webhook returning to `active` after a failed probe.
    fn record_recovery(&self);
}

/// Metrics sink that discards everything
///
/// Used in tests and when metrics are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRelayMetrics;

impl RelayMetrics for NoOpRelayMetrics {
    fn record_forward(&self, _duration: Duration, _success: bool) {}

    fn record_validation_rejection(&self, _reason: &str) {}

    fn record_health_probe(&self, _healthy: bool) {}

    fn record_recovery(&self) {}
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
