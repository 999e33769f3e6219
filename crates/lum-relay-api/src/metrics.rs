//! Prometheus metrics for the API service.
//!
//! Each [`ServiceMetrics`] owns its own [`Registry`], so several instances can
//! coexist in one process (tests build one per router).

use lum_relay_core::RelayMetrics;
use prometheus::{
    register_histogram_vec_with_registry, register_histogram_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry, Histogram,
    HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,

    // Relay metrics
    pub forwards_total: IntCounterVec,
    pub forward_duration_seconds: Histogram,
    pub validation_rejections_total: IntCounterVec,
    pub health_probes_total: IntCounterVec,
    pub recoveries_total: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Arc::new(Self {
            http_requests_total: register_int_counter_vec_with_registry!(
                "http_requests_total",
                "Total number of HTTP requests",
                &["method", "route", "status"],
                registry
            )?,
            http_request_duration: register_histogram_vec_with_registry!(
                "http_request_duration_seconds",
                "HTTP request processing time",
                &["method", "route"],
                vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 30.0],
                registry
            )?,

            forwards_total: register_int_counter_vec_with_registry!(
                "relay_forwards_total",
                "Payloads forwarded to the automation engine",
                &["outcome"],
                registry
            )?,
            forward_duration_seconds: register_histogram_with_registry!(
                "relay_forward_duration_seconds",
                "Round-trip time of downstream forwards",
                vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 30.0],
                registry
            )?,
            validation_rejections_total: register_int_counter_vec_with_registry!(
                "relay_validation_rejections_total",
                "Inbound payloads rejected before forwarding",
                &["reason"],
                registry
            )?,
            health_probes_total: register_int_counter_vec_with_registry!(
                "relay_health_probes_total",
                "Downstream health probes by outcome",
                &["outcome"],
                registry
            )?,
            recoveries_total: register_int_counter_with_registry!(
                "relay_recoveries_total",
                "Webhooks returned to active by a health probe",
                registry
            )?,
            registry,
        }))
    }

    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, route, &status.to_string()])
            .inc();
        self.http_request_duration
            .with_label_values(&[method, route])
            .observe(duration.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

fn outcome_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

impl RelayMetrics for ServiceMetrics {
    fn record_forward(&self, duration: Duration, success: bool) {
        self.forwards_total
            .with_label_values(&[outcome_label(success)])
            .inc();
        self.forward_duration_seconds
            .observe(duration.as_secs_f64());
    }

    fn record_validation_rejection(&self, reason: &str) {
        self.validation_rejections_total
            .with_label_values(&[reason])
            .inc();
    }

    fn record_health_probe(&self, healthy: bool) {
        self.health_probes_total
            .with_label_values(&[outcome_label(healthy)])
            .inc();
    }

    fn record_recovery(&self) {
        self.recoveries_total.inc();
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
