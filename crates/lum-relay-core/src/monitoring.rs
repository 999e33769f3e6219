//! # Downstream Health Monitoring
//!
//! Periodically probes the downstream URL of every live webhook and moves it
//! between `active` and `error` according to the result.
//!
//! The monitor is an explicit lifecycle object: [`HealthMonitor::start`]
//! spawns the polling task and [`HealthMonitor::stop`] shuts it down and
//! waits for it. One tick can also be driven directly with
//! [`HealthMonitor::run_health_checks`].
//!
//! # Examples
//!
//! ```rust
//! use lum_relay_core::{
//!     HealthMonitor, HttpDownstreamTransport, InMemoryWebhookConfigStore, MonitorSettings,
//!     NoOpRelayMetrics, TransportSettings,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = HealthMonitor::new(
//!     Arc::new(InMemoryWebhookConfigStore::new()),
//!     Arc::new(HttpDownstreamTransport::new(TransportSettings::default())?),
//!     Arc::new(NoOpRelayMetrics),
//!     MonitorSettings::default(),
//! );
//!
//! monitor.start().await;
//! // ... serve traffic ...
//! monitor.stop().await;
//! # Ok(())
//! # }
//! ```

use crate::downstream::DownstreamTransport;
use crate::metrics::RelayMetrics;
use crate::store::{HealthUpdate, StoreError, WebhookConfigStore};
use crate::webhook::{WebhookConfig, WebhookStatus};
use crate::{Timestamp, WebhookId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Default interval between health-check ticks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Maximum number of entries in [`HealthReport::recent_errors`]
pub const MAX_RECENT_ERRORS: usize = 10;

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub enabled: bool,
    pub interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

/// Outcome of one health-check tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckSummary {
    pub checked: usize,
    pub healthy: usize,
    pub failed: usize,
    /// Webhooks moved from `error` back to `active`
    pub recovered: usize,
}

/// A webhook currently in `error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentError {
    pub webhook_id: WebhookId,
    pub name: String,
    pub error: Option<String>,
    pub occurred_at: Option<Timestamp>,
}

/// Aggregate health across all webhooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub total: usize,
    pub active: usize,
    pub error: usize,
    pub inactive: usize,
    /// Share of webhooks in `active`, 0-100
    pub healthy_percentage: f64,
    /// Newest first, at most [`MAX_RECENT_ERRORS`]
    pub recent_errors: Vec<RecentError>,
    pub checked_at: Timestamp,
}

struct RunningTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodic downstream health checker
pub struct HealthMonitor {
    checker: Arc<Checker>,
    settings: MonitorSettings,
    task: Mutex<Option<RunningTask>>,
}

struct Checker {
    store: Arc<dyn WebhookConfigStore>,
    transport: Arc<dyn DownstreamTransport>,
    metrics: Arc<dyn RelayMetrics>,
}

impl HealthMonitor {
    pub fn new(
        store: Arc<dyn WebhookConfigStore>,
        transport: Arc<dyn DownstreamTransport>,
        metrics: Arc<dyn RelayMetrics>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            checker: Arc::new(Checker {
                store,
                transport,
                metrics,
            }),
            settings,
            task: Mutex::new(None),
        }
    }

    /// Spawn the polling task
    ///
    /// Returns `false` without spawning when monitoring is disabled or the
    /// task is already running. The first tick fires one full interval after
    /// start.
    pub async fn start(&self) -> bool {
        if !self.settings.enabled {
            info!("Webhook health checks disabled");
            return false;
        }

        let mut task = self.task.lock().await;
        if task.is_some() {
            debug!("Health monitor already running");
            return false;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let checker = Arc::clone(&self.checker);
        let period = self.settings.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match checker.run().await {
                            Ok(summary) => info!(
                                checked = summary.checked,
                                healthy = summary.healthy,
                                failed = summary.failed,
                                recovered = summary.recovered,
                                "Completed webhook health checks"
                            ),
                            Err(e) => error!(error = %e, "Webhook health check tick failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("Health monitor task exiting");
        });

        *task = Some(RunningTask { shutdown, handle });
        info!(interval_secs = period.as_secs(), "Started webhook health monitor");
        true
    }

    /// Signal the polling task to stop and wait for it
    ///
    /// A tick in progress finishes first. Calling `stop` on a monitor that is
    /// not running does nothing.
    pub async fn stop(&self) {
        let Some(running) = self.task.lock().await.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        if let Err(e) = running.handle.await {
            warn!(error = %e, "Health monitor task ended abnormally");
        }
        info!("Stopped webhook health monitor");
    }

    /// Check whether the polling task is running
    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// Probe every `active` and `error` webhook once
    ///
    /// Probe failures are recorded on the webhook and never abort the tick.
    ///
    /// # Errors
    ///
    /// Returns error only when the webhook list cannot be loaded.
    pub async fn run_health_checks(&self) -> Result<HealthCheckSummary, StoreError> {
        self.checker.run().await
    }

    /// Aggregate status counts and the most recent failures
    pub async fn get_health_status(&self) -> Result<HealthReport, StoreError> {
        let configs = self
            .checker
            .store
            .list_by_status(&[
                WebhookStatus::Active,
                WebhookStatus::Inactive,
                WebhookStatus::Error,
            ])
            .await?;

        Ok(build_report(&configs, Timestamp::now()))
    }
}

impl Checker {
    async fn run(&self) -> Result<HealthCheckSummary, StoreError> {
        let configs = self
            .store
            .list_by_status(&[WebhookStatus::Active, WebhookStatus::Error])
            .await?;

        let mut summary = HealthCheckSummary::default();
        for config in &configs {
            summary.checked += 1;
            match self.transport.probe(&config.n8n_webhook_url).await {
                Ok(()) => {
                    summary.healthy += 1;
                    self.metrics.record_health_probe(true);
                    if config.status == WebhookStatus::Error {
                        let update = HealthUpdate::Recovered {
                            at: Timestamp::now(),
                        };
                        if self.write(&config.webhook_id, &update).await {
                            summary.recovered += 1;
                            self.metrics.record_recovery();
                            info!(webhook_id = %config.webhook_id, "Webhook recovered");
                        }
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    self.metrics.record_health_probe(false);
                    warn!(webhook_id = %config.webhook_id, error = %e, "Webhook health probe failed");
                    let update = HealthUpdate::Failed {
                        error: e.to_string(),
                        at: Timestamp::now(),
                    };
                    self.write(&config.webhook_id, &update).await;
                }
            }
        }

        Ok(summary)
    }

    async fn write(&self, webhook_id: &WebhookId, update: &HealthUpdate) -> bool {
        match self.store.set_health(webhook_id, update).await {
            Ok(found) => found,
            Err(e) => {
                error!(webhook_id = %webhook_id, error = %e, "Failed to record health result");
                false
            }
        }
    }
}

fn build_report(configs: &[WebhookConfig], checked_at: Timestamp) -> HealthReport {
    let count = |status: WebhookStatus| configs.iter().filter(|c| c.status == status).count();
    let total = configs.len();
    let active = count(WebhookStatus::Active);

    let healthy_percentage = if total == 0 {
        0.0
    } else {
        active as f64 / total as f64 * 100.0
    };

    let mut errored: Vec<&WebhookConfig> = configs
        .iter()
        .filter(|c| c.status == WebhookStatus::Error)
        .collect();
    errored.sort_by(|a, b| b.stats.last_error_at.cmp(&a.stats.last_error_at));

    let recent_errors = errored
        .into_iter()
        .take(MAX_RECENT_ERRORS)
        .map(|c| RecentError {
            webhook_id: c.webhook_id.clone(),
            name: c.name.clone(),
            error: c.stats.last_error.clone(),
            occurred_at: c.stats.last_error_at,
        })
        .collect();

    HealthReport {
        total,
        active,
        error: count(WebhookStatus::Error),
        inactive: count(WebhookStatus::Inactive),
        healthy_percentage,
        recent_errors,
        checked_at,
    }
}

#[cfg(test)]
#[path = "monitoring_tests.rs"]
mod tests;
