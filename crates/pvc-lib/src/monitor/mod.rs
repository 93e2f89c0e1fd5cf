//! Performance monitoring of a single claim
//!
//! A monitor provisions a diagnostic pod next to the claim's consumer,
//! retrying on resource-capacity rejections, then runs one background
//! collection loop that refreshes a shared snapshot once per interval.
//! When the pod cannot be provisioned or never becomes ready the monitor
//! still starts, in degraded mode, with figures derived from the claim
//! alone.

pub mod extractor;
pub mod fallback;
mod r#loop;


pub use extractor::{extract_disk_usage, parse_human_size, DiskUsage, LogMetrics};
pub use fallback::{FallbackMetricsProvider, FallbackProfile};

use crate::cluster::{ClusterApi, DeletePolicy};
use crate::error::{Error, Result};
use crate::models::MetricsSnapshot;
use crate::observability::StructuredLogger;
use crate::provisioner::{DiagnosticPodProvisioner, ProvisionerConfig};
use r#loop::CollectionLoop;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Timing configuration of a monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Provisioning attempts before degrading (default: 3)
    pub max_provision_attempts: u32,
    /// Wait after a resource-capacity rejection (default: 5 seconds)
    pub provision_backoff: Duration,
    /// Delay between readiness checks (default: 1 second)
    pub readiness_poll_interval: Duration,
    /// Readiness checks before giving up (default: 120)
    pub readiness_max_polls: u32,
    /// Collection interval (default: 1 second)
    pub collection_interval: Duration,
    /// Log lines fetched per cycle (default: 100)
    pub log_tail_lines: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_provision_attempts: 3,
            provision_backoff: Duration::from_secs(5),
            readiness_poll_interval: Duration::from_secs(1),
            readiness_max_polls: 120,
            collection_interval: Duration::from_secs(1),
            log_tail_lines: 100,
        }
    }
}

impl MonitorConfig {
    pub fn with_provision_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.max_provision_attempts = attempts;
        self.provision_backoff = backoff;
        self
    }

    pub fn with_readiness(mut self, interval: Duration, max_polls: u32) -> Self {
        self.readiness_poll_interval = interval;
        self.readiness_max_polls = max_polls;
        self
    }

    pub fn with_collection_interval(mut self, interval: Duration) -> Self {
        self.collection_interval = interval;
        self
    }

    pub fn with_log_tail_lines(mut self, lines: i64) -> Self {
        self.log_tail_lines = lines;
        self
    }
}

/// Lifecycle state of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Provisioning,
    Ready,
    Collecting,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonitorState::Provisioning => "provisioning",
            MonitorState::Ready => "ready",
            MonitorState::Collecting => "collecting",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Monitors the performance of one claim
///
/// Must be stopped by its owner with [`PerformanceMonitor::stop`]. Dropping
/// an unstopped monitor ends the collection loop but leaves the diagnostic
/// pod behind.
pub struct PerformanceMonitor {
    api: Arc<dyn ClusterApi>,
    namespace: String,
    claim: String,
    diagnostic_pod: Option<String>,
    degraded: bool,
    snapshot: Arc<RwLock<MetricsSnapshot>>,
    state: Arc<watch::Sender<MonitorState>>,
    shutdown: broadcast::Sender<()>,
    handle: Option<JoinHandle<u64>>,
    logger: StructuredLogger,
}

impl PerformanceMonitor {
    /// Provision the diagnostic pod and start collecting.
    ///
    /// Capacity rejections are retried up to the configured number of
    /// attempts, then the monitor degrades. A readiness failure degrades
    /// too. Any other provisioning failure aborts with [`Error::Provision`].
    pub async fn start(
        api: Arc<dyn ClusterApi>,
        config: MonitorConfig,
        provisioner_config: ProvisionerConfig,
        namespace: &str,
        consumer_pod: &str,
        claim: &str,
    ) -> Result<Self> {
        let logger = StructuredLogger::new(namespace, claim);
        let (state, _) = watch::channel(MonitorState::Provisioning);
        let state = Arc::new(state);

        let provisioner = DiagnosticPodProvisioner::new(api.clone(), provisioner_config);
        let mut diagnostic_pod =
            provision_with_retry(&provisioner, &config, &logger, namespace, consumer_pod, claim)
                .await?;

        if let Some(pod) = diagnostic_pod.clone() {
            info!(pod = %pod, "Waiting for diagnostic pod to be ready");
            if let Err(e) = wait_for_running(
                api.as_ref(),
                namespace,
                &pod,
                config.readiness_poll_interval,
                config.readiness_max_polls,
            )
            .await
            {
                logger.log_degraded(&e.to_string());
                discard_unready_pod(api.as_ref(), namespace, &pod).await;
                diagnostic_pod = None;
            }
        }

        let degraded = diagnostic_pod.is_none();
        state.send_replace(MonitorState::Ready);

        let profile = if degraded {
            FallbackProfile::Degraded
        } else {
            FallbackProfile::Sidecar
        };
        let snapshot = Arc::new(RwLock::new(MetricsSnapshot::default()));
        let (shutdown, shutdown_rx) = broadcast::channel(1);

        let collection = CollectionLoop {
            api: api.clone(),
            namespace: namespace.to_string(),
            claim: claim.to_string(),
            diagnostic_pod: diagnostic_pod.clone(),
            fallback: FallbackMetricsProvider::new(profile),
            snapshot: snapshot.clone(),
            state: state.clone(),
            interval: config.collection_interval,
            log_tail_lines: config.log_tail_lines,
        };
        let handle = tokio::spawn(collection.run(shutdown_rx));

        logger.log_monitor_started(diagnostic_pod.as_deref(), degraded);

        Ok(Self {
            api,
            namespace: namespace.to_string(),
            claim: claim.to_string(),
            diagnostic_pod,
            degraded,
            snapshot,
            state,
            shutdown,
            handle: Some(handle),
            logger,
        })
    }

    /// Most recent complete snapshot, or the zero value before the first
    /// cycle finishes
    pub async fn latest_metrics(&self) -> MetricsSnapshot {
        self.snapshot.read().await.clone()
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Name of the diagnostic pod until the monitor is stopped
    pub fn diagnostic_pod(&self) -> Option<&str> {
        self.diagnostic_pod.as_deref()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn claim(&self) -> &str {
        &self.claim
    }

    /// Stop collecting and delete the diagnostic pod.
    ///
    /// Waits for the collection loop to exit before deleting. A second call
    /// does nothing. A failed deletion is returned as [`Error::Teardown`].
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            debug!(claim = %self.claim, "Monitor already stopped");
            return Ok(());
        };

        // The receiver only goes away when the loop has already exited
        let _ = self.shutdown.send(());
        let cycles = match handle.await {
            Ok(cycles) => cycles,
            Err(e) => {
                warn!(error = %e, "Collection loop ended abnormally");
                0
            }
        };
        self.state.send_replace(MonitorState::Stopped);

        let result = match self.diagnostic_pod.take() {
            Some(pod) => self.delete_diagnostic_pod(pod).await,
            None => Ok(()),
        };

        self.logger.log_monitor_stopped(cycles);
        result
    }

    async fn delete_diagnostic_pod(&self, pod: String) -> Result<()> {
        match self
            .api
            .delete_pod(&self.namespace, &pod, DeletePolicy::Immediate)
            .await
        {
            Ok(()) => {
                self.logger.log_pod_deleted(&pod, true);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(pod = %pod, "Diagnostic pod already gone");
                Ok(())
            }
            Err(e) => {
                self.logger.log_pod_deleted(&pod, false);
                Err(Error::Teardown {
                    name: pod,
                    source: Box::new(e),
                })
            }
        }
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!(
                claim = %self.claim,
                diagnostic_pod = ?self.diagnostic_pod,
                "Performance monitor dropped without stop"
            );
        }
    }
}

/// Provision with bounded retries. `Ok(None)` means capacity ran out on
/// every attempt and the monitor should degrade.
async fn provision_with_retry(
    provisioner: &DiagnosticPodProvisioner,
    config: &MonitorConfig,
    logger: &StructuredLogger,
    namespace: &str,
    consumer_pod: &str,
    claim: &str,
) -> Result<Option<String>> {
    let max_attempts = config.max_provision_attempts.max(1);

    for attempt in 1..=max_attempts {
        match provisioner.provision(namespace, consumer_pod, claim).await {
            Ok(pod) => {
                logger.log_provision_attempt(attempt, max_attempts, None);
                return Ok(Some(pod));
            }
            Err(e) if e.is_resource_capacity() => {
                logger.log_provision_attempt(attempt, max_attempts, Some(&e.to_string()));
                if attempt < max_attempts {
                    tokio::time::sleep(config.provision_backoff).await;
                } else {
                    logger.log_degraded(&format!(
                        "no capacity for diagnostic pod after {} attempts: {}",
                        max_attempts, e
                    ));
                }
            }
            Err(e) => {
                logger.log_provision_attempt(attempt, max_attempts, Some(&e.to_string()));
                return Err(Error::Provision(Box::new(e)));
            }
        }
    }

    Ok(None)
}

/// Poll until the pod is running. Fails once the poll bound is used up or
/// the pod reaches a terminal phase.
pub async fn wait_for_running(
    api: &dyn ClusterApi,
    namespace: &str,
    name: &str,
    poll_interval: Duration,
    max_polls: u32,
) -> Result<()> {
    for _ in 0..max_polls {
        match api.get_pod(namespace, name).await? {
            Some(pod) if pod.is_running() => return Ok(()),
            Some(pod) if pod.phase.is_terminal() => {
                return Err(Error::PodNotReady {
                    name: name.to_string(),
                    reason: format!("pod reached phase {}", pod.phase),
                });
            }
            Some(pod) => debug!(pod = %name, phase = %pod.phase, "Diagnostic pod not running yet"),
            None => debug!(pod = %name, "Diagnostic pod not visible yet"),
        }
        tokio::time::sleep(poll_interval).await;
    }

    Err(Error::PodNotReady {
        name: name.to_string(),
        reason: format!("not running after {} checks", max_polls),
    })
}

/// Best-effort removal of a pod that never became ready
async fn discard_unready_pod(api: &dyn ClusterApi, namespace: &str, pod: &str) {
    if let Err(e) = api.delete_pod(namespace, pod, DeletePolicy::Immediate).await {
        warn!(pod = %pod, error = %e, "Failed to remove unready diagnostic pod");
    }
}
