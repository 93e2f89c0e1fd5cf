//! Background collection loop
//!
//! Refreshes the monitor snapshot once per interval until shutdown is
//! signalled. A cycle that has started always completes and publishes
//! before shutdown is observed, and no new cycle starts once it is.

use super::extractor::LogMetrics;
use super::fallback::FallbackMetricsProvider;
use super::MonitorState;
use crate::cluster::ClusterApi;
use crate::models::{MetricsSnapshot, MetricsSource};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub(crate) struct CollectionLoop {
    pub api: Arc<dyn ClusterApi>,
    pub namespace: String,
    pub claim: String,
    /// `None` in degraded mode
    pub diagnostic_pod: Option<String>,
    pub fallback: FallbackMetricsProvider,
    pub snapshot: Arc<RwLock<MetricsSnapshot>>,
    pub state: Arc<watch::Sender<MonitorState>>,
    pub interval: Duration,
    pub log_tail_lines: i64,
}

impl CollectionLoop {
    /// Run until shutdown, returning the number of completed cycles
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        info!(
            claim = %self.claim,
            interval_ms = self.interval.as_millis() as u64,
            degraded = self.diagnostic_pod.is_none(),
            "Starting metrics collection loop"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    info!(claim = %self.claim, "Shutting down metrics collection loop");
                    break;
                }
                _ = ticker.tick() => {
                    let start = Instant::now();

                    if let Some(snapshot) = self.collect_once().await {
                        *self.snapshot.write().await = snapshot;
                    }

                    cycles += 1;
                    if cycles == 1 {
                        self.state.send_replace(MonitorState::Collecting);
                    }

                    if cycles % 60 == 0 {
                        debug!(
                            claim = %self.claim,
                            cycles = cycles,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "Collection cycle complete"
                        );
                    }
                }
            }
        }

        cycles
    }

    /// Build one snapshot. Returns `None` when the claim itself cannot be
    /// read, in which case the previous snapshot stays published.
    pub async fn collect_once(&self) -> Option<MetricsSnapshot> {
        let now = Utc::now();

        let capacity = match self.api.get_claim(&self.namespace, &self.claim).await {
            Ok(claim) => claim.requested_capacity_bytes,
            Err(e) => {
                warn!(claim = %self.claim, error = %e, "Error getting claim, keeping previous metrics");
                return None;
            }
        };

        let Some(pod) = &self.diagnostic_pod else {
            return Some(self.fallback.snapshot(now, capacity));
        };

        let logs = match self
            .api
            .pod_logs(&self.namespace, pod, self.log_tail_lines)
            .await
        {
            Ok(logs) if !logs.trim().is_empty() => logs,
            Ok(_) => {
                debug!(pod = %pod, "Diagnostic pod logs empty, using estimates");
                return Some(self.fallback.snapshot(now, capacity));
            }
            Err(e) => {
                debug!(pod = %pod, error = %e, "Could not read diagnostic pod logs, using estimates");
                return Some(self.fallback.snapshot(now, capacity));
            }
        };

        Some(merge_log_metrics(
            self.fallback.snapshot(now, capacity),
            LogMetrics::parse(&logs),
        ))
    }
}

/// Overlay measured figures on a placeholder snapshot
fn merge_log_metrics(mut snapshot: MetricsSnapshot, metrics: LogMetrics) -> MetricsSnapshot {
    if let Some(disk) = metrics.disk {
        snapshot.capacity_bytes = disk.total_bytes;
        snapshot.used_bytes = Some(disk.used_bytes);
        snapshot.used_percent = Some(disk.used_percent);
        snapshot.source = MetricsSource::Measured;
    }
    if let Some(load) = metrics.system_load {
        snapshot.system_load = load;
    }
    if let Some(wait) = metrics.cpu_wait_percent {
        snapshot.cpu_wait_percent = wait;
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::extractor::DiskUsage;
    use crate::monitor::FallbackProfile;
    use crate::testing::MockCluster;
    use std::sync::atomic::Ordering;

    fn placeholder() -> MetricsSnapshot {
        FallbackMetricsProvider::new(FallbackProfile::Sidecar).snapshot(Utc::now(), 500)
    }

    fn slow_loop(cluster: &Arc<MockCluster>) -> CollectionLoop {
        CollectionLoop {
            api: cluster.clone(),
            namespace: "default".to_string(),
            claim: "data-kafka-0".to_string(),
            diagnostic_pod: None,
            fallback: FallbackMetricsProvider::new(FallbackProfile::Degraded),
            snapshot: Arc::new(RwLock::new(MetricsSnapshot::default())),
            state: Arc::new(watch::channel(MonitorState::Ready).0),
            interval: Duration::from_millis(1),
            log_tail_lines: 100,
        }
    }

    #[tokio::test]
    async fn test_no_cycle_starts_after_shutdown_mid_cycle() {
        for _ in 0..20 {
            let cluster =
                Arc::new(MockCluster::new(vec![]).with_claim_delay(Duration::from_millis(20)));
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            let handle = tokio::spawn(slow_loop(&cluster).run(shutdown_rx));

            // Lands inside the second cycle's claim lookup
            tokio::time::sleep(Duration::from_millis(30)).await;
            shutdown_tx.send(()).unwrap();
            let calls_at_shutdown = cluster.claim_calls.load(Ordering::SeqCst);

            let cycles = handle.await.unwrap();
            assert_eq!(cluster.claim_calls.load(Ordering::SeqCst), calls_at_shutdown);
            assert_eq!(cycles as usize, calls_at_shutdown);
        }
    }

    #[test]
    fn test_merge_measured_disk() {
        let merged = merge_log_metrics(
            placeholder(),
            LogMetrics {
                disk: Some(DiskUsage {
                    total_bytes: 1000,
                    used_bytes: 250,
                    used_percent: 25.0,
                }),
                system_load: Some(0.25),
                cpu_wait_percent: None,
            },
        );

        assert_eq!(merged.source, MetricsSource::Measured);
        assert_eq!(merged.capacity_bytes, 1000);
        assert_eq!(merged.used_bytes, Some(250));
        assert_eq!(merged.available_bytes(), Some(750));
        assert_eq!(merged.system_load, 0.25);
    }

    #[test]
    fn test_merge_without_disk_stays_estimated() {
        let base = placeholder();
        let merged = merge_log_metrics(
            base.clone(),
            LogMetrics {
                disk: None,
                system_load: None,
                cpu_wait_percent: Some(4.5),
            },
        );

        assert_eq!(merged.source, MetricsSource::Estimated);
        assert_eq!(merged.capacity_bytes, 500);
        assert_eq!(merged.used_bytes, None);
        assert_eq!(merged.cpu_wait_percent, 4.5);
        assert_eq!(merged.system_load, base.system_load);
    }
}
