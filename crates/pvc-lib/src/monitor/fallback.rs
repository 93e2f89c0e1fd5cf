//! Placeholder figures for cycles without measured data
//!
//! The diagnostic command has no reliable source for IOPS, throughput,
//! latency or device utilisation, so those are always placeholders. They
//! vary with the second of the sample timestamp and stay inside fixed
//! ranges per profile. Used space is never invented: it stays `None`.

use crate::models::{MetricsSnapshot, MetricsSource};
use chrono::{DateTime, Timelike, Utc};

const MIB: u64 = 1024 * 1024;
const KIB: u64 = 1024;

/// Which placeholder ranges to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackProfile {
    /// Diagnostic pod running, its logs unusable this cycle
    Sidecar,
    /// No diagnostic pod at all
    Degraded,
}

/// Produces bounded placeholder snapshots
#[derive(Debug, Clone, Copy)]
pub struct FallbackMetricsProvider {
    profile: FallbackProfile,
}

impl FallbackMetricsProvider {
    pub fn new(profile: FallbackProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> FallbackProfile {
        self.profile
    }

    /// Placeholder snapshot for a claim of `capacity_bytes`
    pub fn snapshot(&self, timestamp: DateTime<Utc>, capacity_bytes: u64) -> MetricsSnapshot {
        let s = u64::from(timestamp.second());

        match self.profile {
            // 30-69% util, 100-159 IOPS, 5-14 MiB/s, 1-5 ms
            FallbackProfile::Sidecar => MetricsSnapshot {
                timestamp,
                iops: 100 + s,
                throughput_bytes_per_sec: MIB * (5 + s % 10),
                latency_ms: 1 + s % 5,
                disk_util_percent: (30 + s % 40) as f64,
                capacity_bytes,
                used_bytes: None,
                used_percent: None,
                read_only: true,
                system_load: 1.0 + (s % 100) as f64 / 50.0,
                cpu_wait_percent: (1 + s % 30) as f64,
                source: MetricsSource::Estimated,
            },
            // 20-49% util, 50-99 IOPS, 1-3 MiB/s, 5-14 ms
            FallbackProfile::Degraded => MetricsSnapshot {
                timestamp,
                iops: 50 + s % 50,
                throughput_bytes_per_sec: 512 * KIB * (2 + s % 5),
                latency_ms: 5 + s % 10,
                disk_util_percent: (20 + s % 30) as f64,
                capacity_bytes,
                used_bytes: None,
                used_percent: None,
                read_only: true,
                system_load: 0.5 + (s % 50) as f64 / 100.0,
                cpu_wait_percent: (s % 5) as f64,
                source: MetricsSource::Degraded,
            },
        }
    }
}
