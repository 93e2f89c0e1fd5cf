//! Core data models shared by the usage and performance pipelines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a persistent volume claim
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimRef {
    pub namespace: String,
    pub name: String,
}

impl ClaimRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// One volume row of a node's stats report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeStat {
    /// Claim backing the volume, if any
    pub claim: Option<ClaimRef>,
    pub capacity_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

/// Usage of a single claim as reported by one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub namespace: String,
    pub pvc: String,
    /// Node whose stats report produced this record
    pub node: String,
    pub capacity_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub percentage_used: f64,
}

impl UsageRecord {
    /// Build a record from a stats row. Returns `None` for rows without a
    /// claim reference or with zero capacity.
    pub fn from_stat(node: &str, stat: &VolumeStat) -> Option<Self> {
        let claim = stat.claim.as_ref()?;
        if stat.capacity_bytes == 0 {
            return None;
        }

        Some(Self {
            namespace: claim.namespace.clone(),
            pvc: claim.name.clone(),
            node: node.to_string(),
            capacity_bytes: stat.capacity_bytes,
            used_bytes: stat.used_bytes,
            available_bytes: stat.available_bytes,
            percentage_used: stat.used_bytes as f64 / stat.capacity_bytes as f64 * 100.0,
        })
    }
}

/// Pod lifecycle phase as reported by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl PodPhase {
    pub fn parse(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => Self::Pending,
            Some("Running") => Self::Running,
            Some("Succeeded") => Self::Succeeded,
            Some("Failed") => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Returns true once the pod can never reach `Running` again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// The subset of a pod the matcher and provisioner care about
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub phase: PodPhase,
    /// Names of claims mounted by the pod's volumes
    pub claim_refs: Vec<String>,
    pub node_name: Option<String>,
}

impl PodInfo {
    pub fn is_running(&self) -> bool {
        self.phase == PodPhase::Running
    }

    pub fn uses_claim(&self, claim_name: &str) -> bool {
        self.claim_refs.iter().any(|c| c == claim_name)
    }
}

/// Claim metadata from the control plane
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClaimInfo {
    pub namespace: String,
    pub name: String,
    /// Requested storage in bytes, zero if unset
    pub requested_capacity_bytes: u64,
    pub access_modes: Vec<String>,
}

/// Where the figures of a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSource {
    /// Initial zero-value snapshot, nothing collected yet
    #[default]
    None,
    /// Disk figures read from the diagnostic pod
    Measured,
    /// Diagnostic pod is running but its logs were unusable this cycle
    Estimated,
    /// No diagnostic pod, claim metadata only
    Degraded,
}

/// Point-in-time performance metrics for a claim
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub iops: u64,
    pub throughput_bytes_per_sec: u64,
    pub latency_ms: u64,
    pub disk_util_percent: f64,
    pub capacity_bytes: u64,
    /// `None` when no real disk-usage figure is available
    pub used_bytes: Option<u64>,
    pub used_percent: Option<f64>,
    pub read_only: bool,
    pub system_load: f64,
    pub cpu_wait_percent: f64,
    pub source: MetricsSource,
}

impl MetricsSnapshot {
    /// Available bytes, when the used figure is known
    pub fn available_bytes(&self) -> Option<u64> {
        self.used_bytes
            .map(|used| self.capacity_bytes.saturating_sub(used))
    }
}
