//! Cluster collaborators
//!
//! The pipelines never talk to the control plane directly. They depend on
//! two traits, `StatsSource` for per-node volume statistics and
//! `ClusterApi` for pod and claim introspection, bundled in a
//! `ClusterContext` that is handed to every component constructor.
//! `KubeCluster` implements both against a live cluster.

mod kube_cluster;
mod quantity;
mod summary;

pub use kube_cluster::KubeCluster;
pub use quantity::parse_quantity;
pub use summary::{PvcRef, Summary, SummaryPod, SummaryVolume};

use crate::error::Result;
use crate::models::{ClaimInfo, PodInfo, VolumeStat};
use k8s_openapi::api::core::v1::Pod;
use std::sync::Arc;

pub use async_trait::async_trait;

/// How a pod should be removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Platform defaults for grace period and propagation
    #[default]
    Default,
    /// Zero grace period, foreground cascading deletion
    Immediate,
}

/// Source of per-node volume statistics
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// List the names of all nodes in the cluster
    async fn list_nodes(&self) -> Result<Vec<String>>;

    /// Fetch the volume rows of one node's stats report
    async fn volume_stats(&self, node: &str) -> Result<Vec<VolumeStat>>;
}

/// Pod and claim introspection plus pod lifecycle calls
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List all pods of a namespace, in the order the platform returns them
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>>;

    /// Fetch a single pod, `None` if it does not exist
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<PodInfo>>;

    /// Fetch claim metadata
    async fn get_claim(&self, namespace: &str, name: &str) -> Result<ClaimInfo>;

    /// Fetch the last `tail_lines` lines of a pod's log
    async fn pod_logs(&self, namespace: &str, name: &str, tail_lines: i64) -> Result<String>;

    /// Submit a pod and return the created pod's name
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<String>;

    /// Delete a pod
    async fn delete_pod(&self, namespace: &str, name: &str, policy: DeletePolicy) -> Result<()>;
}

/// Explicit handle on the cluster collaborators
#[derive(Clone)]
pub struct ClusterContext {
    pub stats: Arc<dyn StatsSource>,
    pub api: Arc<dyn ClusterApi>,
}

impl ClusterContext {
    pub fn new(stats: Arc<dyn StatsSource>, api: Arc<dyn ClusterApi>) -> Self {
        Self { stats, api }
    }

    /// Build a context backed by a single live cluster connection
    pub fn from_client(client: kube::Client) -> Self {
        let cluster = Arc::new(KubeCluster::new(client));
        Self {
            stats: cluster.clone(),
            api: cluster,
        }
    }
}
