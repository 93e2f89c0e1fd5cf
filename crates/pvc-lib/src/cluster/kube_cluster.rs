//! Live cluster implementation of the collaborator traits

use super::{parse_quantity, ClusterApi, DeletePolicy, StatsSource, Summary};
use crate::error::{is_capacity_message, Error, Result};
use crate::models::{ClaimInfo, PodInfo, PodPhase, VolumeStat};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolumeClaim, Pod};
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams, PropagationPolicy};
use kube::Client;
use tracing::debug;

/// Kubernetes API client implementing `StatsSource` and `ClusterApi`
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl StatsSource for KubeCluster {
    async fn list_nodes(&self) -> Result<Vec<String>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|node| node.metadata.name)
            .collect())
    }

    async fn volume_stats(&self, node: &str) -> Result<Vec<VolumeStat>> {
        let path = format!("/api/v1/nodes/{}/proxy/stats/summary", node);
        let request = http::Request::get(path)
            .body(Vec::new())
            .map_err(kube::Error::HttpError)?;

        let raw = self.client.request_text(request).await?;
        let summary: Summary = serde_json::from_str(&raw).map_err(|source| Error::StatsDecode {
            node: node.to_string(),
            source,
        })?;

        let stats = summary.into_volume_stats();
        debug!(node = %node, volumes = stats.len(), "Fetched node stats summary");
        Ok(stats)
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>> {
        let list = self.pods(namespace).list(&ListParams::default()).await?;
        Ok(list.items.iter().map(pod_info).collect())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<PodInfo>> {
        let pod = self.pods(namespace).get_opt(name).await?;
        Ok(pod.as_ref().map(pod_info))
    }

    async fn get_claim(&self, namespace: &str, name: &str) -> Result<ClaimInfo> {
        let claims: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let claim = claims
            .get_opt(name)
            .await?
            .ok_or_else(|| Error::ClaimNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let spec = claim.spec.unwrap_or_default();
        let requested = spec
            .resources
            .and_then(|r| r.requests)
            .and_then(|requests| requests.get("storage").cloned())
            .and_then(|quantity| parse_quantity(&quantity.0))
            .unwrap_or(0);

        Ok(ClaimInfo {
            namespace: namespace.to_string(),
            name: name.to_string(),
            requested_capacity_bytes: requested,
            access_modes: spec.access_modes.unwrap_or_default(),
        })
    }

    async fn pod_logs(&self, namespace: &str, name: &str, tail_lines: i64) -> Result<String> {
        let params = LogParams {
            tail_lines: Some(tail_lines),
            ..LogParams::default()
        };
        Ok(self.pods(namespace).logs(name, &params).await?)
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<String> {
        match self.pods(namespace).create(&PostParams::default(), pod).await {
            Ok(created) => Ok(created.metadata.name.unwrap_or_default()),
            Err(kube::Error::Api(response)) if is_capacity_message(&response.message) => {
                Err(Error::InsufficientResources(response.message))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_pod(&self, namespace: &str, name: &str, policy: DeletePolicy) -> Result<()> {
        let params = match policy {
            DeletePolicy::Default => DeleteParams::default(),
            DeletePolicy::Immediate => DeleteParams {
                grace_period_seconds: Some(0),
                propagation_policy: Some(PropagationPolicy::Foreground),
                ..DeleteParams::default()
            },
        };

        self.pods(namespace).delete(name, &params).await?;
        Ok(())
    }
}

/// Reduce a full pod object to the fields the pipelines use
fn pod_info(pod: &Pod) -> PodInfo {
    let spec = pod.spec.as_ref();
    let claim_refs = spec
        .and_then(|s| s.volumes.as_ref())
        .map(|volumes| {
            volumes
                .iter()
                .filter_map(|v| v.persistent_volume_claim.as_ref())
                .map(|pvc| pvc.claim_name.clone())
                .collect()
        })
        .unwrap_or_default();

    PodInfo {
        name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        phase: PodPhase::parse(pod.status.as_ref().and_then(|s| s.phase.as_deref())),
        claim_refs,
        node_name: spec.and_then(|s| s.node_name.clone()),
    }
}
