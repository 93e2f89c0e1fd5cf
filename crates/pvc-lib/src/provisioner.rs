//! Diagnostic pod provisioning
//!
//! Creates an ephemeral, read-only pod on the node of a claim's consumer.
//! The pod mounts the claim and prints disk, load and CPU statistics in
//! marker-delimited blocks that the metric extractor reads back from its
//! log.

use crate::cluster::{ClusterApi, DeletePolicy};
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{
    Container, PersistentVolumeClaimVolumeSource, Pod, PodSpec, ResourceRequirements,
    SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Platform limit for object names and label values
pub const MAX_NAME_LEN: usize = 63;

/// Claim characters kept before prefixing
const MAX_CLAIM_LEN: usize = 50;

const APP_LABEL: &str = "pvc-perf-monitor";
const CONTAINER_NAME: &str = "perf-monitor";
const VOLUME_NAME: &str = "pvc-volume";

/// Configuration for diagnostic pods
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Image with disk and I/O diagnostic tools
    pub image: String,
    /// Where the claim is mounted inside the pod
    pub mount_path: String,
    /// Prefix of the derived pod name
    pub name_prefix: String,
    pub cpu_request: String,
    pub cpu_limit: String,
    pub memory_request: String,
    pub memory_limit: String,
    /// Delay between checks while a previous pod is being deleted
    pub deletion_poll_interval: Duration,
    /// Maximum number of deletion checks before proceeding anyway
    pub deletion_max_polls: u32,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            image: "nicolaka/netshoot".to_string(),
            mount_path: "/mnt/pvc".to_string(),
            name_prefix: "pvc-perf-monitor-".to_string(),
            cpu_request: "50m".to_string(),
            cpu_limit: "100m".to_string(),
            memory_request: "64Mi".to_string(),
            memory_limit: "128Mi".to_string(),
            deletion_poll_interval: Duration::from_secs(1),
            deletion_max_polls: 30,
        }
    }
}

impl ProvisionerConfig {
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_deletion_wait(mut self, interval: Duration, max_polls: u32) -> Self {
        self.deletion_poll_interval = interval;
        self.deletion_max_polls = max_polls;
        self
    }
}

/// Creates diagnostic pods next to a claim's consumer
pub struct DiagnosticPodProvisioner {
    api: Arc<dyn ClusterApi>,
    config: ProvisionerConfig,
}

impl DiagnosticPodProvisioner {
    pub fn new(api: Arc<dyn ClusterApi>, config: ProvisionerConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Create the diagnostic pod for `claim_name` on the node running
    /// `consumer_pod`, replacing any pod left over under the same name.
    pub async fn provision(
        &self,
        namespace: &str,
        consumer_pod: &str,
        claim_name: &str,
    ) -> Result<String> {
        let consumer = self
            .api
            .get_pod(namespace, consumer_pod)
            .await?
            .ok_or_else(|| Error::PodNotFound {
                namespace: namespace.to_string(),
                name: consumer_pod.to_string(),
            })?;

        let node = consumer.node_name.ok_or_else(|| Error::NodeNotAssigned {
            pod: consumer_pod.to_string(),
        })?;

        let name = diagnostic_pod_name(&self.config.name_prefix, claim_name);
        self.remove_existing(namespace, &name).await?;

        let pod = self.build_pod(namespace, &name, consumer_pod, claim_name, &node);
        let created = self.api.create_pod(namespace, &pod).await?;

        info!(
            pod = %created,
            node = %node,
            claim = %claim_name,
            "Created diagnostic pod"
        );
        Ok(created)
    }

    /// Immediately delete the diagnostic pod of `claim_name`, if any.
    /// Returns whether a pod was deleted.
    pub async fn remove(&self, namespace: &str, claim_name: &str) -> Result<bool> {
        let name = diagnostic_pod_name(&self.config.name_prefix, claim_name);
        match self
            .api
            .delete_pod(namespace, &name, DeletePolicy::Immediate)
            .await
        {
            Ok(()) => {
                info!(pod = %name, "Deleted diagnostic pod");
                Ok(true)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete a leftover pod and wait a bounded time for it to disappear.
    /// Running out of polls is not an error; creation then reports the
    /// conflict.
    async fn remove_existing(&self, namespace: &str, name: &str) -> Result<()> {
        if self.api.get_pod(namespace, name).await?.is_none() {
            return Ok(());
        }

        info!(pod = %name, "Deleting previous diagnostic pod");
        self.api
            .delete_pod(namespace, name, DeletePolicy::Default)
            .await?;

        for poll in 0..self.config.deletion_max_polls {
            match self.api.get_pod(namespace, name).await {
                Ok(None) => {
                    debug!(pod = %name, polls = poll + 1, "Previous diagnostic pod deleted");
                    return Ok(());
                }
                Ok(Some(_)) => {}
                Err(e) => {
                    debug!(pod = %name, error = %e, "Lookup failed while waiting for deletion");
                    return Ok(());
                }
            }
            tokio::time::sleep(self.config.deletion_poll_interval).await;
        }

        warn!(
            pod = %name,
            polls = self.config.deletion_max_polls,
            "Previous diagnostic pod still present, proceeding"
        );
        Ok(())
    }

    /// Build the pod specification
    pub fn build_pod(
        &self,
        namespace: &str,
        name: &str,
        consumer_pod: &str,
        claim_name: &str,
        node: &str,
    ) -> Pod {
        let labels = BTreeMap::from([
            ("app".to_string(), APP_LABEL.to_string()),
            ("target-pod".to_string(), label_value(consumer_pod)),
            ("pvc-name".to_string(), label_value(claim_name)),
        ]);

        let resources = ResourceRequirements {
            limits: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity(self.config.cpu_limit.clone())),
                ("memory".to_string(), Quantity(self.config.memory_limit.clone())),
            ])),
            requests: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity(self.config.cpu_request.clone())),
                ("memory".to_string(), Quantity(self.config.memory_request.clone())),
            ])),
            ..ResourceRequirements::default()
        };

        let container = Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(self.config.image.clone()),
            command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                diagnostic_script(&self.config.mount_path),
            ]),
            volume_mounts: Some(vec![VolumeMount {
                name: VOLUME_NAME.to_string(),
                mount_path: self.config.mount_path.clone(),
                read_only: Some(true),
                ..VolumeMount::default()
            }]),
            security_context: Some(SecurityContext {
                privileged: Some(false),
                allow_privilege_escalation: Some(false),
                read_only_root_filesystem: Some(true),
                ..SecurityContext::default()
            }),
            resources: Some(resources),
            ..Container::default()
        };

        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(labels),
                ..ObjectMeta::default()
            },
            spec: Some(PodSpec {
                node_name: Some(node.to_string()),
                containers: vec![container],
                volumes: Some(vec![Volume {
                    name: VOLUME_NAME.to_string(),
                    persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                        claim_name: claim_name.to_string(),
                        read_only: Some(true),
                    }),
                    ..Volume::default()
                }]),
                restart_policy: Some("Never".to_string()),
                ..PodSpec::default()
            }),
            ..Pod::default()
        }
    }
}

/// Deterministic diagnostic pod name for a claim
pub fn diagnostic_pod_name(prefix: &str, claim_name: &str) -> String {
    let claim: String = claim_name.chars().take(MAX_CLAIM_LEN).collect();
    truncate_name(&format!("{}{}", prefix, claim))
}

/// Claim or pod name made safe for a label value
fn label_value(value: &str) -> String {
    truncate_name(value)
}

fn truncate_name(value: &str) -> String {
    let truncated: String = value.chars().take(MAX_NAME_LEN).collect();
    truncated
        .trim_end_matches(|c| c == '-' || c == '.' || c == '_')
        .to_string()
}

/// Shell loop printing marker-delimited statistics once per second
fn diagnostic_script(mount_path: &str) -> String {
    format!(
        r#"echo "Starting PVC Performance Monitor (Read-Only mode)"
if [ -d "{mount}" ]; then
  echo "PVC mounted successfully at {mount} in read-only mode"
  df -h {mount}
  mount | grep {mount}
  while true; do
    echo "------- PVC Monitor $(date) -------"
    echo "DISK_USAGE_BEGIN"
    df -h {mount} | grep -v "Filesystem"
    echo "DISK_USAGE_END"
    echo "SYSTEM_STATS_BEGIN"
    top -bn1 | grep -i "load average" | head -1
    echo "SYSTEM_STATS_END"
    echo "CPU_STATS_BEGIN"
    top -bn1 | grep -i "cpu(s)\|^CPU:" | head -1
    echo "CPU_STATS_END"
    echo "IO_STATS_BEGIN"
    iostat -dxh 1 1 | grep -v "loop\|ram"
    echo "IO_STATS_END"
    sleep 1
  done
else
  echo "Error: PVC directory {mount} not found"
  exit 1
fi"#,
        mount = mount_path
    )
}
