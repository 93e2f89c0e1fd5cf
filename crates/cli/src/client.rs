//! Kubernetes client construction

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use pvc_lib::ClusterContext;
use std::path::Path;
use tracing::debug;

/// Connect to the cluster.
///
/// An explicit kubeconfig wins. Otherwise kube-rs infers the
/// configuration: in-cluster service account, then `~/.kube/config`.
pub async fn connect(kubeconfig: Option<&Path>) -> Result<ClusterContext> {
    let config = match kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Error building kubeconfig")?
        }
        None => Config::infer()
            .await
            .context("Error building kubeconfig")?,
    };

    let client = Client::try_from(config).context("Error creating Kubernetes client")?;
    Ok(ClusterContext::from_client(client))
}
