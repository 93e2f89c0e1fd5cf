//! Error types for the usage and performance pipelines

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Platform messages that indicate the node cannot fit the pod
const CAPACITY_MARKERS: &[&str] = &["enough resource", "Insufficient", "OutOfcpu", "OutOfmemory"];

#[derive(Debug, Error)]
pub enum Error {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to decode stats summary from node {node}: {source}")]
    StatsDecode {
        node: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no pods found in namespace '{namespace}'")]
    NoPodsInNamespace { namespace: String },

    #[error("pod '{name}' not found in namespace '{namespace}'")]
    PodNotFound { namespace: String, name: String },

    #[error("pod '{pod}' is not scheduled on any node")]
    NodeNotAssigned { pod: String },

    #[error("claim '{name}' not found in namespace '{namespace}'")]
    ClaimNotFound { namespace: String, name: String },

    #[error("insufficient resources to run diagnostic pod: {0}")]
    InsufficientResources(String),

    #[error("invalid filter value '{input}': {reason}")]
    InvalidFilter { input: String, reason: String },

    #[error("diagnostic pod '{name}' not ready: {reason}")]
    PodNotReady { name: String, reason: String },

    #[error("error creating diagnostic pod: {0}")]
    Provision(#[source] Box<Error>),

    #[error("error deleting diagnostic pod '{name}': {source}")]
    Teardown {
        name: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Returns true when the failure means the target node lacks the
    /// capacity to schedule the pod. Such failures are worth retrying.
    pub fn is_resource_capacity(&self) -> bool {
        match self {
            Error::InsufficientResources(_) => true,
            Error::Provision(inner) => inner.is_resource_capacity(),
            Error::Kube(kube::Error::Api(response)) => {
                is_capacity_message(&response.message) || is_capacity_message(&response.reason)
            }
            _ => false,
        }
    }

    /// Returns true for a 404 from the control plane
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Kube(kube::Error::Api(response)) => response.code == 404,
            Error::PodNotFound { .. } | Error::ClaimNotFound { .. } => true,
            _ => false,
        }
    }
}

pub(crate) fn is_capacity_message(message: &str) -> bool {
    CAPACITY_MARKERS.iter().any(|marker| message.contains(marker))
}
