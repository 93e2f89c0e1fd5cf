//! Claim usage and performance monitoring for Kubernetes
//!
//! This crate provides the core functionality for:
//! - Aggregating, filtering and ranking claim usage across nodes
//! - Inferring the pod that consumes a claim
//! - Provisioning read-only diagnostic pods next to a consumer
//! - Monitoring claim performance with graceful degradation

pub mod cluster;
pub mod error;
pub mod matcher;
pub mod models;
pub mod monitor;
pub mod observability;
pub mod provisioner;
pub mod usage;

#[cfg(test)]
mod testing;

pub use cluster::{ClusterApi, ClusterContext, DeletePolicy, KubeCluster, StatsSource};
pub use error::{Error, Result};
pub use matcher::PodMatcher;
pub use models::*;
pub use monitor::{MonitorConfig, MonitorState, PerformanceMonitor};
pub use observability::StructuredLogger;
pub use provisioner::{DiagnosticPodProvisioner, ProvisionerConfig};
pub use usage::{filter_usages, limit_top_n, FilterExpression, UsageAggregator};
