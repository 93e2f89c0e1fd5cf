//! Consumer pod inference for a claim
//!
//! The platform has no reverse index from claim to pod, so the consumer is
//! inferred by an ordered list of strategies. The first strategy that
//! matches wins:
//!
//! 1. a pod whose volumes declare the claim by name
//! 2. stateful-set naming for `data-<ordinal>-<cluster>-...` claims
//! 3. a dash-separated token longer than 3 characters shared by claim and pod
//! 4. a running pod whose name contains a workload keyword, else any
//!    running pod, else the first pod
//!
//! Matching is best-effort: tiers 2-4 can pick a pod that merely sits next
//! to the real consumer.

use crate::cluster::ClusterApi;
use crate::error::{Error, Result};
use crate::models::PodInfo;
use std::sync::Arc;
use tracing::{debug, info};

/// Keywords preferred by the fallback tier
pub const DEFAULT_WORKLOAD_KEYWORDS: &[&str] = &["kafka"];

/// A single way of picking the consumer of a claim
pub trait MatchStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Return the matching pod, if any
    fn find<'a>(&self, claim_name: &str, pods: &'a [PodInfo]) -> Option<&'a PodInfo>;
}

/// Tier 1: the pod declares the claim in its volumes
pub struct DirectReference;

impl MatchStrategy for DirectReference {
    fn name(&self) -> &'static str {
        "direct-reference"
    }

    fn find<'a>(&self, claim_name: &str, pods: &'a [PodInfo]) -> Option<&'a PodInfo> {
        pods.iter().find(|p| p.uses_claim(claim_name))
    }
}

/// Tier 2: volume-claim-template naming, e.g. `data-0-kafka-pool-0`
pub struct StatefulSetNaming;

impl StatefulSetNaming {
    /// Pod-name prefixes derived from the claim, in priority order
    pub fn candidate_prefixes(claim_name: &str) -> Vec<String> {
        if !claim_name.starts_with("data-") {
            return Vec::new();
        }

        let parts: Vec<&str> = claim_name.split('-').collect();
        if parts.len() < 4 {
            return Vec::new();
        }

        let ordinal = parts[1];
        let cluster = parts[2];
        let candidates = [
            format!("{}-{}", cluster, ordinal),
            format!("{}-{}-{}", cluster, parts[3], ordinal),
            format!("{}-kafka-{}", cluster, ordinal),
            format!("{}-zookeeper-{}", cluster, ordinal),
        ];

        let mut prefixes: Vec<String> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !prefixes.contains(&candidate) {
                prefixes.push(candidate);
            }
        }
        prefixes
    }
}

impl MatchStrategy for StatefulSetNaming {
    fn name(&self) -> &'static str {
        "statefulset-naming"
    }

    fn find<'a>(&self, claim_name: &str, pods: &'a [PodInfo]) -> Option<&'a PodInfo> {
        let prefixes = Self::candidate_prefixes(claim_name);
        if !prefixes.is_empty() {
            debug!(claim = %claim_name, patterns = ?prefixes, "Looking for pods with naming patterns");
        }

        prefixes
            .iter()
            .find_map(|prefix| pods.iter().find(|p| p.name.starts_with(prefix.as_str())))
    }
}

/// Tier 3: claim and pod share a significant name token
pub struct TokenOverlap;

/// Tokens shorter than this are too generic to identify a workload
const MIN_TOKEN_LEN: usize = 4;

impl MatchStrategy for TokenOverlap {
    fn name(&self) -> &'static str {
        "token-overlap"
    }

    fn find<'a>(&self, claim_name: &str, pods: &'a [PodInfo]) -> Option<&'a PodInfo> {
        let claim_tokens: Vec<&str> = claim_name
            .split('-')
            .filter(|t| t.len() >= MIN_TOKEN_LEN)
            .collect();

        pods.iter()
            .find(|pod| pod.name.split('-').any(|t| claim_tokens.contains(&t)))
    }
}

/// Tier 4: likely primary consumer, never fails on a non-empty namespace
pub struct PrimaryConsumerFallback {
    keywords: Vec<String>,
}

impl PrimaryConsumerFallback {
    /// Keywords match case-insensitively
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl Default for PrimaryConsumerFallback {
    fn default() -> Self {
        Self::new(DEFAULT_WORKLOAD_KEYWORDS.iter().map(|k| k.to_string()).collect())
    }
}

impl MatchStrategy for PrimaryConsumerFallback {
    fn name(&self) -> &'static str {
        "primary-consumer-fallback"
    }

    fn find<'a>(&self, _claim_name: &str, pods: &'a [PodInfo]) -> Option<&'a PodInfo> {
        let keyword_pod = pods.iter().find(|p| {
            let name = p.name.to_lowercase();
            p.is_running() && self.keywords.iter().any(|k| name.contains(k.as_str()))
        });

        keyword_pod
            .or_else(|| pods.iter().find(|p| p.is_running()))
            .or_else(|| pods.first())
    }
}

/// Infers the pod consuming a claim
pub struct PodMatcher {
    api: Arc<dyn ClusterApi>,
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl PodMatcher {
    /// Create a matcher with the default strategy order
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self::with_keywords(
            api,
            DEFAULT_WORKLOAD_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        )
    }

    /// Create a matcher whose fallback tier prefers the given keywords
    pub fn with_keywords(api: Arc<dyn ClusterApi>, keywords: Vec<String>) -> Self {
        Self {
            api,
            strategies: default_strategies(keywords),
        }
    }

    /// Find the pod most likely consuming `claim_name` in `namespace`
    pub async fn find_consumer(&self, namespace: &str, claim_name: &str) -> Result<String> {
        let pods = self.api.list_pods(namespace).await?;
        if pods.is_empty() {
            return Err(Error::NoPodsInNamespace {
                namespace: namespace.to_string(),
            });
        }

        info!(claim = %claim_name, namespace = %namespace, pods = pods.len(), "Searching for pod using claim");

        self.resolve(claim_name, &pods)
            .map(|pod| pod.name.clone())
            .ok_or_else(|| Error::NoPodsInNamespace {
                namespace: namespace.to_string(),
            })
    }

    /// Run the strategies in order against an already listed namespace
    pub fn resolve<'a>(&self, claim_name: &str, pods: &'a [PodInfo]) -> Option<&'a PodInfo> {
        for strategy in &self.strategies {
            if let Some(pod) = strategy.find(claim_name, pods) {
                info!(
                    claim = %claim_name,
                    pod = %pod.name,
                    strategy = strategy.name(),
                    "Matched consumer pod"
                );
                return Some(pod);
            }
            debug!(claim = %claim_name, strategy = strategy.name(), "No match");
        }
        None
    }
}

fn default_strategies(keywords: Vec<String>) -> Vec<Box<dyn MatchStrategy>> {
    vec![
        Box::new(DirectReference),
        Box::new(StatefulSetNaming),
        Box::new(TokenOverlap),
        Box::new(PrimaryConsumerFallback::new(keywords)),
    ]
}
