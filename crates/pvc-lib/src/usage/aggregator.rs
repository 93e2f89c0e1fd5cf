//! Aggregation of per-node stats reports into ranked claim usage

use crate::cluster::StatsSource;
use crate::error::Result;
use crate::models::UsageRecord;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds ranked usage records from every node's stats report
pub struct UsageAggregator {
    stats: Arc<dyn StatsSource>,
}

impl UsageAggregator {
    pub fn new(stats: Arc<dyn StatsSource>) -> Self {
        Self { stats }
    }

    /// Collect usage for every claim reported by any node.
    ///
    /// A node whose report cannot be fetched is logged and skipped. Failing
    /// to list the nodes at all aborts the call. A claim mounted on several
    /// nodes yields one record per reporting node.
    pub async fn compute_usage(&self) -> Result<Vec<UsageRecord>> {
        let nodes = self.stats.list_nodes().await?;
        let mut usages = Vec::new();
        let mut failed_nodes = 0usize;

        for node in &nodes {
            let stats = match self.stats.volume_stats(node).await {
                Ok(stats) => stats,
                Err(e) => {
                    failed_nodes += 1;
                    warn!(node = %node, error = %e, "Error getting stats summary, skipping node");
                    continue;
                }
            };

            usages.extend(
                stats
                    .iter()
                    .filter_map(|stat| UsageRecord::from_stat(node, stat)),
            );
        }

        rank_by_usage(&mut usages);

        debug!(
            nodes = nodes.len(),
            failed_nodes = failed_nodes,
            records = usages.len(),
            "Computed claim usage"
        );

        Ok(usages)
    }
}

/// Sort by percentage used, highest first. Ties keep encounter order.
pub fn rank_by_usage(usages: &mut [UsageRecord]) {
    usages.sort_by(|a, b| b.percentage_used.total_cmp(&a.percentage_used));
}
