//! Claim usage pipeline
//!
//! Polls every node's stats report, builds one `UsageRecord` per claim
//! row, ranks the records by percentage used, then narrows them with a
//! filter expression and a result cap. Callers compose
//! `compute_usage -> filter_usages -> limit_top_n` in that order so the
//! cap applies to the final filtered ranking.

mod aggregator;
mod filter;

pub use aggregator::{rank_by_usage, UsageAggregator};
pub use filter::{filter_usages, limit_top_n, Comparison, FilterExpression};
