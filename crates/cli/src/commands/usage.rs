//! Claim usage table

use anyhow::{Context, Result};
use pvc_lib::usage::{filter_usages, limit_top_n, UsageAggregator};
use pvc_lib::{ClusterContext, UsageRecord};
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

use crate::output::{clear_screen, color_percent, format_bytes, print_warning, OutputFormat};

/// Row for the usage table
#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "PVC")]
    pvc: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Used")]
    used: String,
    #[tabled(rename = "Avail")]
    available: String,
    #[tabled(rename = "Use%")]
    percent: String,
}

impl From<&UsageRecord> for UsageRow {
    fn from(u: &UsageRecord) -> Self {
        Self {
            namespace: u.namespace.clone(),
            pvc: u.pvc.clone(),
            size: format_bytes(u.capacity_bytes),
            used: format_bytes(u.used_bytes),
            available: format_bytes(u.available_bytes),
            percent: color_percent(u.percentage_used).to_string(),
        }
    }
}

/// Options of the usage command after layering config and flags
#[derive(Debug, Clone)]
pub struct UsageOptions {
    pub filter: String,
    pub top: i64,
    pub namespace: Option<String>,
    pub watch: bool,
    pub interval: Duration,
    pub format: OutputFormat,
}

/// Show claim usage once, or keep refreshing in watch mode until Ctrl-C
pub async fn show_usage(ctx: &ClusterContext, opts: &UsageOptions) -> Result<()> {
    if !opts.watch {
        return render(ctx, opts).await;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut ticker = interval(opts.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut first = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !first {
                    clear_screen();
                }
                first = false;

                if let Err(e) = render(ctx, opts).await {
                    warn!(error = %e, "Error refreshing claim usage");
                }
            }
            _ = &mut ctrl_c => {
                println!("\nTerminating watch mode...");
                break;
            }
        }
    }

    Ok(())
}

async fn render(ctx: &ClusterContext, opts: &UsageOptions) -> Result<()> {
    let usages = collect(ctx, opts).await?;

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&usages)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if usages.is_empty() {
                print_warning("No PVC usage found");
            } else {
                println!("{}", render_table(&usages));
            }
        }
    }

    Ok(())
}

/// Aggregate, restrict to the namespace, filter, then cap
async fn collect(ctx: &ClusterContext, opts: &UsageOptions) -> Result<Vec<UsageRecord>> {
    let mut usages = UsageAggregator::new(ctx.stats.clone())
        .compute_usage()
        .await
        .context("Error getting PVC usages")?;

    if let Some(namespace) = &opts.namespace {
        usages.retain(|u| &u.namespace == namespace);
    }

    let filtered = filter_usages(usages, &opts.filter).context("Error filtering usages")?;
    Ok(limit_top_n(filtered, opts.top))
}

fn render_table(usages: &[UsageRecord]) -> String {
    let rows: Vec<UsageRow> = usages.iter().map(UsageRow::from).collect();
    Table::new(rows).with(Style::blank()).to_string()
}
