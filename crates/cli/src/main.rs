//! PVC usage CLI
//!
//! A command-line tool for ranking persistent volume claim usage across
//! a cluster and for watching the live performance of a single claim.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::perf::{self, PerfOptions};
use commands::usage::{self, UsageOptions};
use config::Settings;
use pvc_lib::{FilterExpression, MonitorConfig, ProvisionerConfig};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// PVC usage and performance monitor
#[derive(Parser)]
#[command(name = "pvcusage")]
#[command(author, version, about = "Kubernetes PVC usage and performance monitor", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Path to kubeconfig file (falls back to KUBECONFIG, in-cluster config, then ~/.kube/config)
    #[arg(long, global = true)]
    pub kubeconfig: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "table", global = true)]
    pub output: output::OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Usage options when no subcommand is given
    #[command(flatten)]
    pub usage: UsageArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show PVC usage ranked by percentage used (default)
    Usage(UsageArgs),

    /// Monitor the performance of a single PVC
    Perf(PerfArgs),

    /// Print the effective configuration
    Config,
}

#[derive(Args, Clone, Default)]
pub struct UsageArgs {
    /// Filter PVCs by usage percentage (e.g. '>50', '<=80', '=90')
    #[arg(long, allow_hyphen_values = true)]
    pub filter: Option<String>,

    /// Show only top N PVCs by usage percentage
    #[arg(long, allow_hyphen_values = true)]
    pub top: Option<i64>,

    /// Only show PVCs of this namespace
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Enable watch mode (refresh every s seconds)
    #[arg(long, short)]
    pub watch: bool,

    /// Interval in seconds for watch mode
    #[arg(short = 's', long = "interval", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}

#[derive(Args, Clone)]
pub struct PerfArgs {
    /// Namespace of the PVC
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// PVC to monitor
    #[arg(long)]
    pub pvc: String,

    /// Pod using the PVC (inferred when omitted)
    #[arg(long)]
    pub pod: Option<String>,

    /// Display refresh interval in seconds
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Diagnostic pod image
    #[arg(long)]
    pub image: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        kubeconfig,
        output,
        verbose,
        log_json,
        usage: usage_args,
        command,
    } = Cli::parse();

    init_tracing(verbose, log_json);
    let settings = Settings::load()?;
    let kubeconfig = config::kubeconfig_path(kubeconfig.as_deref());

    match command.unwrap_or(Commands::Usage(usage_args)) {
        Commands::Usage(args) => {
            let opts = usage_options(args, &settings, output)?;
            let ctx = client::connect(kubeconfig.as_deref()).await?;
            usage::show_usage(&ctx, &opts).await?;
        }
        Commands::Perf(args) => {
            let opts = perf_options(args, &settings);
            let ctx = client::connect(kubeconfig.as_deref()).await?;
            perf::run_perf(&ctx, opts).await?;
        }
        Commands::Config => {
            let json = serde_json::to_string_pretty(&settings)?;
            println!("{}", json);
        }
    }

    Ok(())
}

/// Logs go to stderr so they never interleave with rendered output
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Merge flags over settings. The filter is validated here, before any
/// cluster connection is made.
fn usage_options(
    args: UsageArgs,
    settings: &Settings,
    format: output::OutputFormat,
) -> Result<UsageOptions> {
    let filter = args.filter.unwrap_or_else(|| settings.filter.clone());
    FilterExpression::parse(&filter).context("Invalid filter")?;

    Ok(UsageOptions {
        filter,
        top: args.top.unwrap_or(settings.top),
        namespace: args.namespace.or_else(|| settings.namespace.clone()),
        watch: args.watch,
        interval: Duration::from_secs(args.interval.unwrap_or(settings.watch_interval).max(1)),
        format,
    })
}

fn perf_options(args: PerfArgs, settings: &Settings) -> PerfOptions {
    let mut provisioner = ProvisionerConfig::default();
    if let Some(image) = args.image.or_else(|| settings.image.clone()) {
        provisioner = provisioner.with_image(image);
    }

    PerfOptions {
        namespace: args
            .namespace
            .or_else(|| settings.namespace.clone())
            .unwrap_or_else(|| "default".to_string()),
        pvc: args.pvc,
        pod: args.pod,
        refresh: Duration::from_secs(args.interval),
        monitor: MonitorConfig::default()
            .with_collection_interval(Duration::from_secs(settings.collection_interval.max(1))),
        provisioner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_invocation_is_usage() {
        let cli = Cli::parse_from(["pvcusage", "--filter", ">80", "--top", "3"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.usage.filter.as_deref(), Some(">80"));
        assert_eq!(cli.usage.top, Some(3));
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            namespace: Some("kafka".to_string()),
            filter: ">10".to_string(),
            top: 5,
            ..Settings::default()
        };
        let args = UsageArgs {
            filter: Some("<=50".to_string()),
            interval: Some(2),
            ..UsageArgs::default()
        };

        let opts = usage_options(args, &settings, output::OutputFormat::Table).unwrap();
        assert_eq!(opts.filter, "<=50");
        assert_eq!(opts.top, 5);
        assert_eq!(opts.namespace.as_deref(), Some("kafka"));
        assert_eq!(opts.interval, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_filter_rejected_early() {
        let args = UsageArgs {
            filter: Some("abc".to_string()),
            ..UsageArgs::default()
        };
        assert!(usage_options(args, &Settings::default(), output::OutputFormat::Json).is_err());
    }

    #[test]
    fn test_perf_options_defaults() {
        let cli = Cli::parse_from(["pvcusage", "perf", "--pvc", "data-kafka-0"]);
        let Some(Commands::Perf(args)) = cli.command else {
            panic!("expected perf command");
        };

        let opts = perf_options(args, &Settings::default());
        assert_eq!(opts.namespace, "default");
        assert_eq!(opts.refresh, Duration::from_secs(1));
        assert_eq!(opts.provisioner.image, "nicolaka/netshoot");
        assert_eq!(opts.monitor.max_provision_attempts, 3);
    }
}
