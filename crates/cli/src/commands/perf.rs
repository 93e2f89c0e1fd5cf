//! Live performance view of a single claim

use anyhow::{Context, Result};
use colored::Colorize;
use pvc_lib::{
    ClusterContext, DiagnosticPodProvisioner, MetricsSnapshot, MetricsSource, MonitorConfig,
    PerformanceMonitor, PodMatcher, ProvisionerConfig,
};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

use crate::output::{
    clear_screen, color_by_threshold, format_bytes, print_info, print_success, print_warning,
    utilization_bar,
};

/// Options of the perf command after layering config and flags
#[derive(Debug, Clone)]
pub struct PerfOptions {
    pub namespace: String,
    pub pvc: String,
    pub pod: Option<String>,
    pub refresh: Duration,
    pub monitor: MonitorConfig,
    pub provisioner: ProvisionerConfig,
}

/// Monitor a claim until Ctrl-C, then tear the diagnostic pod down
pub async fn run_perf(ctx: &ClusterContext, opts: PerfOptions) -> Result<()> {
    let consumer = match opts.pod {
        Some(pod) => pod,
        None => PodMatcher::new(ctx.api.clone())
            .find_consumer(&opts.namespace, &opts.pvc)
            .await
            .context("Failed to find pod using PVC")?,
    };
    print_info(&format!(
        "Monitoring PVC {} via pod {}",
        opts.pvc.cyan(),
        consumer.cyan()
    ));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // An interrupt while provisioning drops the start future, so the pod
    // it may have created is removed by its derived name.
    let started = tokio::select! {
        result = PerformanceMonitor::start(
            ctx.api.clone(),
            opts.monitor,
            opts.provisioner.clone(),
            &opts.namespace,
            &consumer,
            &opts.pvc,
        ) => Some(result),
        _ = &mut ctrl_c => None,
    };

    let mut monitor = match started {
        Some(result) => result.context("Failed to start performance monitoring")?,
        None => {
            println!("\nInterrupted, removing diagnostic pod...");
            DiagnosticPodProvisioner::new(ctx.api.clone(), opts.provisioner)
                .remove(&opts.namespace, &opts.pvc)
                .await
                .context("Failed to clean up performance monitoring")?;
            return Ok(());
        }
    };
    warn_if_degraded(&monitor);

    let mut ticker = interval(opts.refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = monitor.latest_metrics().await;
                clear_screen();
                println!("{}", render_snapshot(&snapshot, &opts.pvc, monitor.is_degraded()));
            }
            _ = &mut ctrl_c => break,
        }
    }

    println!("\nStopping performance monitoring...");
    match monitor.stop().await {
        Ok(()) => {
            if !monitor.is_degraded() {
                print_success("Diagnostic pod deleted");
            }
            Ok(())
        }
        Err(e) => Err(e).context("Failed to clean up performance monitoring"),
    }
}

fn render_snapshot(snapshot: &MetricsSnapshot, pvc: &str, degraded: bool) -> String {
    let mut lines = Vec::new();
    let rule = "=".repeat(50).blue().bold().to_string();

    lines.push(rule.clone());
    lines.push(
        format!(
            "PVC Performance Monitor - {} - {}",
            pvc,
            snapshot.timestamp.format("%d %b %y %H:%M UTC")
        )
        .blue()
        .bold()
        .to_string(),
    );
    lines.push(rule);

    if degraded {
        lines.push(String::new());
        lines.push(
            "⚠ Degraded mode: no diagnostic pod, figures are estimates"
                .yellow()
                .bold()
                .to_string(),
        );
    }

    if snapshot.source == MetricsSource::None {
        lines.push(String::new());
        lines.push("Waiting for first sample...".to_string());
        return lines.join("\n");
    }

    lines.push(String::new());
    lines.push("Storage Metrics:".cyan().bold().to_string());
    lines.push(format!("  Capacity:      {}", format_bytes(snapshot.capacity_bytes)));
    lines.push(match (snapshot.used_bytes, snapshot.used_percent) {
        (Some(used), Some(pct)) => format!(
            "  Used:          {}",
            color_by_threshold(
                format!("{} ({:.1}%)", format_bytes(used), pct),
                pct,
                70.0,
                90.0
            )
        ),
        _ => "  Used:          n/a".to_string(),
    });
    lines.push(match snapshot.available_bytes() {
        Some(available) => format!("  Available:     {}", format_bytes(available)),
        None => "  Available:     n/a".to_string(),
    });
    let mode = if snapshot.read_only {
        "Read-Only"
    } else {
        "Read-Write"
    };
    lines.push(format!("  Mode:          {}", mode.bold()));

    lines.push(String::new());
    lines.push("Performance Metrics:".cyan().bold().to_string());
    lines.push(format!("  IOPS:          {} ops/sec", snapshot.iops));
    lines.push(format!(
        "  Throughput:    {}/sec",
        format_bytes(snapshot.throughput_bytes_per_sec)
    ));
    lines.push(format!("  Latency:       {}ms", snapshot.latency_ms));
    lines.push(format!("  Disk Util:     {:.1}%", snapshot.disk_util_percent));

    lines.push(String::new());
    lines.push("System Metrics:".cyan().bold().to_string());
    lines.push(format!(
        "  System Load:   {}",
        color_by_threshold(
            format!("{:.2}", snapshot.system_load),
            snapshot.system_load,
            1.0,
            2.0
        )
    ));
    lines.push(format!(
        "  I/O Wait:      {}",
        color_by_threshold(
            format!("{:.1}%", snapshot.cpu_wait_percent),
            snapshot.cpu_wait_percent,
            5.0,
            20.0
        )
    ));

    lines.push(String::new());
    lines.push(match snapshot.used_percent {
        Some(pct) => format!("Disk Usage: {}", utilization_bar(pct, 40)),
        None => "Disk Usage: n/a".to_string(),
    });
    lines.push(format!("Data source: {}", source_label(snapshot.source)));
    lines.push(String::new());
    lines.push("Press Ctrl+C to stop monitoring".blue().bold().to_string());

    lines.join("\n")
}

fn source_label(source: MetricsSource) -> &'static str {
    match source {
        MetricsSource::None => "none",
        MetricsSource::Measured => "measured (diagnostic pod)",
        MetricsSource::Estimated => "estimated (diagnostic pod logs unavailable)",
        MetricsSource::Degraded => "estimated (claim metadata only)",
    }
}

fn warn_if_degraded(monitor: &PerformanceMonitor) {
    if monitor.is_degraded() {
        print_warning("Could not run a diagnostic pod, showing estimated metrics");
    }
}
