//! Metric extraction from diagnostic pod logs
//!
//! The diagnostic command prints marker-delimited blocks once per cycle.
//! A log tail usually holds several of them plus a partial one at the
//! edges, so every reader uses the last complete block of its kind.

use tracing::debug;

pub const DISK_USAGE_BEGIN: &str = "DISK_USAGE_BEGIN";
pub const DISK_USAGE_END: &str = "DISK_USAGE_END";
pub const SYSTEM_STATS_BEGIN: &str = "SYSTEM_STATS_BEGIN";
pub const SYSTEM_STATS_END: &str = "SYSTEM_STATS_END";
pub const CPU_STATS_BEGIN: &str = "CPU_STATS_BEGIN";
pub const CPU_STATS_END: &str = "CPU_STATS_END";

/// Filesystem figures read from a `df -h` line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub used_percent: f64,
}

/// Figures extracted from one log tail, each independently optional
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogMetrics {
    pub disk: Option<DiskUsage>,
    pub system_load: Option<f64>,
    pub cpu_wait_percent: Option<f64>,
}

impl LogMetrics {
    pub fn parse(log: &str) -> Self {
        Self {
            disk: extract_disk_usage(log),
            system_load: extract_system_load(log),
            cpu_wait_percent: extract_cpu_wait(log),
        }
    }
}

/// Lines of the last block opened by `begin` and closed by `end`
fn last_block<'a>(log: &'a str, begin: &str, end: &str) -> Option<Vec<&'a str>> {
    let mut current: Option<Vec<&str>> = None;
    let mut last = None;

    for line in log.lines() {
        let trimmed = line.trim();
        if trimmed == begin {
            current = Some(Vec::new());
        } else if trimmed == end {
            if let Some(block) = current.take() {
                last = Some(block);
            }
        } else if let Some(block) = current.as_mut() {
            block.push(line);
        }
    }

    last
}

/// Parse the disk-usage block.
///
/// Expects the usual `df -h` row: device, size, used, available, use%,
/// mountpoint. A row that `df` wrapped over two lines is joined back.
/// Used percent is recomputed from size and available when both are
/// non-zero, since the rendered percent is rounded.
pub fn extract_disk_usage(log: &str) -> Option<DiskUsage> {
    let block = last_block(log, DISK_USAGE_BEGIN, DISK_USAGE_END)?;
    let fields: Vec<&str> = block.iter().flat_map(|l| l.split_whitespace()).collect();

    if fields.len() < 6 {
        debug!(fields = fields.len(), "Disk usage block has too few fields");
        return None;
    }

    let total = parse_human_size(fields[1]);
    let used = parse_human_size(fields[2]);
    let available = parse_human_size(fields[3]);
    let percent = fields[4].trim_end_matches('%').parse::<f64>().ok()?;

    if total == 0 {
        return None;
    }

    let used_percent = if available > 0 {
        total.saturating_sub(available) as f64 / total as f64 * 100.0
    } else {
        percent
    };

    Some(DiskUsage {
        total_bytes: total,
        used_bytes: used,
        used_percent,
    })
}

/// Convert a `df -h` size token such as `195.8G` to bytes.
///
/// Suffixes K through E scale by powers of 1024; fractions are truncated.
/// Empty or malformed tokens yield 0.
pub fn parse_human_size(token: &str) -> u64 {
    let token = token.trim();
    let Some(last) = token.chars().last() else {
        return 0;
    };

    let exponent = match last {
        'K' => Some(1),
        'M' => Some(2),
        'G' => Some(3),
        'T' => Some(4),
        'P' => Some(5),
        'E' => Some(6),
        _ => None,
    };

    let (number, multiplier) = match exponent {
        Some(exp) => (&token[..token.len() - 1], 1024f64.powi(exp)),
        None => (token, 1.0),
    };

    match number.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => (value * multiplier) as u64,
        _ => {
            debug!(token = %token, "Could not parse size token");
            0
        }
    }
}

/// One-minute load average from the system-stats block.
///
/// Accepts both `load average: 0.52, 0.58, 0.59` and the busybox form
/// `Load average: 0.52 0.58 0.59 1/234 5678`.
pub fn extract_system_load(log: &str) -> Option<f64> {
    let block = last_block(log, SYSTEM_STATS_BEGIN, SYSTEM_STATS_END)?;

    block.iter().find_map(|line| {
        let lower = line.to_lowercase();
        let idx = lower.find("load average:")?;
        lower[idx + "load average:".len()..]
            .split(|c: char| c == ',' || c.is_whitespace())
            .find(|t| !t.is_empty())
            .and_then(|t| t.parse::<f64>().ok())
    })
}

/// I/O-wait percent from the CPU-stats block.
///
/// Reads the `wa` field of a procps `%Cpu(s):` line or the `io` field of
/// a busybox `CPU:` line.
pub fn extract_cpu_wait(log: &str) -> Option<f64> {
    let block = last_block(log, CPU_STATS_BEGIN, CPU_STATS_END)?;

    block.iter().find_map(|line| {
        let tokens: Vec<&str> = line
            .split(|c: char| c == ',' || c == ':' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();

        tokens.windows(2).find_map(|pair| match pair[1] {
            "wa" | "io" => pair[0].trim_end_matches('%').parse::<f64>().ok(),
            _ => None,
        })
    })
}
