//! Output formatting utilities

use clap::ValueEnum;
use colored::{ColoredString, Colorize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Clear the terminal (ANSI)
pub fn clear_screen() {
    print!("\x1b[H\x1b[2J");
}

/// Format bytes as an IEC string: `0B`, `1.5KiB`, `2.5MiB`
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{}B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1}{}iB", bytes as f64 / div as f64, PREFIXES[exp])
}

/// Colour a value green, yellow above `warn`, red above `critical`
pub fn color_by_threshold(text: String, value: f64, warn: f64, critical: f64) -> ColoredString {
    if value > critical {
        text.red()
    } else if value > warn {
        text.yellow()
    } else {
        text.green()
    }
}

/// Usage percent with no decimals, coloured at 70% and 90%
pub fn color_percent(percent: f64) -> ColoredString {
    color_by_threshold(format!("{:.0}%", percent), percent, 70.0, 90.0)
}

/// ASCII bar of `width` cells for a 0-100 percentage
pub fn utilization_bar(percent: f64, width: usize) -> String {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * width as f64) as usize;
    let bar = format!("{}{}", "#".repeat(filled), " ".repeat(width - filled));

    format!(
        "[{}] {}",
        color_by_threshold(bar, clamped, 70.0, 90.0),
        color_by_threshold(format!("{:.1}%", clamped), clamped, 70.0, 90.0)
    )
}
