//! Subcommand implementations

pub mod perf;
pub mod usage;
