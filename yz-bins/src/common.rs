//! Common utilities for all binaries
//!
//! CLI parsing, logging setup and statistics output.

use anyhow::{Context, Result};
use clap::Parser;
use yz_core::perf::MetricsSnapshot;
use yz_core::utils::init_logger;
use yz_core::{ModuleCatalog, StopHandle};

/// Common CLI arguments for all binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Engine configuration file (JSON or TOML)
    #[arg(short, long)]
    pub config: String,

    /// Run the engine on its own worker thread and report from this one
    #[arg(long = "async")]
    pub async_mode: bool,

    /// Load and configure everything, then shut down without trading
    #[arg(long)]
    pub check: bool,

    /// Seconds between statistics lines in async mode (0 disables)
    #[arg(long, default_value = "1")]
    pub stats_interval: u64,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// CPU core for the engine loop (overrides env.cpu_core)
    #[arg(short = 'p', long)]
    pub cpu_core: Option<usize>,
}

/// Initialize tracing/logging
pub fn init_logging(args: &CommonArgs) {
    init_logger(&args.log_level, args.json_logs);
}

/// Catalog with every module linked into this build
pub fn linked_modules() -> Result<ModuleCatalog> {
    let catalog = yz_plugins::catalog().context("registering built-in modules")?;
    tracing::info!("Linked modules: {}", catalog.describe());
    Ok(catalog)
}

/// Trip `stop` on Ctrl+C / SIGTERM
pub fn install_stop_on_signal(stop: StopHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal");
        stop.trip();
    })
    .context("installing signal handler")
}

/// One statistics line
pub fn log_stats(snapshot: &MetricsSnapshot) {
    tracing::info!(
        events = snapshot.events_received,
        signals = snapshot.signals_generated,
        rejected = snapshot.signals_rejected,
        routed = snapshot.orders_routed,
        order_events = snapshot.order_events,
        avg_latency_ns = snapshot.avg_latency_ns() as u64,
        "engine stats"
    );
}

/// Print final statistics
pub fn print_stats(snapshot: &MetricsSnapshot) {
    tracing::info!("=== Final Statistics ===");
    tracing::info!("Market events: {}", snapshot.events_received);
    tracing::info!("Signals generated: {}", snapshot.signals_generated);
    tracing::info!("Signals rejected: {}", snapshot.signals_rejected);
    tracing::info!("Orders routed: {}", snapshot.orders_routed);
    tracing::info!("Routing failures: {}", snapshot.routing_failures);
    tracing::info!("Order updates: {}", snapshot.order_events);

    if snapshot.events_received > 0 {
        tracing::info!("Avg tick latency: {:.0}ns", snapshot.avg_latency_ns());
    }
    if snapshot.signals_generated > 0 {
        tracing::info!("Rejection rate: {:.2}%", snapshot.rejection_rate() * 100.0);
    }
}
