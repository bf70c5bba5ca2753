//! YZ engine runner
//!
//! Loads a configuration file, builds every module it names and trades
//! until Ctrl+C.
//!
//! ```text
//! yz-runner --config engine.toml            # engine loop on this thread
//! yz-runner --config engine.toml --async    # worker thread + stats lines
//! yz-runner --config engine.toml --check    # validate and exit
//! yz-runner --config engine.toml -p 3        # engine loop pinned to core 3
//! ```

use anyhow::Result;
use clap::Parser;
use std::time::{Duration, Instant};
use yz_bins::common::{
    init_logging, install_stop_on_signal, linked_modules, log_stats, print_stats, CommonArgs,
};
use yz_core::{EngineRunner, RunnerState};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> Result<()> {
    let args = CommonArgs::parse();
    init_logging(&args);

    tracing::info!("=== YZ Runner ===");
    tracing::info!("Config: {}", args.config);

    let mut runner = EngineRunner::new(linked_modules()?);
    runner.init(&args.config)?;
    if let Some(core) = args.cpu_core {
        runner.pin_worker(core)?;
    }
    runner.config()?;

    if args.check {
        tracing::info!(
            "Configuration OK: {} parsers, {} traders, {} executers",
            runner.parsers().len(),
            runner.traders().len(),
            runner.executers().len()
        );
        runner.shutdown()?;
        return Ok(());
    }

    let stop = runner.stop_handle();
    install_stop_on_signal(stop.clone())?;

    tracing::info!("Starting engine '{}'...", runner.env().name);
    runner.run(args.async_mode)?;

    if args.async_mode {
        let interval = Duration::from_secs(args.stats_interval);
        let mut last = Instant::now();
        while !stop.should_stop() {
            std::thread::sleep(Duration::from_millis(50));
            if !interval.is_zero() && last.elapsed() >= interval {
                log_stats(&runner.metrics_snapshot());
                last = Instant::now();
            }
        }
        runner.shutdown()?;
    }

    debug_assert_eq!(runner.state(), RunnerState::Stopped);
    print_stats(&runner.metrics_snapshot());
    Ok(())
}
