//! End-to-end runs of the engine with the stand-in modules
//!
//! sim parser → momentum strategy → policy → direct executer → paper trader

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use yz_core::core::AdapterState;
use yz_core::prelude::*;
use yz_core::utils::CaptureSink;

const ENGINE_TOML: &str = r#"
[env]
name = "pipeline"
poll_interval_us = 200
event_queue_capacity = 4096

[policy]
max_order_qty = 5.0

[[parsers]]
id = "P1"
module = "sim"
critical = true
tick_interval_us = 200
volatility_bps = 20.0
seed = 42

[[traders]]
id = "T1"
module = "paper"
critical = true

[[executers]]
id = "E1"
type = "direct"
trader = "T1"

[[strategies]]
id = "S1"
type = "momentum"
kind = "hft"
executer = "E1"
symbols = ["rb2410", "hc2410"]
lookback = 3
threshold_bps = 1
"#;

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn test_ticks_flow_to_fills() {
    let file = write_config(ENGINE_TOML);
    let path = file.path().to_str().unwrap().to_string();

    let mut runner = EngineRunner::new(yz_plugins::catalog().unwrap());
    runner.init(&path).unwrap();
    runner.config().unwrap();

    assert_eq!(runner.parsers().state("P1"), Some(AdapterState::Connected));
    assert_eq!(runner.traders().state("T1"), Some(AdapterState::Connected));
    assert_eq!(runner.executers().ids(), vec!["E1".to_string()]);

    runner.run(true).unwrap();
    assert_eq!(runner.state(), RunnerState::Running);

    let metrics = Arc::clone(runner.metrics());
    let routed = wait_for(Duration::from_secs(10), || {
        let m = metrics.snapshot();
        m.orders_routed > 0 && m.order_events > 0
    });
    assert!(routed, "no order reached the paper trader: {:?}", metrics.snapshot());

    let data = Arc::clone(runner.data_manager().unwrap());
    assert!(data.latest("rb2410").is_some());
    assert!(data.latest("hc2410").is_some());

    runner.shutdown().unwrap();
    assert_eq!(runner.state(), RunnerState::Stopped);
    assert_eq!(runner.parsers().state("P1"), Some(AdapterState::Disconnected));
    assert_eq!(runner.traders().state("T1"), Some(AdapterState::Disconnected));
    assert!(data.is_empty());

    let m = runner.metrics_snapshot();
    assert!(m.events_received > 0);
    assert!(m.signals_generated >= m.orders_routed);
    assert_eq!(m.signals_rejected, 0);

    runner.shutdown().unwrap();
}

#[test]
fn test_policy_blocks_every_signal() {
    let text = ENGINE_TOML.replace(
        "max_order_qty = 5.0",
        "max_order_qty = 0.5\nblocked_symbols = []",
    );
    let file = write_config(&text);
    let path = file.path().to_str().unwrap().to_string();

    let mut runner = EngineRunner::new(yz_plugins::catalog().unwrap());
    runner.init(&path).unwrap();
    runner.config().unwrap();
    runner.run(true).unwrap();

    let metrics = Arc::clone(runner.metrics());
    assert!(wait_for(Duration::from_secs(10), || {
        metrics.snapshot().signals_rejected > 0
    }));
    runner.shutdown().unwrap();

    let m = runner.metrics_snapshot();
    assert_eq!(m.orders_routed, 0);
    assert_eq!(m.signals_rejected, m.signals_generated);
}

#[test]
fn test_non_critical_parser_failure_keeps_running() {
    let text = format!(
        "{}\n[[parsers]]\nid = \"P2\"\nmodule = \"sim\"\nfail_connect = true\n",
        ENGINE_TOML
    );
    let file = write_config(&text);
    let path = file.path().to_str().unwrap().to_string();

    let sink = Arc::new(CaptureSink::new());
    let mut runner = EngineRunner::new(yz_plugins::catalog().unwrap()).with_sink(sink.clone());
    runner.init(&path).unwrap();
    runner.config().unwrap();

    assert_eq!(runner.parsers().state("P1"), Some(AdapterState::Connected));
    assert_eq!(runner.parsers().state("P2"), Some(AdapterState::Error));
    assert!(sink.contains(LogLevel::Error, "P2"));

    runner.run(true).unwrap();
    let metrics = Arc::clone(runner.metrics());
    assert!(wait_for(Duration::from_secs(10), || {
        metrics.snapshot().events_received > 0
    }));
    runner.shutdown().unwrap();
}

#[test]
fn test_critical_trader_failure_aborts_config() {
    let text = ENGINE_TOML.replace(
        "module = \"paper\"\ncritical = true",
        "module = \"paper\"\ncritical = true\nfail_connect = true",
    );
    let file = write_config(&text);
    let path = file.path().to_str().unwrap().to_string();

    let mut runner = EngineRunner::new(yz_plugins::catalog().unwrap());
    runner.init(&path).unwrap();
    let err = runner.config().unwrap_err();
    assert!(matches!(err, EngineError::ConfigFailed(ref r) if r.contains("T1")));
    assert_eq!(runner.state(), RunnerState::ConfigFailed);
    assert!(runner.parsers().is_empty());
    assert!(runner.traders().is_empty());
    assert!(matches!(runner.run(true), Err(EngineError::NotConfigured(_))));
    assert!(!runner.has_worker());
}

#[test]
fn test_strategy_with_unknown_executer_fails() {
    let text = ENGINE_TOML.replace("executer = \"E1\"", "executer = \"E9\"");
    let file = write_config(&text);
    let path = file.path().to_str().unwrap().to_string();

    let mut runner = EngineRunner::new(yz_plugins::catalog().unwrap());
    runner.init(&path).unwrap();
    let err = runner.config().unwrap_err();
    assert!(matches!(err, EngineError::ConfigFailed(ref r) if r.contains("E9")));
}

#[test]
fn test_sync_run_until_stop_handle_trips() {
    let file = write_config(ENGINE_TOML);
    let path = file.path().to_str().unwrap().to_string();

    let mut runner = EngineRunner::new(yz_plugins::catalog().unwrap());
    runner.init(&path).unwrap();
    runner.config().unwrap();

    let stop = runner.stop_handle();
    let metrics = Arc::clone(runner.metrics());
    let watcher = std::thread::spawn(move || {
        wait_for(Duration::from_secs(10), || {
            metrics.snapshot().events_received > 10
        });
        stop.trip();
    });

    runner.run(false).unwrap();
    watcher.join().unwrap();
    assert_eq!(runner.state(), RunnerState::Stopped);
    assert!(runner.metrics_snapshot().events_received > 10);
}
