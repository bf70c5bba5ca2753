//! Runner lifecycle with in-test modules
//!
//! Market events are pushed through the runner's market channel, so every
//! scenario is deterministic.

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use yz_core::config::StaticConfigSource;
use yz_core::core::{AdapterState, UnitId};
use yz_core::prelude::*;
use yz_core::utils::CaptureSink;

// --- modules ---

struct QuietParser {
    id: String,
}

impl Adapter for QuietParser {
    fn id(&self) -> &str {
        &self.id
    }
    fn init(&self, config: &ConfigNode) -> Result<(), AdapterError> {
        if config.get_bool_or("broken", false) {
            return Err(AdapterError::Init(format!("{}: broken by config", self.id)));
        }
        Ok(())
    }
    fn connect(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    fn disconnect(&self) {}
}

impl ParserAdapter for QuietParser {
    fn subscribe(&self, _symbols: &[Symbol]) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Fills every order and keeps a copy
struct BookTrader {
    ctx: TraderContext,
    orders: Arc<Mutex<Vec<OrderRequest>>>,
}

impl Adapter for BookTrader {
    fn id(&self) -> &str {
        &self.ctx.id
    }
    fn init(&self, _config: &ConfigNode) -> Result<(), AdapterError> {
        Ok(())
    }
    fn connect(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    fn disconnect(&self) {}
}

impl TraderAdapter for BookTrader {
    fn submit(&self, order: &OrderRequest) -> Result<(), AdapterError> {
        self.orders.lock().push(*order);
        self.ctx.emit_timeout(
            OrderEvent {
                order_id: order.order_id,
                trader: order.trader,
                symbol: order.symbol,
                side: order.side,
                status: OrderStatus::Filled,
                filled_qty: order.qty,
                fill_price: order.price,
                ts_ns: now_ns(),
            },
            Duration::from_millis(10),
        )
    }
    fn cancel(&self, _order_id: OrderId) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Routes every signal unchanged
struct Forward {
    id: String,
    trader: String,
    router: yz_core::executer::OrderRouter,
}

impl ExecutionUnit for Forward {
    fn id(&self) -> &str {
        &self.id
    }
    fn trader(&self) -> &str {
        &self.trader
    }
    fn on_signal(&self, signal: &Signal) -> Result<Option<OrderRequest>, ExecuterError> {
        let order = OrderRequest {
            order_id: OrderId::generate(),
            trader: UnitId::new(&self.trader).unwrap_or_default(),
            executer: signal.executer,
            symbol: signal.symbol,
            side: signal.side,
            qty: signal.qty,
            price: signal.price,
        };
        self.router.route(&order)?;
        Ok(Some(order))
    }
}

/// Buys one lot on every tick
struct EveryTick {
    id: String,
    executer: UnitId,
    orders_seen: Arc<Mutex<u64>>,
}

impl StrategyEngine for EveryTick {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hft
    }
    fn on_tick(&mut self, tick: &MarketEvent, out: &mut Vec<Signal>) {
        out.push(Signal {
            strategy: UnitId::new(&self.id).unwrap_or_default(),
            executer: self.executer,
            symbol: tick.symbol,
            side: Side::Buy,
            qty: fixed_point::from_f64(1.0),
            price: tick.ask_price,
            ts_ns: now_ns(),
        });
    }
    fn on_order(&mut self, _event: &OrderEvent) {
        *self.orders_seen.lock() += 1;
    }
}

struct Fixture {
    orders: Arc<Mutex<Vec<OrderRequest>>>,
    orders_seen: Arc<Mutex<u64>>,
}

fn catalog(fx: &Fixture) -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new();
    catalog
        .register_parser("quiet", |ctx| {
            Ok(Arc::new(QuietParser { id: ctx.id }) as Arc<dyn ParserAdapter>)
        })
        .unwrap();

    let orders = Arc::clone(&fx.orders);
    catalog
        .register_trader("book", move |ctx| {
            Ok(Arc::new(BookTrader {
                ctx,
                orders: Arc::clone(&orders),
            }) as Arc<dyn TraderAdapter>)
        })
        .unwrap();

    catalog
        .register_executer(
            "forward",
            Arc::new(
                |cfg: &ConfigNode, ctx: ExecuterContext| -> anyhow::Result<Arc<dyn ExecutionUnit>> {
                    Ok(Arc::new(Forward {
                        id: ctx.id,
                        trader: cfg.require_str("trader")?.to_string(),
                        router: ctx.router,
                    }))
                },
            ),
        )
        .unwrap();

    let seen = Arc::clone(&fx.orders_seen);
    catalog
        .register_strategy(
            "every_tick",
            Arc::new(
                move |entry: &StrategyEntry,
                      _cfg: &ConfigNode,
                      _logger: Logger|
                      -> anyhow::Result<Box<dyn StrategyEngine>> {
                    Ok(Box::new(EveryTick {
                        id: entry.id.clone(),
                        executer: UnitId::new(&entry.executer).unwrap_or_default(),
                        orders_seen: Arc::clone(&seen),
                    }))
                },
            ),
        )
        .unwrap();
    catalog
}

fn engine_tree() -> serde_json::Value {
    json!({
        "env": { "name": "lifecycle", "poll_interval_us": 100 },
        "parsers": [
            { "id": "P1", "module": "quiet" },
            { "id": "P2", "module": "quiet", "broken": true }
        ],
        "traders": [ { "id": "T1", "module": "book", "critical": true } ],
        "executers": [ { "id": "E1", "type": "forward", "trader": "T1" } ],
        "strategies": [
            { "id": "S1", "type": "every_tick", "executer": "E1", "symbols": ["rb2410"] }
        ]
    })
}

fn fixture() -> Fixture {
    Fixture {
        orders: Arc::new(Mutex::new(Vec::new())),
        orders_seen: Arc::new(Mutex::new(0)),
    }
}

fn tick(symbol: &str) -> MarketEvent {
    MarketEvent {
        symbol: Symbol::new(symbol).unwrap(),
        bid_price: fixed_point::from_f64(3500.0),
        ask_price: fixed_point::from_f64(3501.0),
        last_price: fixed_point::from_f64(3500.0),
        ..Default::default()
    }
}

fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    done()
}

// --- scenarios ---

#[test]
fn test_run_before_config_is_not_configured() -> Result<()> {
    let fx = fixture();
    let mut runner = EngineRunner::new(catalog(&fx))
        .with_source(Box::new(StaticConfigSource::new().with("engine.cfg", engine_tree())));

    assert!(matches!(
        runner.run(false),
        Err(EngineError::NotConfigured(RunnerState::Created))
    ));

    runner.init("engine.cfg")?;
    assert!(matches!(
        runner.run(false),
        Err(EngineError::NotConfigured(RunnerState::Initialized))
    ));
    assert!(!runner.has_worker());
    assert_eq!(runner.state(), RunnerState::Initialized);
    Ok(())
}

#[test]
fn test_end_to_end_from_config_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("engine.cfg");
    std::fs::write(&path, serde_json::to_string_pretty(&engine_tree())?)?;
    let path = path.to_string_lossy().to_string();

    let fx = fixture();
    let mut runner = EngineRunner::new(catalog(&fx));
    runner.init(&path)?;
    assert_eq!(runner.state(), RunnerState::Initialized);

    runner.config()?;
    assert_eq!(runner.state(), RunnerState::Configured);
    assert_eq!(runner.parsers().state("P1"), Some(AdapterState::Connected));
    assert_eq!(runner.parsers().state("P2"), Some(AdapterState::Error));

    let started = Instant::now();
    runner.run(true)?;
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(runner.has_worker());

    let market = runner.market_sender().unwrap();
    market.send(tick("rb2410"))?;
    market.send(tick("hc2410"))?;
    market.send(tick("rb2410"))?;

    let orders = Arc::clone(&fx.orders);
    assert!(wait_for(Duration::from_secs(5), || orders.lock().len() == 2));
    let seen = Arc::clone(&fx.orders_seen);
    assert!(wait_for(Duration::from_secs(5), || *seen.lock() == 2));

    let data = Arc::clone(runner.data_manager().unwrap());
    assert_eq!(data.len(), 2);

    let stopping = Instant::now();
    runner.shutdown()?;
    assert!(stopping.elapsed() < Duration::from_secs(5));
    assert_eq!(runner.state(), RunnerState::Stopped);
    assert!(!runner.has_worker());
    assert_eq!(runner.traders().state("T1"), Some(AdapterState::Disconnected));

    let m = runner.metrics_snapshot();
    assert_eq!(m.events_received, 3);
    assert_eq!(m.signals_generated, 2);
    assert_eq!(m.orders_routed, 2);
    assert_eq!(m.order_events, 2);

    runner.shutdown()?;
    assert_eq!(runner.state(), RunnerState::Stopped);
    Ok(())
}

#[test]
fn test_policy_rejections_never_reach_trader() -> Result<()> {
    let mut tree = engine_tree();
    tree["policy"] = json!({ "blocked_symbols": ["rb2410"] });

    let fx = fixture();
    let sink = Arc::new(CaptureSink::new());
    let mut runner = EngineRunner::new(catalog(&fx))
        .with_source(Box::new(StaticConfigSource::new().with("engine", tree)))
        .with_sink(sink.clone());
    runner.init("engine")?;
    runner.config()?;
    runner.run(true)?;

    let market = runner.market_sender().unwrap();
    for _ in 0..5 {
        market.send(tick("rb2410"))?;
    }
    let metrics = Arc::clone(runner.metrics());
    assert!(wait_for(Duration::from_secs(5), || {
        metrics.snapshot().signals_rejected == 5
    }));
    runner.shutdown()?;

    assert!(fx.orders.lock().is_empty());
    assert!(sink.contains(LogLevel::Debug, "rb2410"));
    Ok(())
}

#[test]
fn test_critical_failure_tears_down() -> Result<()> {
    let mut tree = engine_tree();
    tree["parsers"][1]["critical"] = json!(true);

    let fx = fixture();
    let sink = Arc::new(CaptureSink::new());
    let mut runner = EngineRunner::new(catalog(&fx))
        .with_source(Box::new(StaticConfigSource::new().with("engine", tree)))
        .with_sink(sink.clone());
    runner.init("engine")?;

    let err = runner.config().unwrap_err();
    assert!(matches!(err, EngineError::ConfigFailed(ref r) if r.contains("P2")));
    assert_eq!(runner.state(), RunnerState::ConfigFailed);
    assert!(runner.parsers().is_empty());
    assert!(runner.executers().is_empty());
    assert!(sink.contains(LogLevel::Fatal, "Configuration failed"));

    // Terminal until reset
    assert!(runner.config().is_err());
    runner.reset()?;
    assert_eq!(runner.state(), RunnerState::Created);
    Ok(())
}

#[test]
fn test_every_failure_is_logged_before_returning() {
    let fx = fixture();
    let sink = Arc::new(CaptureSink::new());
    let mut runner = EngineRunner::new(catalog(&fx))
        .with_source(Box::new(StaticConfigSource::new()))
        .with_sink(sink.clone());

    assert!(runner.config().is_err());
    assert!(sink.contains(LogLevel::Error, "'config' is not valid in state Created"));

    assert!(runner.init("missing").is_err());
    assert!(sink.contains(LogLevel::Fatal, "missing"));
}

#[test]
fn test_drop_shuts_down_running_engine() -> Result<()> {
    let fx = fixture();
    let mut runner = EngineRunner::new(catalog(&fx))
        .with_source(Box::new(StaticConfigSource::new().with("engine", engine_tree())));
    runner.init("engine")?;
    runner.config()?;
    runner.run(true)?;
    let stop = runner.stop_handle();
    drop(runner);
    assert!(stop.should_stop());
    Ok(())
}
