//! Top-level orchestrator
//!
//! `EngineRunner` owns the configuration, both adapter registries, the
//! executer factory and the in-core subsystems, and sequences them through
//! `init → config → run → shutdown`. Out-of-order calls fail with a lifecycle
//! error instead of doing nothing.

use super::engine_loop::EngineLoop;
use super::state::RunnerState;
use super::stop::StopHandle;
use crate::config::{
    AdapterEntry, ConfigNode, ConfigSource, EnvConfig, ExecuterEntry, FileConfigSource,
    NotifierConfig, PolicyConfig, StrategyEntry, REQUIRED_SECTIONS,
};
use crate::core::{
    ConfigError, EngineError, LogLevel, MarketEvent, OrderEvent, RegistryError, Symbol,
};
use crate::executer::{ExecuterFactory, OrderGateway, OrderRouter};
use crate::perf::{EngineMetrics, MetricsSnapshot, WorkerAffinity};
use crate::registry::catalog::entry_params;
use crate::registry::{
    Adapter, AdapterContext, AdapterCreator, AdapterRegistry, InitReport, ModuleCatalog,
    ParserRegistry, TraderRegistry,
};
use crate::subsystems::{
    ActionPolicy, DataManager, EventNotifier, LimitPolicy, LogNotifier, SubscribedStrategy,
};
use crate::utils::{LogHandler, LogSink, Logger, TracingSink};
use crossbeam::channel::{bounded, Receiver, Sender};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

struct Channels {
    market_tx: Sender<MarketEvent>,
    market_rx: Receiver<MarketEvent>,
    order_tx: Sender<OrderEvent>,
    order_rx: Receiver<OrderEvent>,
}

impl Channels {
    fn new(capacity: usize) -> Self {
        let (market_tx, market_rx) = bounded(capacity);
        let (order_tx, order_rx) = bounded(capacity);
        Self {
            market_tx,
            market_rx,
            order_tx,
            order_rx,
        }
    }
}

/// Lifecycle owner of the trading runtime
pub struct EngineRunner {
    state: RunnerState,
    source: Box<dyn ConfigSource>,
    catalog: ModuleCatalog,
    sink: Arc<dyn LogSink>,
    logger: Logger,

    config: Option<ConfigNode>,
    env: EnvConfig,

    parsers: Arc<ParserRegistry>,
    traders: Arc<TraderRegistry>,
    executers: Arc<ExecuterFactory>,
    data: Option<Arc<DataManager>>,
    notifier: Option<Arc<dyn EventNotifier>>,
    policy: Option<Arc<dyn ActionPolicy>>,
    /// Built by `config`, moved into the loop by `run`
    strategies: parking_lot::Mutex<Vec<SubscribedStrategy>>,
    custom_notifier: Option<Arc<dyn EventNotifier>>,
    custom_policy: Option<Arc<dyn ActionPolicy>>,

    channels: Option<Channels>,
    metrics: Arc<EngineMetrics>,
    stop: StopHandle,
    worker: Option<JoinHandle<()>>,
}

impl EngineRunner {
    /// Runner reading configuration files and logging through `tracing`
    pub fn new(catalog: ModuleCatalog) -> Self {
        let sink: Arc<dyn LogSink> = Arc::new(TracingSink);
        let logger = Logger::from_sink(Arc::clone(&sink));
        let (parsers, traders, executers) = fresh_registries(&logger);

        Self {
            state: RunnerState::Created,
            source: Box::new(FileConfigSource),
            catalog,
            sink,
            logger,
            config: None,
            env: EnvConfig::default(),
            parsers,
            traders,
            executers,
            data: None,
            notifier: None,
            policy: None,
            strategies: parking_lot::Mutex::new(Vec::new()),
            custom_notifier: None,
            custom_policy: None,
            channels: None,
            metrics: Arc::new(EngineMetrics::new()),
            stop: StopHandle::new(),
            worker: None,
        }
    }

    /// Load configuration trees from `source` instead of files
    pub fn with_source(mut self, source: Box<dyn ConfigSource>) -> Self {
        self.source = source;
        self
    }

    /// Send every log record to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.logger = Logger::from_sink(Arc::clone(&sink));
        self.sink = sink;
        let (parsers, traders, executers) = fresh_registries(&self.logger);
        self.parsers = parsers;
        self.traders = traders;
        self.executers = executers;
        self
    }

    /// Use `policy` instead of the configured [`LimitPolicy`]
    pub fn with_policy(mut self, policy: Arc<dyn ActionPolicy>) -> Self {
        self.custom_policy = Some(policy);
        self
    }

    /// Use `notifier` instead of the configured [`LogNotifier`]
    pub fn with_notifier(mut self, notifier: Arc<dyn EventNotifier>) -> Self {
        self.custom_notifier = Some(notifier);
        self
    }

    /// Load and validate the configuration named `source`
    ///
    /// Requires `Created`. Moves to `Initialized`, or `InitFailed` when the
    /// tree cannot be loaded or lacks a required section.
    pub fn init(&mut self, source: &str) -> Result<(), EngineError> {
        if self.state != RunnerState::Created {
            return Err(self.invalid("init"));
        }

        match self.load(source) {
            Ok((tree, env)) => {
                self.logger.info(&format!(
                    "Configuration '{}' loaded for engine '{}'",
                    source, env.name
                ));
                self.config = Some(tree);
                self.env = env;
                self.state = RunnerState::Initialized;
                Ok(())
            }
            Err(e) => {
                self.logger
                    .fatal(&format!("Failed to load configuration '{}': {}", source, e));
                self.state = RunnerState::InitFailed;
                Err(EngineError::ConfigLoad(e))
            }
        }
    }

    /// Construct every subsystem and adapter
    ///
    /// Order: data manager, notifier, policy, strategies, parsers, traders,
    /// executers. A critical failure tears down whatever was built and moves
    /// to `ConfigFailed`; non-critical adapter failures only mark the adapter.
    pub fn config(&mut self) -> Result<(), EngineError> {
        if self.state != RunnerState::Initialized {
            return Err(self.invalid("config"));
        }

        let Some(tree) = self.config.clone() else {
            return Err(self.invalid("config"));
        };

        match self.build(&tree) {
            Ok(()) => {
                self.state = RunnerState::Configured;
                self.logger.info(&format!(
                    "Engine '{}' configured: {} parsers, {} traders, {} executers, {} strategies",
                    self.env.name,
                    self.parsers.len(),
                    self.traders.len(),
                    self.executers.len(),
                    self.strategies.lock().len()
                ));
                Ok(())
            }
            Err(e) => {
                self.logger.fatal(&format!("Configuration failed: {}", e));
                self.teardown();
                self.parsers.clear();
                self.traders.clear();
                self.executers.clear();
                self.state = RunnerState::ConfigFailed;
                Err(match e {
                    EngineError::ConfigFailed(reason) => EngineError::ConfigFailed(reason),
                    other => EngineError::ConfigFailed(other.to_string()),
                })
            }
        }
    }

    /// Enter the live phase
    ///
    /// With `async_mode` the loop runs on a dedicated worker and this returns
    /// at once. Otherwise the calling thread runs the loop until the stop
    /// handle trips, then the runner shuts down before returning.
    pub fn run(&mut self, async_mode: bool) -> Result<(), EngineError> {
        match self.state {
            RunnerState::Configured => {}
            RunnerState::Running | RunnerState::Stopped => return Err(self.invalid("run")),
            state => {
                let err = EngineError::NotConfigured(state);
                self.logger.error(&err.to_string());
                return Err(err);
            }
        }

        let mut engine_loop = self.build_loop()?;
        self.state = RunnerState::Running;

        if !async_mode {
            self.logger.info("Engine running on the calling thread");
            apply_affinity(&self.env.affinity, &self.logger);
            engine_loop.run();
            return self.shutdown();
        }

        let affinity = self.env.affinity;
        let logger = self.logger.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("{}-engine", self.env.name))
            .spawn(move || {
                apply_affinity(&affinity, &logger);
                engine_loop.run();
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.logger.info("Engine running on a dedicated worker");
                Ok(())
            }
            Err(e) => {
                let err = EngineError::Worker(e.to_string());
                self.logger.fatal(&err.to_string());
                self.teardown();
                self.state = RunnerState::Stopped;
                Err(err)
            }
        }
    }

    /// Disconnect adapters, stop the worker, release pools; idempotent
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        match self.state {
            RunnerState::Configured | RunnerState::Running => {}
            RunnerState::Initialized => {
                self.state = RunnerState::Stopped;
                return Ok(());
            }
            _ => return Ok(()),
        }

        self.logger
            .info(&format!("Shutting down engine '{}'", self.env.name));
        self.teardown();
        self.state = RunnerState::Stopped;

        let m = self.metrics.snapshot();
        self.logger.info(&format!(
            "Engine stopped: {} events, {} signals ({} rejected), {} orders routed, {} routing failures, avg latency {:.0}ns",
            m.events_received,
            m.signals_generated,
            m.signals_rejected,
            m.orders_routed,
            m.routing_failures,
            m.avg_latency_ns()
        ));
        Ok(())
    }

    /// Return a stopped or failed runner to `Created`
    pub fn reset(&mut self) -> Result<(), EngineError> {
        if !self.state.is_terminal() {
            return Err(self.invalid("reset"));
        }

        self.teardown();
        self.parsers.clear();
        self.traders.clear();
        self.executers.clear();
        self.data = None;
        self.config = None;
        self.env = EnvConfig::default();
        self.channels = None;
        self.metrics.reset();
        self.stop = StopHandle::new();
        self.state = RunnerState::Created;
        self.logger.info("Engine reset");
        Ok(())
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Handle that makes the event loop return
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Logger bound to this runner's sink
    pub fn logger(&self) -> Logger {
        self.logger.clone()
    }

    pub fn parsers(&self) -> &Arc<ParserRegistry> {
        &self.parsers
    }

    pub fn traders(&self) -> &Arc<TraderRegistry> {
        &self.traders
    }

    pub fn executers(&self) -> &Arc<ExecuterFactory> {
        &self.executers
    }

    pub fn data_manager(&self) -> Option<&Arc<DataManager>> {
        self.data.as_ref()
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Loaded configuration tree
    pub fn configuration(&self) -> Option<&ConfigNode> {
        self.config.as_ref()
    }

    pub fn env(&self) -> &EnvConfig {
        &self.env
    }

    /// Pin the engine loop to `core`, overriding `env.cpu_core`
    pub fn pin_worker(&mut self, core: usize) -> Result<(), EngineError> {
        if !matches!(self.state, RunnerState::Initialized | RunnerState::Configured) {
            return Err(self.invalid("pin_worker"));
        }
        self.env.affinity.cpu_core = Some(core);
        Ok(())
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    /// Extra producer for the market channel (replay, tests)
    pub fn market_sender(&self) -> Option<Sender<MarketEvent>> {
        self.channels.as_ref().map(|c| c.market_tx.clone())
    }

    /// True while an asynchronous worker exists
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    fn invalid(&self, op: &'static str) -> EngineError {
        let err = EngineError::InvalidState {
            op,
            state: self.state,
        };
        self.logger.error(&err.to_string());
        err
    }

    fn load(&self, source: &str) -> Result<(ConfigNode, EnvConfig), ConfigError> {
        let tree = self.source.load(source)?;
        tree.validate_required(REQUIRED_SECTIONS)?;
        let env: EnvConfig = tree.deserialize_at("env")?;
        env.validate()?;
        Ok((tree, env))
    }

    fn build(&mut self, tree: &ConfigNode) -> Result<(), EngineError> {
        let channels = Channels::new(self.env.event_queue_capacity);
        let market_tx = channels.market_tx.clone();
        let order_tx = channels.order_tx.clone();
        self.channels = Some(channels);

        self.data = Some(Arc::new(DataManager::new(self.env.tick_pool_capacity)));

        let notifier = match &self.custom_notifier {
            Some(custom) => Arc::clone(custom),
            None => {
                let cfg: NotifierConfig = optional_section(tree, "notifier")?;
                Arc::new(LogNotifier::new(self.logger.clone(), &cfg)) as Arc<dyn EventNotifier>
            }
        };
        self.notifier = Some(notifier);

        let policy = match &self.custom_policy {
            Some(custom) => Arc::clone(custom),
            None => {
                let cfg: PolicyConfig = optional_section(tree, "policy")?;
                Arc::new(LimitPolicy::from_config(&cfg, &self.logger)) as Arc<dyn ActionPolicy>
            }
        };
        self.policy = Some(policy);

        let routes = self.build_strategies(tree)?;

        self.build_adapters(tree, "parsers", &*self.parsers, &market_tx, ModuleCatalog::parser)?;
        self.subscribe_parsers();

        self.build_adapters(tree, "traders", &*self.traders, &order_tx, ModuleCatalog::trader)?;

        self.build_executers(tree)?;

        for (strategy, executer) in routes {
            if self.executers.lookup(&executer).is_err() {
                return Err(EngineError::ConfigFailed(format!(
                    "strategy '{}' targets unknown executer '{}'",
                    strategy, executer
                )));
            }
        }
        Ok(())
    }

    /// Returns (strategy id, executer id) pairs to check once executers exist
    fn build_strategies(&mut self, tree: &ConfigNode) -> Result<Vec<(String, String)>, EngineError> {
        let mut seen = HashSet::new();
        let mut routes = Vec::new();
        let mut built = Vec::new();

        for (entry, node) in typed_entries::<StrategyEntry>(tree, "strategies")? {
            if !entry.active {
                self.logger
                    .info(&format!("strategy '{}' inactive, skipped", entry.id));
                continue;
            }
            if !seen.insert(entry.id.clone()) {
                return Err(EngineError::DuplicateIdentifier(entry.id));
            }

            let creator = self.catalog.strategy(&entry.type_id)?;
            let engine = creator(&entry, &node, self.logger.clone()).map_err(|e| {
                EngineError::CreateFailed {
                    type_id: entry.type_id.clone(),
                    reason: format!("{:#}", e),
                }
            })?;

            let symbols = entry
                .symbols
                .iter()
                .map(|s| {
                    Symbol::new(s).ok_or_else(|| {
                        EngineError::ConfigFailed(format!(
                            "strategy '{}': symbol '{}' is too long",
                            entry.id, s
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            self.logger.info(&format!(
                "strategy '{}' ({}, {:?}) created for {} symbols",
                entry.id,
                entry.type_id,
                entry.kind,
                symbols.len()
            ));
            routes.push((entry.id.clone(), entry.executer.clone()));
            built.push(SubscribedStrategy::new(engine, symbols));
        }

        *self.strategies.lock() = built;
        Ok(routes)
    }

    fn build_adapters<A, E>(
        &self,
        tree: &ConfigNode,
        section: &str,
        registry: &AdapterRegistry<A>,
        events: &Sender<E>,
        resolve: fn(&ModuleCatalog, &str) -> Result<AdapterCreator<A, E>, RegistryError>,
    ) -> Result<(), EngineError>
    where
        A: ?Sized + Adapter,
    {
        for (entry, node) in typed_entries::<AdapterEntry>(tree, section)? {
            if !entry.active {
                self.logger.info(&format!(
                    "{} '{}' inactive, skipped",
                    registry.kind(),
                    entry.id
                ));
                continue;
            }

            let creator = resolve(&self.catalog, &entry.module)?;
            let ctx = AdapterContext::new(entry.id.as_str(), events.clone(), self.logger.clone());
            match creator(ctx) {
                Ok(adapter) => {
                    registry.add(&entry.id, adapter)?;
                    self.logger.debug(&format!(
                        "{} '{}' registered (module {}, params [{}])",
                        registry.kind(),
                        entry.id,
                        entry.module,
                        entry_params(&node)
                    ));
                }
                Err(e) => {
                    let err = EngineError::AdapterInitFailed {
                        id: entry.id.clone(),
                        reason: format!("{:#}", e),
                    };
                    if entry.critical {
                        return Err(err);
                    }
                    self.logger.error(&err.to_string());
                }
            }
        }

        let slices = tree.section(section).unwrap_or_else(ConfigNode::empty);
        let report = registry.init_report(&slices);
        self.check_report(registry.kind(), &report)
    }

    fn check_report(&self, kind: &str, report: &InitReport) -> Result<(), EngineError> {
        if report.is_ok() {
            if !report.failed.is_empty() {
                self.logger.warn(&format!(
                    "{} of {} {}s failed to start, continuing",
                    report.failed.len(),
                    report.failed.len() + report.connected.len(),
                    kind
                ));
            }
            return Ok(());
        }

        let ids: Vec<&str> = report
            .critical_failures()
            .map(|f| f.id.as_str())
            .collect();
        Err(EngineError::ConfigFailed(format!(
            "critical {} failed: {}",
            kind,
            ids.join(", ")
        )))
    }

    fn subscribe_parsers(&self) {
        let mut symbols: Vec<Symbol> = Vec::new();
        for strategy in self.strategies.lock().iter() {
            for symbol in strategy.symbols() {
                if !symbols.contains(symbol) {
                    symbols.push(*symbol);
                }
            }
        }
        if symbols.is_empty() {
            return;
        }

        let logger = &self.logger;
        self.parsers.for_each(|id, parser| {
            if let Err(e) = parser.subscribe(&symbols) {
                logger.warn(&format!("parser '{}' subscribe failed: {}", id, e));
            }
        });
    }

    fn build_executers(&mut self, tree: &ConfigNode) -> Result<(), EngineError> {
        for (type_id, creator) in self.catalog.executer_types() {
            self.executers.register_type(&type_id, creator)?;
        }

        for (entry, node) in typed_entries::<ExecuterEntry>(tree, "executers")? {
            if !entry.active {
                self.logger
                    .info(&format!("executer '{}' inactive, skipped", entry.id));
                continue;
            }
            if self.traders.lookup(&entry.trader).is_err() {
                return Err(EngineError::ConfigFailed(format!(
                    "executer '{}' routes to unknown trader '{}'",
                    entry.id, entry.trader
                )));
            }
            self.executers.create(&entry.type_id, &node)?;
        }
        Ok(())
    }

    fn build_loop(&self) -> Result<EngineLoop, EngineError> {
        let (Some(data), Some(policy), Some(notifier), Some(channels)) = (
            self.data.as_ref(),
            self.policy.as_ref(),
            self.notifier.as_ref(),
            self.channels.as_ref(),
        ) else {
            return Err(self.invalid("run"));
        };

        Ok(EngineLoop {
            strategies: std::mem::take(&mut *self.strategies.lock()),
            data: Arc::clone(data),
            policy: Arc::clone(policy),
            notifier: Arc::clone(notifier),
            units: self.executers.units(),
            executers: Arc::clone(&self.executers),
            metrics: Arc::clone(&self.metrics),
            market_rx: channels.market_rx.clone(),
            order_rx: channels.order_rx.clone(),
            stop: self.stop.clone(),
            poll_interval: Duration::from_micros(self.env.poll_interval_us),
            logger: self.logger.clone(),
            signals: Vec::with_capacity(16),
        })
    }

    /// Undo `config` in reverse construction order; safe to repeat
    fn teardown(&mut self) {
        self.stop.stop("shutdown");
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                self.logger.error("Engine worker panicked");
            }
        }

        self.executers.clear_units();
        let traders = self.traders.stop();
        let parsers = self.parsers.stop();
        self.strategies.lock().clear();
        self.policy = None;
        self.notifier = None;

        let released = self.data.as_ref().map_or(0, |data| data.clear());
        self.logger.debug(&format!(
            "Teardown: {} traders and {} parsers disconnected, {} tick slots released",
            traders, parsers, released
        ));
    }
}

impl LogHandler for EngineRunner {
    #[inline]
    fn handle_log(&self, level: LogLevel, message: &str) {
        self.sink.write(level, message);
    }
}

impl Drop for EngineRunner {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn fresh_registries(
    logger: &Logger,
) -> (Arc<ParserRegistry>, Arc<TraderRegistry>, Arc<ExecuterFactory>) {
    let parsers = Arc::new(ParserRegistry::new("parser", logger.clone()));
    let traders = Arc::new(TraderRegistry::new("trader", logger.clone()));
    let router = OrderRouter::new(Arc::clone(&traders) as Arc<dyn OrderGateway>);
    let executers = Arc::new(ExecuterFactory::new(router, logger.clone()));
    (parsers, traders, executers)
}

/// Apply worker placement to the calling thread; failures only warn
fn apply_affinity(affinity: &WorkerAffinity, logger: &Logger) {
    if affinity.is_noop() {
        return;
    }
    match affinity.apply() {
        Ok(()) => logger.info(&format!(
            "Engine thread placed: core {:?}, SCHED_FIFO {:?}",
            affinity.cpu_core, affinity.realtime_priority
        )),
        Err(e) => logger.warn(&format!("Worker affinity not applied: {:#}", e)),
    }
}

fn optional_section<T: DeserializeOwned + Default>(
    tree: &ConfigNode,
    path: &str,
) -> Result<T, EngineError> {
    if !tree.has(path) {
        return Ok(T::default());
    }
    tree.deserialize_at(path)
        .map_err(|e| EngineError::ConfigFailed(e.to_string()))
}

/// Entries of the sequence at `section`, each with its typed view
fn typed_entries<T: DeserializeOwned>(
    tree: &ConfigNode,
    section: &str,
) -> Result<Vec<(T, ConfigNode)>, EngineError> {
    let Some(node) = tree.section(section) else {
        return Ok(Vec::new());
    };
    if !node.is_sequence() {
        return Err(EngineError::ConfigFailed(format!(
            "'{}' must be a sequence of entries",
            section
        )));
    }

    node.entries()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .deserialize::<T>()
                .map(|typed| (typed, entry))
                .map_err(|e| EngineError::ConfigFailed(format!("{}.{}: {}", section, i, e)))
        })
        .collect()
}
