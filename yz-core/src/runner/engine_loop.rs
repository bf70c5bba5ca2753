//! Event-processing loop
//!
//! ```text
//! parsers ──MarketEvent──▶ data manager ─▶ strategies ─▶ policy ─▶ executers ─▶ traders
//! traders ──OrderEvent───▶ notifier, strategies, executers
//! ```
//!
//! The loop owns the strategy engines; everything else is shared with the
//! runner through `Arc`.

use super::stop::StopHandle;
use crate::core::{now_ns, MarketEvent, OrderEvent, Signal};
use crate::executer::{ExecuterFactory, ExecutionUnit};
use crate::perf::EngineMetrics;
use crate::subsystems::{ActionPolicy, DataManager, EventNotifier, SubscribedStrategy};
use crate::utils::Logger;
use crossbeam::channel::{select, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Idle time after which free tick storage is handed back
const IDLE_RELEASE_INTERVAL: Duration = Duration::from_secs(1);

pub struct EngineLoop {
    pub(crate) strategies: Vec<SubscribedStrategy>,
    pub(crate) data: Arc<DataManager>,
    pub(crate) policy: Arc<dyn ActionPolicy>,
    pub(crate) notifier: Arc<dyn EventNotifier>,
    pub(crate) executers: Arc<ExecuterFactory>,
    /// Units as of `run`; none are created while the loop is live
    pub(crate) units: Vec<Arc<dyn ExecutionUnit>>,
    pub(crate) metrics: Arc<EngineMetrics>,
    pub(crate) market_rx: Receiver<MarketEvent>,
    pub(crate) order_rx: Receiver<OrderEvent>,
    pub(crate) stop: StopHandle,
    pub(crate) poll_interval: Duration,
    pub(crate) logger: Logger,
    /// Scratch buffer reused across ticks
    pub(crate) signals: Vec<Signal>,
}

impl EngineLoop {
    /// Process events until the stop handle trips
    pub fn run(&mut self) {
        self.logger.info("Starting engine main loop");

        let market_rx = self.market_rx.clone();
        let order_rx = self.order_rx.clone();
        let mut last_release = Instant::now();

        while !self.stop.should_stop() {
            select! {
                recv(market_rx) -> msg => {
                    if let Ok(event) = msg {
                        self.on_market(&event);
                    }
                }
                recv(order_rx) -> msg => {
                    if let Ok(event) = msg {
                        self.on_order(&event);
                    }
                }
                default(self.poll_interval) => {
                    if last_release.elapsed() >= IDLE_RELEASE_INTERVAL {
                        self.data.release_idle();
                        last_release = Instant::now();
                    }
                }
            }
        }

        let reason = self.stop.reason().unwrap_or_else(|| "signal".to_string());
        self.logger.info(&format!("Stop requested: {}", reason));

        // Order updates already queued still reach the notifier
        let pending = order_rx.len();
        for event in order_rx.try_iter().take(pending) {
            self.on_order(&event);
        }

        let snapshot = self.metrics.snapshot();
        self.logger.info(&format!(
            "Engine loop stopped: {} events, {} signals, {} rejected, {} routed",
            snapshot.events_received,
            snapshot.signals_generated,
            snapshot.signals_rejected,
            snapshot.orders_routed
        ));
    }

    /// Tick → strategies → policy → executers
    #[inline]
    pub fn on_market(&mut self, event: &MarketEvent) {
        let start = Instant::now();
        self.metrics.inc_events();

        let mut tick = *event;
        if tick.local_ts_ns == 0 {
            tick.local_ts_ns = now_ns();
        }

        if let Err(e) = self.data.on_tick(&tick) {
            self.logger
                .error(&format!("dropping tick for {}: {}", tick.symbol, e));
        }

        self.signals.clear();
        for strategy in &mut self.strategies {
            strategy.on_tick(&tick, &mut self.signals);
        }

        for signal in self.signals.drain(..) {
            self.metrics.inc_signals();

            if let Err(violation) = self.policy.approve(&signal) {
                self.metrics.inc_rejected();
                self.notifier.on_rejected(&signal, &violation);
                continue;
            }

            match self.executers.dispatch(&signal) {
                Ok(Some(_order)) => self.metrics.inc_routed(),
                Ok(None) => {}
                Err(e) => {
                    self.metrics.inc_routing_failures();
                    self.logger.warn(&format!(
                        "signal from {} on {} not executed: {}",
                        signal.strategy, signal.symbol, e
                    ));
                }
            }
        }

        self.metrics
            .add_latency(start.elapsed().as_nanos() as u64);
    }

    /// Order update → notifier, strategies, owning executers
    pub fn on_order(&mut self, event: &OrderEvent) {
        self.metrics.inc_order_events();
        self.notifier.on_order(event);

        for strategy in &mut self.strategies {
            strategy.on_order(event);
        }

        for unit in &self.units {
            if unit.trader() == event.trader.as_str() {
                unit.on_order(event);
            }
        }
    }
}
