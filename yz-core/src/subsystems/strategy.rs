use crate::config::{ConfigNode, StrategyEntry, StrategyKind};
use crate::core::{MarketEvent, OrderEvent, Signal, Symbol};
use crate::utils::Logger;
use std::sync::Arc;

/// Strategy engine trait - produces signals from market data
///
/// Engines are owned by the event loop thread, so they take `&mut self` and
/// need no internal locking.
pub trait StrategyEngine: Send {
    fn id(&self) -> &str;

    fn kind(&self) -> StrategyKind;

    /// Called on each tick for a subscribed symbol; push any signals to `out`
    fn on_tick(&mut self, tick: &MarketEvent, out: &mut Vec<Signal>);

    /// Called on each order-status update
    fn on_order(&mut self, _event: &OrderEvent) {}

    /// Strategy statistics (optional, for monitoring)
    fn stats(&self) -> StrategyStats {
        StrategyStats::default()
    }
}

/// Strategy statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategyStats {
    pub ticks_seen: u64,
    pub signals_generated: u64,
    pub orders_seen: u64,
}

/// Builds a strategy engine from its entry and raw configuration slice
pub type StrategyCreator = Arc<
    dyn Fn(&StrategyEntry, &ConfigNode, Logger) -> anyhow::Result<Box<dyn StrategyEngine>>
        + Send
        + Sync,
>;

/// Strategy engine plus the symbols it listens to
pub struct SubscribedStrategy {
    engine: Box<dyn StrategyEngine>,
    /// Empty means every symbol
    symbols: Vec<Symbol>,
}

impl SubscribedStrategy {
    pub fn new(engine: Box<dyn StrategyEngine>, symbols: Vec<Symbol>) -> Self {
        Self { engine, symbols }
    }

    #[inline]
    pub fn accepts(&self, symbol: &Symbol) -> bool {
        self.symbols.is_empty() || self.symbols.contains(symbol)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn engine(&self) -> &dyn StrategyEngine {
        self.engine.as_ref()
    }

    #[inline]
    pub fn on_tick(&mut self, tick: &MarketEvent, out: &mut Vec<Signal>) {
        if self.accepts(&tick.symbol) {
            self.engine.on_tick(tick, out);
        }
    }

    #[inline]
    pub fn on_order(&mut self, event: &OrderEvent) {
        self.engine.on_order(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Side, UnitId};

    struct EveryTick {
        ticks: u64,
    }

    impl StrategyEngine for EveryTick {
        fn id(&self) -> &str {
            "every"
        }

        fn kind(&self) -> StrategyKind {
            StrategyKind::Hft
        }

        fn on_tick(&mut self, tick: &MarketEvent, out: &mut Vec<Signal>) {
            self.ticks += 1;
            out.push(Signal {
                strategy: UnitId::new("every").unwrap(),
                executer: UnitId::new("E1").unwrap(),
                symbol: tick.symbol,
                side: Side::Buy,
                qty: 1,
                price: 0,
                ts_ns: tick.local_ts_ns,
            });
        }

        fn stats(&self) -> StrategyStats {
            StrategyStats {
                ticks_seen: self.ticks,
                ..Default::default()
            }
        }
    }

    fn tick(symbol: &str) -> MarketEvent {
        MarketEvent {
            symbol: Symbol::new(symbol).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_symbol_filter() {
        let mut s = SubscribedStrategy::new(
            Box::new(EveryTick { ticks: 0 }),
            vec![Symbol::new("rb2410").unwrap()],
        );
        let mut out = Vec::new();
        s.on_tick(&tick("rb2410"), &mut out);
        s.on_tick(&tick("hc2410"), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(s.engine().stats().ticks_seen, 1);
    }

    #[test]
    fn test_empty_symbols_accepts_all() {
        let mut s = SubscribedStrategy::new(Box::new(EveryTick { ticks: 0 }), Vec::new());
        let mut out = Vec::new();
        s.on_tick(&tick("a"), &mut out);
        s.on_tick(&tick("b"), &mut out);
        assert_eq!(out.len(), 2);
    }
}
