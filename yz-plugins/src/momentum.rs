//! Mid-price momentum strategy
//!
//! Keeps the last `lookback` mids per symbol. When the newest mid has moved
//! more than `threshold_bps` from the oldest, it signals in the direction of
//! the move with a marketable limit (ask for buys, bid for sells). A symbol
//! only signals again once the direction flips.

use anyhow::{anyhow, bail};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use yz_core::core::UnitId;
use yz_core::subsystems::StrategyCreator;
use yz_core::prelude::*;

pub const TYPE: &str = "momentum";

/// Per-symbol price history
#[derive(Debug, Default)]
struct Track {
    mids: VecDeque<i64>,
    last_side: Option<Side>,
}

pub struct Momentum {
    id: String,
    unit_id: UnitId,
    executer: UnitId,
    kind: StrategyKind,
    lookback: usize,
    threshold_bps: i64,
    qty: i64,
    tracks: HashMap<Symbol, Track>,
    stats: StrategyStats,
}

impl Momentum {
    pub fn new(
        id: &str,
        executer: &str,
        kind: StrategyKind,
        lookback: usize,
        threshold_bps: i64,
        qty: i64,
    ) -> anyhow::Result<Self> {
        if lookback < 2 {
            bail!("strategy '{}': lookback must be at least 2", id);
        }
        if qty <= 0 {
            bail!("strategy '{}': qty must be positive", id);
        }
        Ok(Self {
            id: id.to_string(),
            unit_id: UnitId::new(id).ok_or_else(|| anyhow!("strategy id '{}' is too long", id))?,
            executer: UnitId::new(executer)
                .ok_or_else(|| anyhow!("executer id '{}' is too long", executer))?,
            kind,
            lookback,
            threshold_bps,
            qty,
            tracks: HashMap::new(),
            stats: StrategyStats::default(),
        })
    }

    /// Direction of the move over the window, if it exceeds the threshold
    #[inline]
    fn direction(&self, track: &Track) -> Option<Side> {
        if track.mids.len() < self.lookback {
            return None;
        }
        let oldest = *track.mids.front()?;
        let newest = *track.mids.back()?;
        if oldest <= 0 {
            return None;
        }
        let move_bps = (newest - oldest).saturating_mul(10_000) / oldest;
        if move_bps > self.threshold_bps {
            Some(Side::Buy)
        } else if move_bps < -self.threshold_bps {
            Some(Side::Sell)
        } else {
            None
        }
    }
}

impl StrategyEngine for Momentum {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn on_tick(&mut self, tick: &MarketEvent, out: &mut Vec<Signal>) {
        self.stats.ticks_seen += 1;
        let mid = tick.mid();
        if mid <= 0 {
            return;
        }

        let mut track = self.tracks.remove(&tick.symbol).unwrap_or_default();
        track.mids.push_back(mid);
        while track.mids.len() > self.lookback {
            track.mids.pop_front();
        }

        if let Some(side) = self.direction(&track) {
            if track.last_side != Some(side) {
                track.last_side = Some(side);
                self.stats.signals_generated += 1;
                out.push(Signal {
                    strategy: self.unit_id,
                    executer: self.executer,
                    symbol: tick.symbol,
                    side,
                    qty: self.qty,
                    price: match side {
                        Side::Buy => tick.ask_price,
                        Side::Sell => tick.bid_price,
                    },
                    ts_ns: now_ns(),
                });
            }
        }

        self.tracks.insert(tick.symbol, track);
    }

    fn on_order(&mut self, _event: &OrderEvent) {
        self.stats.orders_seen += 1;
    }

    fn stats(&self) -> StrategyStats {
        self.stats
    }
}

/// Creator registered under [`TYPE`]
///
/// Parameters: `lookback` (20), `threshold_bps` (5), `qty` (1.0).
pub fn creator() -> StrategyCreator {
    Arc::new(
        |entry: &StrategyEntry,
         config: &ConfigNode,
         logger: Logger|
         -> anyhow::Result<Box<dyn StrategyEngine>> {
            let lookback = config.get_u64_or("lookback", 20) as usize;
            let threshold_bps = config.get_f64_or("threshold_bps", 5.0).round() as i64;
            let qty = fixed_point::from_f64(config.get_f64_or("qty", 1.0));

            let strategy = Momentum::new(
                &entry.id,
                &entry.executer,
                entry.kind,
                lookback,
                threshold_bps,
                qty,
            )?;
            logger.debug(&format!(
                "momentum '{}': lookback {}, threshold {}bps",
                entry.id, lookback, threshold_bps
            ));
            Ok(Box::new(strategy))
        },
    )
}
