//! Event payloads flowing between adapters, strategies and executers
//!
//! All payloads are `Copy` and heap-free so they can travel through bounded
//! channels and live in pool slots. Prices and quantities are fixed-point
//! (9 decimals, see [`fixed_point`](super::types::fixed_point)).

use super::types::{ExchangeCode, Side, Symbol, UnitId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock nanoseconds since the Unix epoch
#[inline]
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Top-of-book market update pushed by a parser adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketEvent {
    pub symbol: Symbol,
    pub exchange: ExchangeCode,
    /// Per-parser sequence number
    pub sequence: u64,
    pub exchange_ts_ns: u64,
    pub local_ts_ns: u64,
    pub bid_price: i64,
    pub bid_qty: i64,
    pub ask_price: i64,
    pub ask_qty: i64,
    pub last_price: i64,
    pub volume: u64,
}

impl MarketEvent {
    /// Mid price, or last price when one side is missing
    #[inline]
    pub fn mid(&self) -> i64 {
        if self.bid_price > 0 && self.ask_price > 0 {
            // Halves first; the sum of two prices can overflow i64
            self.bid_price / 2 + self.ask_price / 2 + (self.bid_price % 2 + self.ask_price % 2) / 2
        } else {
            self.last_price
        }
    }

    #[inline]
    pub fn spread(&self) -> i64 {
        self.ask_price.saturating_sub(self.bid_price)
    }
}

/// Trading intent emitted by a strategy engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    /// Emitting strategy
    pub strategy: UnitId,
    /// Executer unit that should carry the signal out
    pub executer: UnitId,
    pub symbol: Symbol,
    pub side: Side,
    /// Quantity (fixed-point)
    pub qty: i64,
    /// Limit price (fixed-point); 0 means marketable
    pub price: i64,
    pub ts_ns: u64,
}

/// Client order identifier, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub u64);

static NEXT_ORDER_ID: AtomicU64 = AtomicU64::new(1);

impl OrderId {
    /// Next process-unique id
    #[inline]
    pub fn generate() -> Self {
        OrderId(NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order produced by an execution unit for a trader adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRequest {
    pub order_id: OrderId,
    /// Trader adapter that carries the order
    pub trader: UnitId,
    /// Executer unit that produced it
    pub executer: UnitId,
    pub symbol: Symbol,
    pub side: Side,
    pub qty: i64,
    pub price: i64,
}

/// Order lifecycle as reported by a broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Accepted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// No further updates will follow
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// Order-status update pushed by a trader adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub trader: UnitId,
    pub symbol: Symbol,
    pub side: Side,
    pub status: OrderStatus,
    pub filled_qty: i64,
    pub fill_price: i64,
    pub ts_ns: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::fixed_point;

    #[test]
    fn test_mid_and_spread() {
        let ev = MarketEvent {
            bid_price: fixed_point::from_f64(100.0),
            ask_price: fixed_point::from_f64(100.2),
            ..Default::default()
        };
        assert_eq!(ev.mid(), fixed_point::from_f64(100.1));
        assert_eq!(ev.spread(), fixed_point::from_f64(0.2));
    }

    #[test]
    fn test_mid_with_extreme_prices() {
        let big = i64::MAX / 2 + 1;
        let ev = MarketEvent {
            bid_price: big,
            ask_price: big,
            ..Default::default()
        };
        assert_eq!(ev.mid(), big);

        let ev = MarketEvent {
            bid_price: i64::MAX - 1,
            ask_price: i64::MAX,
            ..Default::default()
        };
        assert_eq!(ev.mid(), i64::MAX - 1);

        let ev = MarketEvent {
            bid_price: 3,
            ask_price: 5,
            ..Default::default()
        };
        assert_eq!(ev.mid(), 4);
        let ev = MarketEvent {
            bid_price: 3,
            ask_price: 4,
            ..Default::default()
        };
        assert_eq!(ev.mid(), 3);
    }

    #[test]
    fn test_mid_falls_back_to_last() {
        let ev = MarketEvent {
            bid_price: 0,
            ask_price: 10,
            last_price: 7,
            ..Default::default()
        };
        assert_eq!(ev.mid(), 7);
    }

    #[test]
    fn test_order_ids_are_unique() {
        let a = OrderId::generate();
        let b = OrderId::generate();
        assert!(b > a);
    }

    #[test]
    fn test_terminal_status() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Accepted.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }
}
