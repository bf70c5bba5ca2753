//! Action policy - approves or rejects strategy signals before execution

use crate::config::PolicyConfig;
use crate::core::{fixed_point, Signal, Symbol};
use crate::utils::Logger;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reason a signal was not approved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    ZeroQuantity,
    OrderSizeTooLarge { qty: i64, max: i64 },
    BlockedSymbol(Symbol),
    TradingHalted,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyViolation::ZeroQuantity => write!(f, "Order quantity must be positive"),
            PolicyViolation::OrderSizeTooLarge { qty, max } => write!(
                f,
                "Order size {} exceeds maximum {}",
                fixed_point::to_f64(*qty),
                fixed_point::to_f64(*max)
            ),
            PolicyViolation::BlockedSymbol(symbol) => {
                write!(f, "Symbol {} is blocked", symbol)
            }
            PolicyViolation::TradingHalted => write!(f, "Trading halted"),
        }
    }
}

/// Filters signals before they reach an execution unit
///
/// Called from the event loop for every signal; implementations must be cheap
/// and callable concurrently.
pub trait ActionPolicy: Send + Sync {
    fn approve(&self, signal: &Signal) -> Result<(), PolicyViolation>;
}

/// Quantity cap, symbol block list and a halt switch
#[derive(Debug)]
pub struct LimitPolicy {
    /// Fixed-point maximum, `None` for no cap
    max_order_qty: Option<i64>,
    blocked: Vec<Symbol>,
    halted: AtomicBool,
}

impl LimitPolicy {
    pub fn new(max_order_qty: Option<i64>, blocked: Vec<Symbol>) -> Self {
        Self {
            max_order_qty,
            blocked,
            halted: AtomicBool::new(false),
        }
    }

    /// Approves everything with a positive quantity
    pub fn permissive() -> Self {
        Self::new(None, Vec::new())
    }

    /// Symbols longer than an instrument code cannot match any signal and
    /// are dropped
    pub fn from_config(config: &PolicyConfig, logger: &Logger) -> Self {
        let blocked = config
            .blocked_symbols
            .iter()
            .filter_map(|s| Symbol::new(s))
            .collect();
        let max = config.max_order_qty.map(fixed_point::from_f64);

        logger.info(&format!(
            "Initialized LimitPolicy (max order qty: {:?}, blocked symbols: {:?})",
            config.max_order_qty, config.blocked_symbols
        ));
        Self::new(max, blocked)
    }

    /// Reject every signal until [`resume`](Self::resume)
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.halted.store(false, Ordering::Release);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

impl ActionPolicy for LimitPolicy {
    #[inline]
    fn approve(&self, signal: &Signal) -> Result<(), PolicyViolation> {
        if self.is_halted() {
            return Err(PolicyViolation::TradingHalted);
        }

        if signal.qty <= 0 {
            return Err(PolicyViolation::ZeroQuantity);
        }

        if let Some(max) = self.max_order_qty {
            if signal.qty > max {
                return Err(PolicyViolation::OrderSizeTooLarge {
                    qty: signal.qty,
                    max,
                });
            }
        }

        if self.blocked.contains(&signal.symbol) {
            return Err(PolicyViolation::BlockedSymbol(signal.symbol));
        }

        Ok(())
    }
}
