//! Paper trader
//!
//! Accepts orders without a broker and reports them back as filled at their
//! limit price. Orders can instead rest until cancelled (`fill = false`), and
//! an optional size cap rejects oversized orders the way a broker risk check
//! would.

use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use yz_core::prelude::*;

pub const MODULE: &str = "paper";

/// Longest wait for room in the engine's order queue
const EMIT_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Deserialize)]
struct PaperSettings {
    #[serde(default = "default_fill")]
    fill: bool,
    #[serde(default)]
    max_qty: Option<f64>,
    #[serde(default)]
    fail_connect: bool,
}

fn default_fill() -> bool {
    true
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            fill: true,
            max_qty: None,
            fail_connect: false,
        }
    }
}

/// Counters since connect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaperStats {
    pub submitted: u64,
    pub filled: u64,
    pub rejected: u64,
    pub cancelled: u64,
}

pub struct PaperTrader {
    ctx: TraderContext,
    settings: Mutex<PaperSettings>,
    connected: AtomicBool,
    resting: Mutex<HashMap<OrderId, OrderRequest>>,
    submitted: AtomicU64,
    filled: AtomicU64,
    rejected: AtomicU64,
    cancelled: AtomicU64,
}

impl PaperTrader {
    pub fn new(ctx: TraderContext) -> Self {
        Self {
            ctx,
            settings: Mutex::new(PaperSettings::default()),
            connected: AtomicBool::new(false),
            resting: Mutex::new(HashMap::new()),
            submitted: AtomicU64::new(0),
            filled: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> PaperStats {
        PaperStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            filled: self.filled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }

    /// Orders waiting for a cancel
    pub fn resting(&self) -> usize {
        self.resting.lock().len()
    }

    fn report(&self, order: &OrderRequest, status: OrderStatus, filled_qty: i64) {
        let event = OrderEvent {
            order_id: order.order_id,
            trader: order.trader,
            symbol: order.symbol,
            side: order.side,
            status,
            filled_qty,
            fill_price: if filled_qty > 0 { order.price } else { 0 },
            ts_ns: now_ns(),
        };
        if let Err(e) = self.ctx.emit_timeout(event, EMIT_TIMEOUT) {
            self.ctx.logger.warn(&format!(
                "paper trader '{}' lost {:?} for order {}: {}",
                self.ctx.id, status, order.order_id, e
            ));
        }
    }
}

impl Adapter for PaperTrader {
    fn id(&self) -> &str {
        &self.ctx.id
    }

    fn init(&self, config: &ConfigNode) -> Result<(), AdapterError> {
        let settings: PaperSettings = config
            .deserialize()
            .map_err(|e| AdapterError::Init(format!("{}: {}", self.ctx.id, e)))?;
        if matches!(settings.max_qty, Some(max) if max <= 0.0) {
            return Err(AdapterError::Init(format!(
                "{}: max_qty must be positive",
                self.ctx.id
            )));
        }
        *self.settings.lock() = settings;
        Ok(())
    }

    fn connect(&self) -> Result<(), AdapterError> {
        if self.settings.lock().fail_connect {
            return Err(AdapterError::Connect(format!(
                "{}: simulated connect failure",
                self.ctx.id
            )));
        }
        self.connected.store(true, Ordering::Release);
        self.ctx
            .logger
            .info(&format!("paper trader '{}' connected", self.ctx.id));
        Ok(())
    }

    fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        let dropped = {
            let mut resting = self.resting.lock();
            let n = resting.len();
            resting.clear();
            n
        };
        let stats = self.stats();
        self.ctx.logger.info(&format!(
            "paper trader '{}' disconnected: {} submitted, {} filled, {} rejected, {} resting dropped",
            self.ctx.id, stats.submitted, stats.filled, stats.rejected, dropped
        ));
    }
}

impl TraderAdapter for PaperTrader {
    fn submit(&self, order: &OrderRequest) -> Result<(), AdapterError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(AdapterError::NotConnected(self.ctx.id.clone()));
        }
        self.submitted.fetch_add(1, Ordering::Relaxed);

        let settings = self.settings.lock().clone();
        if let Some(max) = settings.max_qty {
            let max = fixed_point::from_f64(max);
            if order.qty > max {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                self.report(order, OrderStatus::Rejected, 0);
                return Err(AdapterError::Rejected(format!(
                    "order {} qty {} above limit {}",
                    order.order_id,
                    fixed_point::to_f64(order.qty),
                    fixed_point::to_f64(max)
                )));
            }
        }

        self.report(order, OrderStatus::Accepted, 0);
        if settings.fill {
            self.filled.fetch_add(1, Ordering::Relaxed);
            self.report(order, OrderStatus::Filled, order.qty);
        } else {
            self.resting.lock().insert(order.order_id, *order);
        }
        Ok(())
    }

    fn cancel(&self, order_id: OrderId) -> Result<(), AdapterError> {
        let order = self
            .resting
            .lock()
            .remove(&order_id)
            .ok_or_else(|| AdapterError::Rejected(format!("order {} is not resting", order_id)))?;
        self.cancelled.fetch_add(1, Ordering::Relaxed);
        self.report(&order, OrderStatus::Cancelled, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::{bounded, Receiver};
    use serde_json::json;
    use yz_core::core::UnitId;

    fn trader(settings: serde_json::Value) -> (PaperTrader, Receiver<OrderEvent>) {
        let (tx, rx) = bounded(16);
        let t = PaperTrader::new(TraderContext::new("T1", tx, Logger::default()));
        t.init(&ConfigNode::new(settings)).unwrap();
        (t, rx)
    }

    fn order(qty: f64) -> OrderRequest {
        OrderRequest {
            order_id: OrderId::generate(),
            trader: UnitId::new("T1").unwrap(),
            executer: UnitId::new("E1").unwrap(),
            symbol: Symbol::new("rb2410").unwrap(),
            side: Side::Buy,
            qty: fixed_point::from_f64(qty),
            price: fixed_point::from_f64(3500.0),
        }
    }

    #[test]
    fn test_submit_requires_connect() {
        let (t, _rx) = trader(json!({}));
        assert!(matches!(t.submit(&order(1.0)), Err(AdapterError::NotConnected(_))));
    }

    #[test]
    fn test_fills_at_limit_price() {
        let (t, rx) = trader(json!({}));
        t.connect().unwrap();
        let o = order(2.0);
        t.submit(&o).unwrap();

        let accepted = rx.try_recv().unwrap();
        assert_eq!(accepted.status, OrderStatus::Accepted);
        let filled = rx.try_recv().unwrap();
        assert_eq!(filled.status, OrderStatus::Filled);
        assert_eq!(filled.order_id, o.order_id);
        assert_eq!(filled.filled_qty, o.qty);
        assert_eq!(filled.fill_price, o.price);
        assert_eq!(t.stats().filled, 1);
    }

    #[test]
    fn test_size_cap_rejects() {
        let (t, rx) = trader(json!({ "max_qty": 1.0 }));
        t.connect().unwrap();
        assert!(matches!(t.submit(&order(5.0)), Err(AdapterError::Rejected(_))));
        assert_eq!(rx.try_recv().unwrap().status, OrderStatus::Rejected);
        assert_eq!(t.stats().rejected, 1);
    }

    #[test]
    fn test_resting_orders_cancel() {
        let (t, rx) = trader(json!({ "fill": false }));
        t.connect().unwrap();
        let o = order(1.0);
        t.submit(&o).unwrap();
        assert_eq!(t.resting(), 1);

        t.cancel(o.order_id).unwrap();
        assert!(t.cancel(o.order_id).is_err());
        let statuses: Vec<_> = rx.try_iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![OrderStatus::Accepted, OrderStatus::Cancelled]);
    }

    #[test]
    fn test_disconnect_drops_resting() {
        let (t, _rx) = trader(json!({ "fill": false }));
        t.connect().unwrap();
        t.submit(&order(1.0)).unwrap();
        t.disconnect();
        assert_eq!(t.resting(), 0);
        assert!(t.submit(&order(1.0)).is_err());
    }

    #[test]
    fn test_invalid_max_qty() {
        let (tx, _rx) = bounded(1);
        let t = PaperTrader::new(TraderContext::new("T1", tx, Logger::default()));
        assert!(t.init(&ConfigNode::new(json!({ "max_qty": 0.0 }))).is_err());
    }
}
