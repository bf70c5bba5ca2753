//! Direct executer - one order per approved signal
//!
//! Parameters: `trader` (required), `qty` (optional fixed order size that
//! overrides the signal's quantity).

use anyhow::{anyhow, Context};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use yz_core::core::UnitId;
use yz_core::executer::{ExecuterCreator, OrderRouter};
use yz_core::prelude::*;

pub const TYPE: &str = "direct";

pub struct DirectExecuter {
    id: String,
    unit_id: UnitId,
    trader: String,
    trader_id: UnitId,
    qty: Option<i64>,
    router: OrderRouter,
    logger: Logger,
    routed: AtomicU64,
    fills: AtomicU64,
}

impl DirectExecuter {
    pub fn new(ctx: ExecuterContext, trader: &str, qty: Option<i64>) -> anyhow::Result<Self> {
        let unit_id =
            UnitId::new(&ctx.id).ok_or_else(|| anyhow!("executer id '{}' is too long", ctx.id))?;
        let trader_id =
            UnitId::new(trader).ok_or_else(|| anyhow!("trader id '{}' is too long", trader))?;
        Ok(Self {
            id: ctx.id,
            unit_id,
            trader: trader.to_string(),
            trader_id,
            qty,
            router: ctx.router,
            logger: ctx.logger,
            routed: AtomicU64::new(0),
            fills: AtomicU64::new(0),
        })
    }

    /// Orders handed to the trader
    pub fn routed(&self) -> u64 {
        self.routed.load(Ordering::Relaxed)
    }

    /// Fill reports received
    pub fn fills(&self) -> u64 {
        self.fills.load(Ordering::Relaxed)
    }
}

impl ExecutionUnit for DirectExecuter {
    fn id(&self) -> &str {
        &self.id
    }

    fn trader(&self) -> &str {
        &self.trader
    }

    fn on_signal(&self, signal: &Signal) -> Result<Option<OrderRequest>, ExecuterError> {
        let qty = self.qty.unwrap_or(signal.qty);
        if qty <= 0 {
            return Ok(None);
        }

        let order = OrderRequest {
            order_id: OrderId::generate(),
            trader: self.trader_id,
            executer: self.unit_id,
            symbol: signal.symbol,
            side: signal.side,
            qty,
            price: signal.price,
        };
        self.router.route(&order)?;
        self.routed.fetch_add(1, Ordering::Relaxed);
        Ok(Some(order))
    }

    fn on_order(&self, event: &OrderEvent) {
        if event.status == OrderStatus::Filled {
            self.fills.fetch_add(1, Ordering::Relaxed);
        } else if event.status == OrderStatus::Rejected {
            self.logger.warn(&format!(
                "executer '{}': order {} rejected by {}",
                self.id, event.order_id, event.trader
            ));
        }
    }
}

/// Creator registered under [`TYPE`]
pub fn creator() -> ExecuterCreator {
    Arc::new(
        |config: &ConfigNode, ctx: ExecuterContext| -> anyhow::Result<Arc<dyn ExecutionUnit>> {
            let trader = config
                .require_str("trader")
                .with_context(|| format!("executer '{}'", ctx.id))?
                .to_string();
            let qty = config.get_f64("qty").map(fixed_point::from_f64);
            if matches!(qty, Some(q) if q <= 0) {
                return Err(anyhow!("executer '{}': qty must be positive", ctx.id));
            }
            let unit = DirectExecuter::new(ctx, &trader, qty)?;
            Ok(Arc::new(unit))
        },
    )
}
