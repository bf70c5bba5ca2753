//! Execution units and their path to the trader side

use crate::config::ConfigNode;
use crate::core::{AdapterState, ExecuterError, OrderEvent, OrderRequest, Signal};
use crate::registry::{AdapterRegistry, TraderAdapter};
use crate::utils::Logger;
use parking_lot::lock_api::RawMutex;
use std::fmt;
use std::sync::Arc;

/// Turns approved strategy signals into order requests
///
/// Units are shared (`Arc`) between the factory and the engine worker and
/// are invoked without any factory lock held.
pub trait ExecutionUnit: Send + Sync {
    /// Instance identifier
    fn id(&self) -> &str;

    /// Trader adapter this unit routes through
    fn trader(&self) -> &str;

    /// Handle an approved signal
    ///
    /// Returns the order that was routed, or `None` when the unit chose not
    /// to trade on this signal.
    fn on_signal(&self, signal: &Signal) -> Result<Option<OrderRequest>, ExecuterError>;

    /// Order-status update for an order this unit routed
    fn on_order(&self, _event: &OrderEvent) {}
}

/// Destination for order requests
pub trait OrderGateway: Send + Sync {
    fn route(&self, order: &OrderRequest) -> Result<(), ExecuterError>;
}

impl<R: RawMutex + Send + Sync> OrderGateway for AdapterRegistry<dyn TraderAdapter, R> {
    fn route(&self, order: &OrderRequest) -> Result<(), ExecuterError> {
        let trader = order.trader.as_str();
        let (adapter, state) = self
            .lookup_with_state(trader)
            .map_err(|e| ExecuterError::Routing(e.to_string()))?;

        if state != AdapterState::Connected {
            return Err(ExecuterError::Routing(format!(
                "trader '{}' is {}",
                trader, state
            )));
        }

        adapter
            .submit(order)
            .map_err(|e| ExecuterError::Routing(format!("trader '{}': {}", trader, e)))
    }
}

/// Cloneable handle a unit uses to reach the trader registry
#[derive(Clone)]
pub struct OrderRouter {
    gateway: Arc<dyn OrderGateway>,
}

impl OrderRouter {
    pub fn new(gateway: Arc<dyn OrderGateway>) -> Self {
        Self { gateway }
    }

    #[inline]
    pub fn route(&self, order: &OrderRequest) -> Result<(), ExecuterError> {
        self.gateway.route(order)
    }
}

impl fmt::Debug for OrderRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderRouter").finish_non_exhaustive()
    }
}

/// What a creator receives besides the configuration slice
#[derive(Debug, Clone)]
pub struct ExecuterContext {
    /// Instance identifier (the entry's `id`)
    pub id: String,
    pub router: OrderRouter,
    pub logger: Logger,
}

/// Builds an execution unit from its configuration slice
pub type ExecuterCreator = Arc<
    dyn Fn(&ConfigNode, ExecuterContext) -> anyhow::Result<Arc<dyn ExecutionUnit>> + Send + Sync,
>;
