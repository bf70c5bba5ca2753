//! Adapter capability interface
//!
//! Parsers and traders share one lifecycle shape (`init → connect →
//! disconnect`) and differ only in what they push back into the core and
//! what the core may ask of them.

use crate::config::ConfigNode;
use crate::core::{AdapterError, MarketEvent, OrderEvent, OrderId, OrderRequest, Symbol};
use crate::utils::Logger;
use crossbeam::channel::{SendTimeoutError, Sender};
use std::time::Duration;

/// Lifecycle shared by every pluggable adapter
///
/// Methods take `&self`: adapters run their own session threads and keep
/// mutable state behind their own synchronization. `connect` and
/// `disconnect` may block and are never called with a registry lock held.
pub trait Adapter: Send + Sync {
    fn id(&self) -> &str;

    /// Apply this adapter's configuration slice
    fn init(&self, config: &ConfigNode) -> Result<(), AdapterError>;

    /// Open the session
    fn connect(&self) -> Result<(), AdapterError>;

    /// Close the session; must return in bounded time
    fn disconnect(&self);
}

/// Market-data feed handler
pub trait ParserAdapter: Adapter {
    /// Request updates for `symbols`
    fn subscribe(&self, symbols: &[Symbol]) -> Result<(), AdapterError>;
}

/// Order-routing channel to a broker
pub trait TraderAdapter: Adapter {
    fn submit(&self, order: &OrderRequest) -> Result<(), AdapterError>;

    fn cancel(&self, order_id: OrderId) -> Result<(), AdapterError>;
}

/// Everything an adapter receives from the core at creation
#[derive(Debug, Clone)]
pub struct AdapterContext<E> {
    /// Identifier the adapter is registered under
    pub id: String,
    /// Event channel back into the engine
    pub events: Sender<E>,
    pub logger: Logger,
}

impl<E> AdapterContext<E> {
    pub fn new(id: impl Into<String>, events: Sender<E>, logger: Logger) -> Self {
        Self {
            id: id.into(),
            events,
            logger,
        }
    }

    /// Push an event into the engine, waiting while the queue is full
    ///
    /// Returns an error once the engine side has gone away.
    #[inline]
    pub fn emit(&self, event: E) -> Result<(), AdapterError> {
        self.events
            .send(event)
            .map_err(|_| AdapterError::NotConnected(format!("{}: engine channel closed", self.id)))
    }

    /// Like [`emit`](Self::emit) but gives up after `timeout`
    pub fn emit_timeout(&self, event: E, timeout: Duration) -> Result<(), AdapterError> {
        self.events
            .send_timeout(event, timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => {
                    AdapterError::Rejected(format!("{}: engine queue full", self.id))
                }
                SendTimeoutError::Disconnected(_) => {
                    AdapterError::NotConnected(format!("{}: engine channel closed", self.id))
                }
            })
    }
}

/// Context handed to parser modules
pub type ParserContext = AdapterContext<MarketEvent>;

/// Context handed to trader modules
pub type TraderContext = AdapterContext<OrderEvent>;
