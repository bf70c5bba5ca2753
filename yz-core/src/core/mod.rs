//! Core value types for the runtime
//!
//! - `types`: inline identifiers, sides, log levels, adapter states, fixed-point
//! - `events`: market, signal, order-request and order-status payloads
//! - `errors`: per-layer error enums and the lifecycle taxonomy

pub mod errors;
pub mod events;
pub mod types;

pub use errors::{
    AdapterError, ConfigError, EngineError, ExecuterError, PoolError, RegistryError,
};
pub use events::{now_ns, MarketEvent, OrderEvent, OrderId, OrderRequest, OrderStatus, Signal};
pub use types::{
    fixed_point, AdapterState, ExchangeCode, InlineStr, LogLevel, Side, Symbol, UnitId,
};
