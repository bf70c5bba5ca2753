//! YZ Core - low-latency trading runtime core
//!
//! The core owns the pieces every strategy deployment shares: the adapter
//! registries for market-data parsers and order traders, the executer factory,
//! and the runner that sequences them through `init → config → run → shutdown`.
//! Concrete adapters, executers and strategies are linked in by the process
//! through a [`ModuleCatalog`](registry::ModuleCatalog).
//!
//! ## Hot path
//! - Critical sections measured in nanoseconds use [`SpinLock`](sync::SpinLock)
//! - Ticks live in [`ObjectPool`](perf::ObjectPool) slots, updated in place
//! - Counters are cache-padded atomics
//!
//! ## Modules
//! - `core`: value types, events, error taxonomy
//! - `config`: read-only configuration tree and typed sections
//! - `sync`: spin lock and its blocking alternative
//! - `perf`: object pool, metrics, CPU affinity
//! - `utils`: logging
//! - `registry`: adapter contract, registries, module catalog
//! - `executer`: execution units and their factory
//! - `subsystems`: data manager, policy, notifier, strategy contract
//! - `runner`: lifecycle state machine and event loop

pub mod config;
pub mod core;
pub mod executer;
pub mod perf;
pub mod registry;
pub mod runner;
pub mod subsystems;
pub mod sync;
pub mod utils;

pub use crate::core::{
    fixed_point, AdapterError, AdapterState, ConfigError, EngineError, ExecuterError, LogLevel,
    MarketEvent, OrderEvent, OrderId, OrderRequest, OrderStatus, PoolError, RegistryError, Side,
    Signal, Symbol,
};
pub use config::ConfigNode;
pub use executer::ExecuterFactory;
pub use registry::{ModuleCatalog, ParserRegistry, TraderRegistry};
pub use runner::{EngineRunner, RunnerState, StopHandle};

pub use anyhow::{Error, Result};

/// Prelude for plugin crates and binaries
pub mod prelude {
    pub use crate::config::{ConfigNode, StrategyEntry, StrategyKind};
    pub use crate::core::{
        fixed_point, now_ns, AdapterError, EngineError, ExecuterError, LogLevel, MarketEvent,
        OrderEvent, OrderId, OrderRequest, OrderStatus, Side, Signal, Symbol,
    };
    pub use crate::executer::{ExecuterContext, ExecutionUnit};
    pub use crate::registry::{
        Adapter, ModuleCatalog, ParserAdapter, ParserContext, TraderAdapter, TraderContext,
    };
    pub use crate::runner::{EngineRunner, RunnerState, StopHandle};
    pub use crate::subsystems::{StrategyEngine, StrategyStats};
    pub use crate::utils::Logger;
    pub use crate::{Error, Result};
}
