//! Pluggable adapters and their registries
//!
//! - `adapter`: the parser/trader capability traits and the creation context
//! - `adapter_registry`: generic keyed registry with init/connect/stop
//! - `catalog`: module name → creator tables filled by the process entry point

pub mod adapter;
pub mod adapter_registry;
pub mod catalog;

pub use adapter::{
    Adapter, AdapterContext, ParserAdapter, ParserContext, TraderAdapter, TraderContext,
};
pub use adapter_registry::{AdapterRegistry, InitFailure, InitReport, ParserRegistry, TraderRegistry};
pub use catalog::{AdapterCreator, ModuleCatalog, ParserCreator, TraderCreator};
