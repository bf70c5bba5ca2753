//! Execution units and the factory that owns them

pub mod factory;
pub mod unit;

pub use factory::ExecuterFactory;
pub use unit::{ExecuterContext, ExecuterCreator, ExecutionUnit, OrderGateway, OrderRouter};
