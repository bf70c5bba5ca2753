//! In-core implementations of the engine's collaborators
//!
//! - `data_manager`: latest tick per symbol in pooled slots
//! - `notifier`: order and rejection notifications
//! - `policy`: signal approval before execution
//! - `strategy`: the strategy engine trait and its symbol filter

pub mod data_manager;
pub mod notifier;
pub mod policy;
pub mod strategy;

pub use data_manager::DataManager;
pub use notifier::{EventNotifier, LogNotifier};
pub use policy::{ActionPolicy, LimitPolicy, PolicyViolation};
pub use strategy::{StrategyCreator, StrategyEngine, StrategyStats, SubscribedStrategy};
