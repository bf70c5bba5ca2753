//! Module catalog - named creators for every pluggable kind
//!
//! The process entry point fills the catalog with the modules it links in;
//! configuration entries then refer to them by name.

use super::adapter::{AdapterContext, ParserAdapter, ParserContext, TraderAdapter, TraderContext};
use crate::config::ConfigNode;
use crate::core::{MarketEvent, OrderEvent, RegistryError};
use crate::executer::ExecuterCreator;
use crate::subsystems::StrategyCreator;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds an adapter bound to its context
pub type AdapterCreator<A, E> =
    Arc<dyn Fn(AdapterContext<E>) -> anyhow::Result<Arc<A>> + Send + Sync>;

pub type ParserCreator = AdapterCreator<dyn ParserAdapter, MarketEvent>;

pub type TraderCreator = AdapterCreator<dyn TraderAdapter, OrderEvent>;

/// Name → creator tables
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    parsers: HashMap<String, ParserCreator>,
    traders: HashMap<String, TraderCreator>,
    executers: HashMap<String, ExecuterCreator>,
    strategies: HashMap<String, StrategyCreator>,
}

fn insert_unique<C>(
    table: &mut HashMap<String, C>,
    name: &str,
    creator: C,
) -> Result<(), RegistryError> {
    if table.contains_key(name) {
        return Err(RegistryError::DuplicateIdentifier(name.to_string()));
    }
    table.insert(name.to_string(), creator);
    Ok(())
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser module
    pub fn register_parser<F>(&mut self, module: &str, creator: F) -> Result<(), RegistryError>
    where
        F: Fn(ParserContext) -> anyhow::Result<Arc<dyn ParserAdapter>> + Send + Sync + 'static,
    {
        insert_unique(&mut self.parsers, module, Arc::new(creator) as ParserCreator)
    }

    /// Register a trader module
    pub fn register_trader<F>(&mut self, module: &str, creator: F) -> Result<(), RegistryError>
    where
        F: Fn(TraderContext) -> anyhow::Result<Arc<dyn TraderAdapter>> + Send + Sync + 'static,
    {
        insert_unique(&mut self.traders, module, Arc::new(creator) as TraderCreator)
    }

    /// Register an executer type
    pub fn register_executer(
        &mut self,
        type_id: &str,
        creator: ExecuterCreator,
    ) -> Result<(), RegistryError> {
        insert_unique(&mut self.executers, type_id, creator)
    }

    /// Register a strategy type
    pub fn register_strategy(
        &mut self,
        type_id: &str,
        creator: StrategyCreator,
    ) -> Result<(), RegistryError> {
        insert_unique(&mut self.strategies, type_id, creator)
    }

    pub fn parser(&self, module: &str) -> Result<ParserCreator, RegistryError> {
        self.parsers
            .get(module)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("parser module {}", module)))
    }

    pub fn trader(&self, module: &str) -> Result<TraderCreator, RegistryError> {
        self.traders
            .get(module)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("trader module {}", module)))
    }

    pub fn strategy(&self, type_id: &str) -> Result<StrategyCreator, RegistryError> {
        self.strategies
            .get(type_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("strategy type {}", type_id)))
    }

    /// Every executer type with its creator, sorted by name
    pub fn executer_types(&self) -> Vec<(String, ExecuterCreator)> {
        let mut types: Vec<_> = self
            .executers
            .iter()
            .map(|(name, creator)| (name.clone(), Arc::clone(creator)))
            .collect();
        types.sort_by(|a, b| a.0.cmp(&b.0));
        types
    }

    /// Module names per kind, sorted, for startup logs
    pub fn describe(&self) -> String {
        fn names<C>(table: &HashMap<String, C>) -> String {
            let mut names: Vec<&str> = table.keys().map(String::as_str).collect();
            names.sort_unstable();
            names.join(",")
        }
        format!(
            "parsers [{}] traders [{}] executers [{}] strategies [{}]",
            names(&self.parsers),
            names(&self.traders),
            names(&self.executers),
            names(&self.strategies)
        )
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
            && self.traders.is_empty()
            && self.executers.is_empty()
            && self.strategies.is_empty()
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleCatalog").field(&self.describe()).finish()
    }
}

/// Configuration of a module entry minus the bookkeeping keys, for logs
pub(crate) fn entry_params(entry: &ConfigNode) -> String {
    match entry.value().as_object() {
        Some(map) => {
            let mut keys: Vec<&str> = map
                .keys()
                .map(String::as_str)
                .filter(|k| !matches!(*k, "id" | "module" | "type" | "active" | "critical"))
                .collect();
            keys.sort_unstable();
            keys.join(",")
        }
        None => String::new(),
    }
}
