//! Keyed factory that creates and owns execution units

use super::unit::{ExecuterContext, ExecuterCreator, ExecutionUnit, OrderRouter};
use crate::config::ConfigNode;
use crate::core::{ExecuterError, OrderRequest, Signal};
use crate::sync::RawSpinLock;
use crate::utils::Logger;
use parking_lot::lock_api::{Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    types: HashMap<String, ExecuterCreator>,
    /// Creation order
    units: Vec<Arc<dyn ExecutionUnit>>,
    index: HashMap<String, usize>,
}

/// Creates execution units by type and owns them for the engine's lifetime
///
/// The factory never interprets signal content; it only finds the unit a
/// signal is addressed to.
pub struct ExecuterFactory<R: RawMutex = RawSpinLock> {
    tables: Mutex<R, Tables>,
    router: OrderRouter,
    logger: Logger,
}

impl<R: RawMutex> ExecuterFactory<R> {
    /// Units created here route their orders through `router`
    pub fn new(router: OrderRouter, logger: Logger) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            router,
            logger,
        }
    }

    /// Associate `type_id` with a creator
    pub fn register_type(
        &self,
        type_id: &str,
        creator: ExecuterCreator,
    ) -> Result<(), ExecuterError> {
        let mut tables = self.tables.lock();
        if tables.types.contains_key(type_id) {
            return Err(ExecuterError::DuplicateType(type_id.to_string()));
        }
        tables.types.insert(type_id.to_string(), creator);
        Ok(())
    }

    /// Build a unit of `type_id` from its configuration slice
    ///
    /// The instance id is the slice's `id`. On success the factory owns the
    /// unit and it is reachable through [`lookup`](Self::lookup).
    pub fn create(
        &self,
        type_id: &str,
        config: &ConfigNode,
    ) -> Result<Arc<dyn ExecutionUnit>, ExecuterError> {
        let id = config
            .require_str("id")
            .map_err(|e| ExecuterError::CreateFailed {
                type_id: type_id.to_string(),
                reason: e.to_string(),
            })?
            .to_string();

        let creator = {
            let tables = self.tables.lock();
            if tables.index.contains_key(&id) {
                return Err(ExecuterError::DuplicateInstance(id));
            }
            tables
                .types
                .get(type_id)
                .cloned()
                .ok_or_else(|| ExecuterError::UnknownType(type_id.to_string()))?
        };

        let ctx = ExecuterContext {
            id: id.clone(),
            router: self.router.clone(),
            logger: self.logger.clone(),
        };

        // Creators may allocate or block, so the table lock is not held
        let unit = creator(config, ctx).map_err(|e| ExecuterError::CreateFailed {
            type_id: type_id.to_string(),
            reason: format!("{:#}", e),
        })?;

        let mut tables = self.tables.lock();
        if tables.index.contains_key(&id) {
            return Err(ExecuterError::DuplicateInstance(id));
        }
        let position = tables.units.len();
        tables.units.push(Arc::clone(&unit));
        tables.index.insert(id.clone(), position);
        drop(tables);

        self.logger.info(&format!(
            "executer '{}' created (type {}, trader {})",
            id,
            type_id,
            unit.trader()
        ));
        Ok(unit)
    }

    pub fn lookup(&self, id: &str) -> Result<Arc<dyn ExecutionUnit>, ExecuterError> {
        let tables = self.tables.lock();
        tables
            .index
            .get(id)
            .map(|&i| Arc::clone(&tables.units[i]))
            .ok_or_else(|| ExecuterError::NotFound(id.to_string()))
    }

    /// Hand an approved signal to the unit it names
    #[inline]
    pub fn dispatch(&self, signal: &Signal) -> Result<Option<OrderRequest>, ExecuterError> {
        let unit = self.lookup(signal.executer.as_str())?;
        unit.on_signal(signal)
    }

    /// Every unit, in creation order
    pub fn units(&self) -> Vec<Arc<dyn ExecutionUnit>> {
        self.tables.lock().units.clone()
    }

    pub fn ids(&self) -> Vec<String> {
        self.tables
            .lock()
            .units
            .iter()
            .map(|u| u.id().to_string())
            .collect()
    }

    pub fn has_type(&self, type_id: &str) -> bool {
        self.tables.lock().types.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.tables.lock().units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every unit; registered types stay
    pub fn clear_units(&self) {
        let drained = {
            let mut tables = self.tables.lock();
            tables.index.clear();
            std::mem::take(&mut tables.units)
        };
        drop(drained);
    }

    /// Drop every unit and every registered type
    pub fn clear(&self) {
        self.clear_units();
        self.tables.lock().types.clear();
    }
}
