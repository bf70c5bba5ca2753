//! Uniquely keyed collection of adapters of one kind
//!
//! One generic registry serves parsers and traders. The mapping sits behind a
//! raw lock (spin by default) that is held only while the mapping is read or
//! written; every adapter call happens on a snapshot taken outside it.

use super::adapter::{Adapter, ParserAdapter, TraderAdapter};
use crate::config::ConfigNode;
use crate::core::{AdapterState, RegistryError};
use crate::sync::RawSpinLock;
use crate::utils::Logger;
use parking_lot::lock_api::{Mutex, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of market-data parsers
pub type ParserRegistry<R = RawSpinLock> = AdapterRegistry<dyn ParserAdapter, R>;

/// Registry of order-routing traders
pub type TraderRegistry<R = RawSpinLock> = AdapterRegistry<dyn TraderAdapter, R>;

struct Slot<A: ?Sized> {
    id: String,
    adapter: Arc<A>,
    state: AdapterState,
}

struct Inner<A: ?Sized> {
    /// Insertion order
    slots: Vec<Slot<A>>,
    index: HashMap<String, usize>,
}

impl<A: ?Sized> Inner<A> {
    fn slot_mut(&mut self, id: &str) -> Option<&mut Slot<A>> {
        let i = *self.index.get(id)?;
        self.slots.get_mut(i)
    }
}

/// Outcome of [`AdapterRegistry::init_report`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Adapters that reached `Connected`
    pub connected: Vec<String>,
    /// Adapters marked `Error`, with the reason
    pub failed: Vec<InitFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitFailure {
    pub id: String,
    pub reason: String,
    pub critical: bool,
}

impl InitReport {
    /// False only when a critical adapter failed
    pub fn is_ok(&self) -> bool {
        !self.failed.iter().any(|f| f.critical)
    }

    pub fn critical_failures(&self) -> impl Iterator<Item = &InitFailure> {
        self.failed.iter().filter(|f| f.critical)
    }
}

/// Registry of adapters of one kind, keyed by identifier
pub struct AdapterRegistry<A: ?Sized + Adapter, R: RawMutex = RawSpinLock> {
    kind: &'static str,
    inner: Mutex<R, Inner<A>>,
    logger: Logger,
}

impl<A: ?Sized + Adapter, R: RawMutex> AdapterRegistry<A, R> {
    /// Empty registry; `kind` names the adapters in log lines
    pub fn new(kind: &'static str, logger: Logger) -> Self {
        Self {
            kind,
            inner: Mutex::new(Inner {
                slots: Vec::new(),
                index: HashMap::new(),
            }),
            logger,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Store `adapter` under `id`
    ///
    /// No lifecycle method is called. A duplicate `id` is rejected and the
    /// existing adapter is left untouched.
    pub fn add(&self, id: &str, adapter: Arc<A>) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        if inner.index.contains_key(id) {
            return Err(RegistryError::DuplicateIdentifier(id.to_string()));
        }

        let position = inner.slots.len();
        inner.slots.push(Slot {
            id: id.to_string(),
            adapter,
            state: AdapterState::Registered,
        });
        inner.index.insert(id.to_string(), position);
        Ok(())
    }

    /// Initialise and connect every registered adapter
    ///
    /// Each adapter receives the entry of `section` matching its id. Returns
    /// false only if an adapter whose entry is marked `critical` failed.
    pub fn init(&self, section: &ConfigNode) -> bool {
        self.init_report(section).is_ok()
    }

    /// [`init`](Self::init) with the per-adapter outcome
    pub fn init_report(&self, section: &ConfigNode) -> InitReport {
        let pending: Vec<(String, Arc<A>)> = {
            let inner = self.inner.lock();
            inner
                .slots
                .iter()
                .filter(|s| s.state == AdapterState::Registered)
                .map(|s| (s.id.clone(), Arc::clone(&s.adapter)))
                .collect()
        };

        let mut report = InitReport::default();
        for (id, adapter) in pending {
            let entry = section.find_entry(&id).unwrap_or_else(ConfigNode::empty);
            let critical = entry.get_bool_or("critical", false);

            let outcome = adapter.init(&entry).and_then(|()| {
                self.set_state(&id, AdapterState::Initialized);
                adapter.connect()
            });

            match outcome {
                Ok(()) => {
                    self.set_state(&id, AdapterState::Connected);
                    self.logger
                        .info(&format!("{} '{}' connected", self.kind, id));
                    report.connected.push(id);
                }
                Err(e) => {
                    self.set_state(&id, AdapterState::Error);
                    self.logger.error(&format!(
                        "{} '{}' failed to start{}: {}",
                        self.kind,
                        id,
                        if critical { " (critical)" } else { "" },
                        e
                    ));
                    report.failed.push(InitFailure {
                        id,
                        reason: e.to_string(),
                        critical,
                    });
                }
            }
        }
        report
    }

    /// Shared handle to the adapter registered under `id`
    pub fn lookup(&self, id: &str) -> Result<Arc<A>, RegistryError> {
        let inner = self.inner.lock();
        inner
            .index
            .get(id)
            .map(|&i| Arc::clone(&inner.slots[i].adapter))
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Adapter and its current state, read under one lock acquisition
    pub fn lookup_with_state(&self, id: &str) -> Result<(Arc<A>, AdapterState), RegistryError> {
        let inner = self.inner.lock();
        inner
            .index
            .get(id)
            .map(|&i| {
                let slot = &inner.slots[i];
                (Arc::clone(&slot.adapter), slot.state)
            })
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Call `f` on every connected adapter, in registration order
    ///
    /// The set is snapshotted first; `f` runs without the lock held. Returns
    /// the number of adapters visited.
    pub fn for_each<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&str, &A),
    {
        let ready = self.ready_snapshot();
        for (id, adapter) in &ready {
            f(id, adapter);
        }
        ready.len()
    }

    /// Disconnect every connected adapter and mark it `Disconnected`
    pub fn stop(&self) -> usize {
        let ready = self.ready_snapshot();
        for (id, adapter) in &ready {
            adapter.disconnect();
            self.set_state(id, AdapterState::Disconnected);
            self.logger
                .info(&format!("{} '{}' disconnected", self.kind, id));
        }
        ready.len()
    }

    pub fn state(&self, id: &str) -> Option<AdapterState> {
        let inner = self.inner.lock();
        inner.index.get(id).map(|&i| inner.slots[i].state)
    }

    /// Identifiers in registration order
    pub fn ids(&self) -> Vec<String> {
        self.inner.lock().slots.iter().map(|s| s.id.clone()).collect()
    }

    /// Number of adapters currently in `state`
    pub fn count_in(&self, state: AdapterState) -> usize {
        self.inner
            .lock()
            .slots
            .iter()
            .filter(|s| s.state == state)
            .count()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every adapter; callers disconnect first
    pub fn clear(&self) {
        let drained = {
            let mut inner = self.inner.lock();
            inner.index.clear();
            std::mem::take(&mut inner.slots)
        };
        // Adapter destructors may block, so they run here, unlocked
        drop(drained);
    }

    fn set_state(&self, id: &str, state: AdapterState) {
        if let Some(slot) = self.inner.lock().slot_mut(id) {
            slot.state = state;
        }
    }

    fn ready_snapshot(&self) -> Vec<(String, Arc<A>)> {
        let inner = self.inner.lock();
        inner
            .slots
            .iter()
            .filter(|s| s.state.is_ready())
            .map(|s| (s.id.clone(), Arc::clone(&s.adapter)))
            .collect()
    }
}
