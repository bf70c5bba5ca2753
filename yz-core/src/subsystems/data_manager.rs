//! Data manager - latest top-of-book per symbol
//!
//! Ticks live in pooled slots so the steady state (known symbols updating in
//! place) allocates nothing. The pool is single-writer, so it sits behind a
//! spin lock: the event loop writes, any thread may read a copy.

use crate::core::{MarketEvent, PoolError, Symbol};
use crate::perf::{ObjectPool, PoolHandle, PoolStats, BLOCK_SLOTS};
use crate::sync::SpinLock;
use std::collections::HashMap;

struct TickBook {
    pool: ObjectPool<MarketEvent>,
    by_symbol: HashMap<Symbol, PoolHandle>,
    updates: u64,
}

/// Latest market event per symbol
pub struct DataManager {
    book: SpinLock<TickBook>,
}

impl DataManager {
    /// `max_ticks` is an upper bound on the distinct symbols held; the pool
    /// grows in whole blocks, so the usable count may be lower
    pub fn new(max_ticks: Option<usize>) -> Self {
        let block = max_ticks.map_or(BLOCK_SLOTS, |max| max.clamp(1, BLOCK_SLOTS));
        Self {
            book: SpinLock::new(TickBook {
                pool: ObjectPool::with_limits(block, max_ticks),
                by_symbol: HashMap::new(),
                updates: 0,
            }),
        }
    }

    /// Store `event` as the latest for its symbol
    ///
    /// Known symbols are overwritten in place; a new symbol takes a pool slot,
    /// which fails once the pool is exhausted.
    #[inline]
    pub fn on_tick(&self, event: &MarketEvent) -> Result<(), PoolError> {
        let mut book = self.book.lock();
        let book = &mut *book;
        book.updates += 1;

        if let Some(&handle) = book.by_symbol.get(&event.symbol) {
            *book.pool.get_mut(handle)? = *event;
            return Ok(());
        }

        let handle = book.pool.construct(*event)?;
        book.by_symbol.insert(event.symbol, handle);
        Ok(())
    }

    /// Copy of the latest event for `symbol`
    pub fn latest(&self, symbol: &str) -> Option<MarketEvent> {
        let key = Symbol::new(symbol)?;
        let book = self.book.lock();
        let handle = *book.by_symbol.get(&key)?;
        book.pool.get(handle).ok().copied()
    }

    /// Forget `symbol`; its slot becomes free
    pub fn remove(&self, symbol: &str) -> Option<MarketEvent> {
        let key = Symbol::new(symbol)?;
        let mut book = self.book.lock();
        let handle = book.by_symbol.remove(&key)?;
        book.pool.destroy(handle).ok()
    }

    /// Forget every symbol not updated since `cutoff_ns` (local time)
    pub fn evict_older_than(&self, cutoff_ns: u64) -> usize {
        let mut book = self.book.lock();
        let book = &mut *book;
        let pool = &mut book.pool;
        let before = book.by_symbol.len();
        book.by_symbol.retain(|_, handle| {
            let keep = pool
                .get(*handle)
                .map(|tick| tick.local_ts_ns >= cutoff_ns)
                .unwrap_or(false);
            if !keep {
                let _ = pool.destroy(*handle);
            }
            keep
        });
        before - book.by_symbol.len()
    }

    /// Give storage of fully free pool blocks back to the allocator
    ///
    /// Meant for idle periods, not the tick path.
    pub fn release_idle(&self) -> usize {
        self.book.lock().pool.release()
    }

    /// Forget every symbol and release all pool storage
    pub fn clear(&self) -> usize {
        let mut book = self.book.lock();
        let book = &mut *book;
        for (_, handle) in book.by_symbol.drain() {
            let _ = book.pool.destroy(handle);
        }
        book.pool.release()
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.book.lock().by_symbol.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.book.lock().by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ticks received since creation
    pub fn updates(&self) -> u64 {
        self.book.lock().updates
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.book.lock().pool.stats()
    }
}

impl Default for DataManager {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed_point;
    use std::sync::Arc;

    fn tick(symbol: &str, last: f64, ts: u64) -> MarketEvent {
        MarketEvent {
            symbol: Symbol::new(symbol).unwrap(),
            last_price: fixed_point::from_f64(last),
            local_ts_ns: ts,
            ..Default::default()
        }
    }

    #[test]
    fn test_latest_overwrites_in_place() {
        let dm = DataManager::default();
        dm.on_tick(&tick("rb2410", 3500.0, 1)).unwrap();
        dm.on_tick(&tick("rb2410", 3501.0, 2)).unwrap();

        let latest = dm.latest("rb2410").unwrap();
        assert_eq!(latest.last_price, fixed_point::from_f64(3501.0));
        assert_eq!(dm.len(), 1);
        assert_eq!(dm.pool_stats().in_use, 1);
        assert_eq!(dm.updates(), 2);
        assert!(dm.latest("hc2410").is_none());
    }

    #[test]
    fn test_symbol_limit() {
        let dm = DataManager::new(Some(BLOCK_SLOTS));
        for i in 0..BLOCK_SLOTS {
            dm.on_tick(&tick(&format!("s{}", i), 1.0, 0)).unwrap();
        }
        assert!(matches!(
            dm.on_tick(&tick("one-too-many", 1.0, 0)),
            Err(PoolError::Exhausted { .. })
        ));
        // Known symbols still update
        dm.on_tick(&tick("s0", 2.0, 0)).unwrap();
    }

    #[test]
    fn test_evict_and_release() {
        let dm = DataManager::default();
        dm.on_tick(&tick("old", 1.0, 10)).unwrap();
        dm.on_tick(&tick("new", 1.0, 100)).unwrap();

        assert_eq!(dm.evict_older_than(50), 1);
        assert!(dm.latest("old").is_none());
        assert!(dm.latest("new").is_some());

        // One slot still in use, so the block stays
        assert_eq!(dm.release_idle(), 0);
        assert!(dm.remove("new").is_some());
        assert_eq!(dm.release_idle(), BLOCK_SLOTS);
    }

    #[test]
    fn test_clear_releases_everything() {
        let dm = DataManager::default();
        dm.on_tick(&tick("a", 1.0, 0)).unwrap();
        dm.on_tick(&tick("b", 1.0, 0)).unwrap();
        assert_eq!(dm.clear(), BLOCK_SLOTS);
        assert!(dm.is_empty());
        assert_eq!(dm.pool_stats().slots, 0);
    }

    #[test]
    fn test_concurrent_readers() {
        let dm = Arc::new(DataManager::default());
        dm.on_tick(&tick("rb2410", 1.0, 0)).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let dm = Arc::clone(&dm);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        assert!(dm.latest("rb2410").is_some());
                    }
                })
            })
            .collect();

        for i in 0..1_000 {
            dm.on_tick(&tick("rb2410", i as f64, i)).unwrap();
        }
        for r in readers {
            r.join().unwrap();
        }
    }
}
