//! Busy-wait spin lock
//!
//! `RawSpinLock` implements `lock_api::RawMutex`, so it plugs into the same
//! guard-based API as `parking_lot::Mutex`:
//!
//! ```
//! use yz_core::sync::SpinLock;
//!
//! let counter = SpinLock::new(0u64);
//! *counter.lock() += 1;
//! assert_eq!(*counter.lock(), 1);
//! ```
//!
//! Acquisition policy: exchange the flag to `true` with acquire ordering; on
//! failure spin on a relaxed load (no exclusive cache-line traffic) with a
//! pause hint, and only retry the exchange once the flag reads `false`.
//!
//! Constraints:
//! - no fairness, no timeout
//! - not re-entrant: locking twice from the same thread spins forever
//! - never hold across blocking calls (network I/O, logging I/O, allocation
//!   that may fault)

use parking_lot::lock_api::{self, GuardSend, RawMutex};
use std::sync::atomic::{AtomicBool, Ordering};

/// Raw spin lock: a single atomic flag
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
}

impl RawSpinLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock::new();

    // Unlocking from another thread is allowed
    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {
        loop {
            if !self.locked.swap(true, Ordering::Acquire) {
                return;
            }
            while self.locked.load(Ordering::Relaxed) {
                std::hint::spin_loop();
            }
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        !self.locked.swap(true, Ordering::Acquire)
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// Spin lock protecting a value
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// RAII guard of a [`SpinLock`]
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;

/// Blocking (parking) alternative for sections with longer hold times
pub type BlockingLock<T> = parking_lot::Mutex<T>;

/// Raw blocking lock, usable wherever a `RawMutex` parameter is accepted
pub type RawBlockingLock = parking_lot::RawMutex;
