//! Synchronisation primitives
//!
//! The spin lock is opt-in for nanosecond-scale critical sections; the
//! parking `BlockingLock` is the alternative when hold times are longer.

pub mod spin;

pub use spin::{BlockingLock, RawBlockingLock, RawSpinLock, SpinLock, SpinLockGuard};
