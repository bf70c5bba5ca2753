//! Cooperative stop flag shared by the runner, its worker and the process
//!
//! Tripping is a single atomic store, so it is safe from a Ctrl-C handler.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StopState {
    /// Keep running
    Running = 0,
    /// Stop requested, loop not yet out
    Stopping = 1,
}

impl From<u8> for StopState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Running,
            _ => Self::Stopping,
        }
    }
}

/// Cloneable stop request
#[derive(Debug, Clone)]
pub struct StopHandle {
    state: Arc<AtomicU8>,
    reason: Arc<parking_lot::Mutex<Option<(String, SystemTime)>>>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(StopState::Running as u8)),
            reason: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    /// Request a stop; the first reason wins. Returns false if a stop was
    /// already requested.
    pub fn stop(&self, reason: &str) -> bool {
        let first = self
            .state
            .compare_exchange(
                StopState::Running as u8,
                StopState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if first {
            *self.reason.lock() = Some((reason.to_string(), SystemTime::now()));
        }
        first
    }

    /// Request a stop without touching the reason lock (signal handlers)
    #[inline]
    pub fn trip(&self) {
        self.state
            .store(StopState::Stopping as u8, Ordering::Release);
    }

    #[inline(always)]
    pub fn should_stop(&self) -> bool {
        self.state.load(Ordering::Acquire) != StopState::Running as u8
    }

    pub fn state(&self) -> StopState {
        StopState::from(self.state.load(Ordering::Acquire))
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.lock().as_ref().map(|(r, _)| r.clone())
    }

    pub fn requested_at(&self) -> Option<SystemTime> {
        self.reason.lock().as_ref().map(|(_, t)| *t)
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}
