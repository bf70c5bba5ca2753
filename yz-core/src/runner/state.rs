use std::fmt;

/// Lifecycle state of an [`EngineRunner`](super::EngineRunner)
///
/// ```text
/// Created → Initialized → Configured → Running → Stopped
///    │           │
///    ▼           ▼
/// InitFailed  ConfigFailed      (back to Created via reset)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerState {
    /// Constructed, nothing loaded
    Created,
    /// Configuration loaded and validated
    Initialized,
    /// Subsystems and adapters constructed
    Configured,
    /// Event loop live
    Running,
    /// Torn down
    Stopped,
    /// `init` failed
    InitFailed,
    /// `config` failed; everything built so far was torn down
    ConfigFailed,
}

impl RunnerState {
    /// States only `reset` leaves
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunnerState::Stopped | RunnerState::InitFailed | RunnerState::ConfigFailed
        )
    }

    pub fn is_failed(self) -> bool {
        matches!(self, RunnerState::InitFailed | RunnerState::ConfigFailed)
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
