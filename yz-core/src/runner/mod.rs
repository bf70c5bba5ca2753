//! Engine lifecycle
//!
//! - `engine_runner`: `init → config → run → shutdown` orchestration
//! - `engine_loop`: the event loop driven by `run`
//! - `state`: lifecycle states
//! - `stop`: cooperative stop flag

pub mod engine_loop;
pub mod engine_runner;
pub mod state;
pub mod stop;

pub use engine_loop::EngineLoop;
pub use engine_runner::EngineRunner;
pub use state::RunnerState;
pub use stop::{StopHandle, StopState};
