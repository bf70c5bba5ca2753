//! Domain-specific error types for the runtime core
//!
//! Each layer has its own error enum; `EngineError` is the taxonomy surfaced to
//! whoever drives the runner lifecycle. Adapter-local failures never reach it
//! directly, they are absorbed at the registry boundary and logged.

use crate::runner::RunnerState;
use std::path::PathBuf;
use thiserror::Error;

/// Object pool failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool cannot grow: slot limit reached or the allocator refused
    #[error("object pool exhausted: {slots} slots allocated (limit: {limit:?})")]
    Exhausted {
        /// Slots allocated when growth failed
        slots: usize,
        /// Configured slot limit, if any
        limit: Option<usize>,
    },

    /// Handle does not refer to a live object of this pool
    #[error("stale or foreign pool handle (slot {index}, generation {generation})")]
    StaleHandle { index: u32, generation: u32 },
}

/// Configuration loading and lookup failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {name}: {reason}")]
    Parse { name: String, reason: String },

    #[error("configuration is missing required section '{0}'")]
    MissingSection(String),

    #[error("invalid configuration value at '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

/// Failures reported by an adapter implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("adapter init failed: {0}")]
    Init(String),

    #[error("adapter connect failed: {0}")]
    Connect(String),

    #[error("adapter is not connected: {0}")]
    NotConnected(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Adapter registry failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("adapter '{0}' is already registered")]
    DuplicateIdentifier(String),

    #[error("adapter '{0}' not found")]
    NotFound(String),
}

/// Executer factory failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecuterError {
    #[error("executer type '{0}' is already registered")]
    DuplicateType(String),

    #[error("executer type '{0}' is not registered")]
    UnknownType(String),

    #[error("failed to create executer of type '{type_id}': {reason}")]
    CreateFailed { type_id: String, reason: String },

    #[error("executer instance '{0}' already exists")]
    DuplicateInstance(String),

    #[error("executer instance '{0}' not found")]
    NotFound(String),

    #[error("order routing failed: {0}")]
    Routing(String),
}

/// Lifecycle-level error taxonomy
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or missing configuration, fatal to `init`
    #[error("configuration load error: {0}")]
    ConfigLoad(#[from] ConfigError),

    /// Critical subsystem construction failed, fatal to `config`
    #[error("configuration failed: {0}")]
    ConfigFailed(String),

    #[error("duplicate identifier '{0}'")]
    DuplicateIdentifier(String),

    #[error("duplicate type '{0}'")]
    DuplicateType(String),

    #[error("'{0}' not found")]
    NotFound(String),

    /// Non-critical adapter failure, the engine keeps going
    #[error("adapter '{id}' failed to initialise: {reason}")]
    AdapterInitFailed { id: String, reason: String },

    #[error("runner is not configured (state: {0})")]
    NotConfigured(RunnerState),

    #[error("'{op}' is not valid in state {state}")]
    InvalidState { op: &'static str, state: RunnerState },

    #[error("allocator exhausted: {0}")]
    AllocatorExhausted(PoolError),

    #[error("create failed for type '{type_id}': {reason}")]
    CreateFailed { type_id: String, reason: String },

    /// The engine worker thread could not be started
    #[error("engine worker failed: {0}")]
    Worker(String),
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateIdentifier(id) => EngineError::DuplicateIdentifier(id),
            RegistryError::NotFound(id) => EngineError::NotFound(id),
        }
    }
}

impl From<ExecuterError> for EngineError {
    fn from(err: ExecuterError) -> Self {
        match err {
            ExecuterError::DuplicateType(t) => EngineError::DuplicateType(t),
            ExecuterError::DuplicateInstance(id) => EngineError::DuplicateIdentifier(id),
            ExecuterError::NotFound(id) => EngineError::NotFound(id),
            ExecuterError::UnknownType(t) => EngineError::CreateFailed {
                type_id: t,
                reason: "type not registered".to_string(),
            },
            ExecuterError::CreateFailed { type_id, reason } => {
                EngineError::CreateFailed { type_id, reason }
            }
            ExecuterError::Routing(reason) => EngineError::ConfigFailed(reason),
        }
    }
}

impl From<PoolError> for EngineError {
    fn from(err: PoolError) -> Self {
        EngineError::AllocatorExhausted(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_maps_to_taxonomy() {
        let err: EngineError = RegistryError::DuplicateIdentifier("CTP1".into()).into();
        assert!(matches!(err, EngineError::DuplicateIdentifier(ref id) if id == "CTP1"));

        let err: EngineError = RegistryError::NotFound("CTP2".into()).into();
        assert!(matches!(err, EngineError::NotFound(ref id) if id == "CTP2"));
    }

    #[test]
    fn test_executer_error_maps_to_taxonomy() {
        let err: EngineError = ExecuterError::DuplicateType("direct".into()).into();
        assert!(matches!(err, EngineError::DuplicateType(_)));

        let err: EngineError = ExecuterError::UnknownType("twap".into()).into();
        assert!(matches!(err, EngineError::CreateFailed { ref type_id, .. } if type_id == "twap"));
    }

    #[test]
    fn test_pool_error_is_allocator_exhausted() {
        let err: EngineError = PoolError::Exhausted {
            slots: 64,
            limit: Some(64),
        }
        .into();
        assert!(matches!(err, EngineError::AllocatorExhausted(_)));
        assert!(err.to_string().contains("64 slots"));
    }

    #[test]
    fn test_lifecycle_error_display() {
        let err = EngineError::NotConfigured(RunnerState::Initialized);
        assert_eq!(err.to_string(), "runner is not configured (state: Initialized)");
    }
}
