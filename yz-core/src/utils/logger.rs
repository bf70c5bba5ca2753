use crate::core::LogLevel;
use std::fmt;
use std::sync::Arc;
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

/// Initialize tracing logger
///
/// `RUST_LOG` takes precedence over `log_level`. Safe to call more than once;
/// only the first call installs a subscriber.
pub fn init_logger(log_level: &str, json_logs: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let installed = if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!("Logger already initialized");
    }
}

/// Single entry point for severity-tagged messages from any subsystem
///
/// Implementations must be callable from adapter threads.
pub trait LogHandler: Send + Sync {
    fn handle_log(&self, level: LogLevel, message: &str);
}

/// Formats and emits records; the handler itself never filters
pub trait LogSink: Send + Sync {
    fn write(&self, level: LogLevel, message: &str);
}

/// Sink that turns records into `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
            LogLevel::Fatal => tracing::error!(fatal = true, "{}", message),
        }
    }
}

struct SinkHandler(Arc<dyn LogSink>);

impl LogHandler for SinkHandler {
    #[inline]
    fn handle_log(&self, level: LogLevel, message: &str) {
        self.0.write(level, message);
    }
}

/// Cloneable handle to the process log handler
///
/// Handed to every adapter, unit and subsystem at construction.
#[derive(Clone)]
pub struct Logger {
    handler: Arc<dyn LogHandler>,
}

impl Logger {
    pub fn new(handler: Arc<dyn LogHandler>) -> Self {
        Self { handler }
    }

    /// Logger that hands every record to `sink` unfiltered
    pub fn from_sink(sink: Arc<dyn LogSink>) -> Self {
        Self::new(Arc::new(SinkHandler(sink)))
    }

    /// Logger writing straight to `tracing`
    pub fn tracing() -> Self {
        Self::from_sink(Arc::new(TracingSink))
    }

    #[inline]
    pub fn log(&self, level: LogLevel, message: &str) {
        self.handler.handle_log(level, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn fatal(&self, message: &str) {
        self.log(LogLevel::Fatal, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

/// Sink that keeps every record in memory
#[derive(Debug, Default)]
pub struct CaptureSink {
    records: parking_lot::Mutex<Vec<(LogLevel, String)>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records.lock().clone()
    }

    /// True if any record at `level` contains `needle`
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for CaptureSink {
    fn write(&self, level: LogLevel, message: &str) {
        self.records.lock().push((level, message.to_string()));
    }
}
