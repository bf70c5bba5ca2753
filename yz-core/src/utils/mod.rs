pub mod logger;

pub use logger::{init_logger, CaptureSink, LogHandler, LogSink, Logger, TracingSink};
