use crate::core::ConfigError;
use crate::perf::WorkerAffinity;
use serde::{Deserialize, Serialize};

/// `env` section: engine-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Engine name used in log lines
    #[serde(default = "default_name")]
    pub name: String,

    /// Worker idle wait on the market channel (microseconds)
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,

    /// Capacity of the bounded adapter → engine channels
    #[serde(default = "default_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Upper bound on pooled tick slots (unbounded when absent)
    #[serde(default)]
    pub tick_pool_capacity: Option<usize>,

    /// Worker pinning and priority
    #[serde(flatten)]
    pub affinity: WorkerAffinity,

    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl EnvConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_us == 0 {
            return Err(invalid("env.poll_interval_us", "must be positive"));
        }

        if self.event_queue_capacity == 0 {
            return Err(invalid("env.event_queue_capacity", "must be positive"));
        }

        if self.tick_pool_capacity == Some(0) {
            return Err(invalid("env.tick_pool_capacity", "must be positive when set"));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(invalid(
                "env.log_level",
                &format!(
                    "invalid log level '{}', must be one of: {:?}",
                    self.log_level, valid_log_levels
                ),
            ));
        }

        Ok(())
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            poll_interval_us: default_poll_interval_us(),
            event_queue_capacity: default_queue_capacity(),
            tick_pool_capacity: None,
            affinity: WorkerAffinity::default(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Entry of the `parsers` / `traders` sequences
///
/// Any other keys in the entry are adapter parameters and reach the adapter
/// untouched through `init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterEntry {
    pub id: String,

    /// Registered module name that builds the adapter
    pub module: String,

    #[serde(default = "default_true")]
    pub active: bool,

    /// A failure of this adapter fails the whole registry init
    #[serde(default)]
    pub critical: bool,
}

/// Entry of the `executers` sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuterEntry {
    pub id: String,

    /// Registered executer type
    #[serde(rename = "type")]
    pub type_id: String,

    /// Trader adapter that carries this unit's orders
    pub trader: String,

    #[serde(default = "default_true")]
    pub active: bool,
}

/// Strategy family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Bar/tick driven, lower frequency
    #[default]
    Cta,
    /// Tick driven, latency sensitive
    Hft,
}

/// Entry of the `strategies` sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub id: String,

    /// Registered strategy type
    #[serde(rename = "type")]
    pub type_id: String,

    #[serde(default)]
    pub kind: StrategyKind,

    /// Executer unit receiving this strategy's approved signals
    pub executer: String,

    #[serde(default)]
    pub symbols: Vec<String>,

    #[serde(default = "default_true")]
    pub active: bool,
}

/// `policy` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Largest order quantity a signal may ask for
    #[serde(default)]
    pub max_order_qty: Option<f64>,

    /// Symbols no signal may trade
    #[serde(default)]
    pub blocked_symbols: Vec<String>,
}

/// `notifier` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn invalid(path: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

// Default value functions
fn default_name() -> String {
    "yz".to_string()
}

fn default_poll_interval_us() -> u64 {
    500
}

fn default_queue_capacity() -> usize {
    65_536
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
