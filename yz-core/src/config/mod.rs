//! Read-only configuration tree
//!
//! The runtime needs lookup-by-path and section extraction, not a file
//! syntax: `ConfigNode` wraps a `serde_json::Value` produced by a
//! [`ConfigSource`]. Nothing mutates it after `init`.

pub mod loader;
pub mod types;

pub use loader::{ConfigSource, FileConfigSource, StaticConfigSource};
pub use types::*;

use crate::core::ConfigError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Top-level sections every engine configuration must carry
pub const REQUIRED_SECTIONS: &[&str] = &["env"];

/// Immutable node of the configuration tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigNode {
    value: Value,
}

impl ConfigNode {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Empty table
    pub fn empty() -> Self {
        Self::new(Value::Object(Default::default()))
    }

    pub fn from_json_str(name: &str, text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text)
            .map(Self::new)
            .map_err(|e| ConfigError::Parse {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn from_toml_str(name: &str, text: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Value>(text)
            .map(Self::new)
            .map_err(|e| ConfigError::Parse {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Value at a dot path; numeric segments index into sequences
    ///
    /// `lookup("parsers.0.id")` reads the `id` of the first parser entry.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.value);
        }
        path.split('.').try_fold(&self.value, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn has(&self, path: &str) -> bool {
        self.lookup(path).map_or(false, |v| !v.is_null())
    }

    /// Owned sub-tree at `path`
    pub fn section(&self, path: &str) -> Option<ConfigNode> {
        self.lookup(path)
            .filter(|v| !v.is_null())
            .cloned()
            .map(ConfigNode::new)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(Value::as_str)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.lookup(path).and_then(Value::as_u64)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.lookup(path).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.lookup(path).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.lookup(path).and_then(Value::as_bool)
    }

    pub fn get_str_or<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.get_str(path).unwrap_or(default)
    }

    pub fn get_u64_or(&self, path: &str, default: u64) -> u64 {
        self.get_u64(path).unwrap_or(default)
    }

    pub fn get_f64_or(&self, path: &str, default: f64) -> f64 {
        self.get_f64(path).unwrap_or(default)
    }

    pub fn get_bool_or(&self, path: &str, default: bool) -> bool {
        self.get_bool(path).unwrap_or(default)
    }

    /// String at `path` or an `Invalid` error naming the path
    pub fn require_str(&self, path: &str) -> Result<&str, ConfigError> {
        self.get_str(path).ok_or_else(|| ConfigError::Invalid {
            path: path.to_string(),
            reason: "expected a string".to_string(),
        })
    }

    pub fn is_sequence(&self) -> bool {
        self.value.is_array()
    }

    /// Elements of a sequence node (empty for anything else)
    pub fn entries(&self) -> impl Iterator<Item = ConfigNode> + '_ {
        self.value
            .as_array()
            .into_iter()
            .flatten()
            .cloned()
            .map(ConfigNode::new)
    }

    /// Entry for `id`: the sequence element whose `id` field matches, or the
    /// table member keyed by `id`
    pub fn find_entry(&self, id: &str) -> Option<ConfigNode> {
        match &self.value {
            Value::Array(items) => items
                .iter()
                .find(|item| item.get("id").and_then(Value::as_str) == Some(id))
                .cloned()
                .map(ConfigNode::new),
            Value::Object(map) => map.get(id).cloned().map(ConfigNode::new),
            _ => None,
        }
    }

    /// Deserialize the node into a typed view
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        serde_json::from_value(self.value.clone()).map_err(|e| ConfigError::Invalid {
            path: String::new(),
            reason: e.to_string(),
        })
    }

    /// Deserialize the sub-tree at `path`
    pub fn deserialize_at<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        let node = self
            .section(path)
            .ok_or_else(|| ConfigError::MissingSection(path.to_string()))?;
        serde_json::from_value(node.value).map_err(|e| ConfigError::Invalid {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Fail on the first missing required top-level section
    pub fn validate_required(&self, sections: &[&str]) -> Result<(), ConfigError> {
        match sections.iter().find(|s| !self.has(s)) {
            Some(missing) => Err(ConfigError::MissingSection(missing.to_string())),
            None => Ok(()),
        }
    }
}

impl From<Value> for ConfigNode {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ConfigNode {
        ConfigNode::new(json!({
            "env": { "name": "test", "poll_interval_us": 250 },
            "parsers": [
                { "id": "P1", "module": "sim", "critical": true },
                { "id": "P2", "module": "sim", "active": false }
            ],
            "traders": { "T1": { "module": "paper" } }
        }))
    }

    #[test]
    fn test_lookup_by_path() {
        let cfg = sample();
        assert_eq!(cfg.get_str("env.name"), Some("test"));
        assert_eq!(cfg.get_u64("env.poll_interval_us"), Some(250));
        assert_eq!(cfg.get_str("parsers.1.id"), Some("P2"));
        assert_eq!(cfg.get_bool("parsers.0.critical"), Some(true));
        assert!(cfg.lookup("parsers.9.id").is_none());
        assert!(cfg.lookup("env.name.deeper").is_none());
    }

    #[test]
    fn test_defaults() {
        let cfg = sample();
        assert_eq!(cfg.get_u64_or("env.missing", 7), 7);
        assert_eq!(cfg.get_str_or("env.name", "x"), "test");
        assert!(!cfg.get_bool_or("parsers.1.active", true));
    }

    #[test]
    fn test_section_and_entries() {
        let cfg = sample();
        let parsers = cfg.section("parsers").unwrap();
        assert!(parsers.is_sequence());
        let ids: Vec<_> = parsers
            .entries()
            .map(|e| e.get_str("id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["P1", "P2"]);
        assert!(cfg.section("missing").is_none());
    }

    #[test]
    fn test_find_entry_in_sequence_and_table() {
        let cfg = sample();
        let p2 = cfg.section("parsers").unwrap().find_entry("P2").unwrap();
        assert_eq!(p2.get_bool("active"), Some(false));

        let t1 = cfg.section("traders").unwrap().find_entry("T1").unwrap();
        assert_eq!(t1.get_str("module"), Some("paper"));

        assert!(cfg.section("traders").unwrap().find_entry("T9").is_none());
    }

    #[test]
    fn test_validate_required() {
        assert!(sample().validate_required(REQUIRED_SECTIONS).is_ok());
        let err = ConfigNode::empty()
            .validate_required(REQUIRED_SECTIONS)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection(s) if s == "env"));
    }

    #[test]
    fn test_parse_toml_and_json() {
        let toml = ConfigNode::from_toml_str("t", "[env]\nname = \"a\"\n").unwrap();
        assert_eq!(toml.get_str("env.name"), Some("a"));

        let json = ConfigNode::from_json_str("j", r#"{"env":{"name":"b"}}"#).unwrap();
        assert_eq!(json.get_str("env.name"), Some("b"));

        assert!(matches!(
            ConfigNode::from_json_str("bad", "{not json"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_require_str() {
        let cfg = sample();
        assert_eq!(cfg.require_str("env.name").unwrap(), "test");
        assert!(matches!(
            cfg.require_str("env.poll_interval_us"),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
