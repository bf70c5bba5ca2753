//! Configuration sources
//!
//! A source turns a name (usually a file path) into a [`ConfigNode`]. The
//! runner only depends on the trait, so embedders can feed trees from
//! anywhere.

use super::ConfigNode;
use crate::core::ConfigError;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Producer of configuration trees
pub trait ConfigSource: Send + Sync {
    fn load(&self, name: &str) -> Result<ConfigNode, ConfigError>;
}

/// Loads JSON or TOML files; the extension picks the parser, anything else
/// is tried as JSON first, then TOML
#[derive(Debug, Clone, Copy, Default)]
pub struct FileConfigSource;

impl FileConfigSource {
    pub fn parse(name: &str, contents: &str) -> Result<ConfigNode, ConfigError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("json") => ConfigNode::from_json_str(name, contents),
            Some("toml") => ConfigNode::from_toml_str(name, contents),
            _ => ConfigNode::from_json_str(name, contents).or_else(|json_err| {
                debug!("{} is not JSON ({}), trying TOML", name, json_err);
                ConfigNode::from_toml_str(name, contents)
            }),
        }
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self, name: &str) -> Result<ConfigNode, ConfigError> {
        info!("Loading configuration from {:?}", name);

        let contents = std::fs::read_to_string(name).map_err(|source| ConfigError::Io {
            path: name.into(),
            source,
        })?;

        Self::parse(name, &contents)
    }
}

/// In-memory source keyed by name
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    trees: HashMap<String, ConfigNode>,
}

impl StaticConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, tree: impl Into<ConfigNode>) -> Self {
        self.trees.insert(name.into(), tree.into());
        self
    }
}

impl ConfigSource for StaticConfigSource {
    fn load(&self, name: &str) -> Result<ConfigNode, ConfigError> {
        self.trees.get(name).cloned().ok_or_else(|| ConfigError::Io {
            path: name.into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such tree"),
        })
    }
}
