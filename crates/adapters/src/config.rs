// SPDX-License-Identifier: MIT

//! Configuration source.
//!
//! The engine consumes flattened key/value maps (see
//! `dispatch_core::config`); where those maps come from is an adapter
//! concern. [`TomlConfigLoader`] reads them from a config directory;
//! [`StaticConfigLoader`] serves fixed maps for tests and embedding.

use dispatch_core::config::ConfigError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Platform config file inside the config directory.
pub const PLATFORM_FILE: &str = "dispatch.toml";
/// Agent definitions file inside the config directory.
pub const AGENTS_FILE: &str = "agents.toml";

/// Errors from reading a configuration source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// The two raw configuration trees, flattened to `a/b/c` keys.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub platform: BTreeMap<String, String>,
    pub agents: BTreeMap<String, String>,
}

/// Produces the raw configuration trees on demand. Called once at startup
/// and again on every reload request.
pub trait ConfigLoader: Send + Sync + 'static {
    fn load(&self) -> Result<RawConfig, LoadError>;
}

/// Loader over fixed in-memory maps.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigLoader {
    raw: RawConfig,
}

impl StaticConfigLoader {
    pub fn new(raw: RawConfig) -> Self {
        Self { raw }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<RawConfig, LoadError> {
        Ok(self.raw.clone())
    }
}

/// Loader that reads `dispatch.toml` and `agents.toml` from a directory
/// and flattens nested tables into slash-separated keys. Array elements
/// flatten to their index, so `special = ["EXCLUSIVE"]` becomes
/// `special/0 = EXCLUSIVE`.
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    dir: PathBuf,
}

impl TomlConfigLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn load_file(&self, name: &str) -> Result<BTreeMap<String, String>, LoadError> {
        let path = self.dir.join(name);
        let text = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let value: toml::Value = toml::from_str(&text).map_err(|source| LoadError::Parse {
            path: path.clone(),
            source,
        })?;
        let mut map = BTreeMap::new();
        flatten("", &value, &mut map);
        Ok(map)
    }
}

impl ConfigLoader for TomlConfigLoader {
    fn load(&self) -> Result<RawConfig, LoadError> {
        Ok(RawConfig {
            platform: self.load_file(PLATFORM_FILE)?,
            agents: self.load_file(AGENTS_FILE)?,
        })
    }
}

fn flatten(prefix: &str, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let child = join_key(prefix, key);
                flatten(&child, val, out);
            }
        }
        toml::Value::Array(items) => {
            for (index, val) in items.iter().enumerate() {
                let child = join_key(prefix, &index.to_string());
                flatten(&child, val, out);
            }
        }
        toml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix, key)
    }
}

/// Convenience for the daemon: load and validate in one step.
pub fn load_snapshot(
    loader: &dyn ConfigLoader,
) -> Result<dispatch_core::ConfigSnapshot, LoadError> {
    let raw = loader.load()?;
    Ok(dispatch_core::ConfigSnapshot::from_maps(
        &raw.platform,
        &raw.agents,
    )?)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
