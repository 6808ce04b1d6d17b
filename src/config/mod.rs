//! Loads and saves the single YAML configuration document (§6).
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::ConfigError;
use crate::model::AppConfig;
use crate::utils::prelude::*;

/// Owns the path to the on-disk document and the in-memory config it was
/// last loaded from or saved to.
#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the document. Missing sections default per `AppConfig`.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let config: AppConfig = serde_yaml::from_str(&text)?;
        Ok(config)
    }

    /// Write the document back with `exclude_defaults=true, exclude_none=true`
    /// semantics: fields equal to their type's default, and `null`s, are
    /// pruned before serializing so edited files stay readable.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let pruned = prune_defaults(config)?;
        let yaml = serde_yaml::to_string(&pruned).map_err(ConfigError::Parse)?;
        std::fs::write(&self.path, yaml).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Serialize `config` through `serde_json::Value`, drop `null`s and values
/// equal to `AppConfig::default()`'s corresponding field, and return the
/// pruned value ready for YAML re-emission.
fn prune_defaults(config: &AppConfig) -> Result<Value, ConfigError> {
    let full = serde_json::to_value(config)?;
    let default = serde_json::to_value(AppConfig::default())?;
    Ok(prune(full, &default))
}

/// Recursively remove object entries whose value is `null` or equal to the
/// corresponding entry in `default`. Arrays and scalars are compared whole.
fn prune(value: Value, default: &Value) -> Value {
    match (value, default) {
        (Value::Object(map), Value::Object(default_map)) => {
            let mut out = serde_json::Map::new();
            for (key, val) in map {
                if val.is_null() {
                    continue;
                }
                let default_val = default_map.get(&key).cloned().unwrap_or(Value::Null);
                let pruned = prune(val, &default_val);
                if pruned == default_val {
                    continue;
                }
                out.insert(key, pruned);
            }
            Value::Object(out)
        }
        (other, _) => other,
    }
}
