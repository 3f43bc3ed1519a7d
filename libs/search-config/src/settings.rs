//! Immutable configuration tree
//!
//! Settings are loaded once (TOML file plus `SCRIPTORIUM__*` environment
//! overrides) and never mutated afterwards. Reloading configuration means
//! building a new [`Settings`] value and invalidating the resolver caches.

use crate::Result;
use config::{Environment, File, FileFormat};
use serde_json::{Map, Value};
use std::path::Path;

/// Environment variable prefix for overrides, e.g. `SCRIPTORIUM__WORKSPACE__PATH`.
pub const ENV_PREFIX: &str = "SCRIPTORIUM";

#[derive(Debug, Clone, Default)]
pub struct Settings {
    root: Value,
}

impl Settings {
    /// Load settings from a TOML file, layering environment overrides on top.
    pub fn load(path: &Path) -> Result<Self> {
        let built = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let root: Value = built.try_deserialize()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(Self::from_value(root))
    }

    /// Parse settings from an in-memory TOML document (no environment overrides).
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let built = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        let root: Value = built.try_deserialize()?;
        Ok(Self::from_value(root))
    }

    pub fn from_value(root: Value) -> Self {
        let root = match root {
            Value::Object(_) => root,
            _ => Value::Object(Map::new()),
        };
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a dotted path such as `searchengine.solr.default`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.root, path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(value_as_bool)
    }
}

/// Walk a dotted path through nested objects.
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

pub(crate) fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

pub(crate) fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
