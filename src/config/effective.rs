//! Effective configuration with provenance
//!
//! Records the merged configuration, which layers contributed to it and the
//! SHA-256 of any file read, with key material redacted. Printed by
//! `release-gate config` and embedded in JSON reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use super::defaults::BuiltinDefaults;
use super::env::env_layer;
use super::merge::merge_layers;
use super::ConfigError;
use crate::artifact::sha256_hex;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "release-gate/effective_config@1";

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Env,
    Cli,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of raw file bytes (file layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Variables read (env layer only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
}

impl ConfigSource {
    fn new(origin: ConfigOrigin) -> Self {
        Self {
            origin,
            path: None,
            digest: None,
            keys: Vec::new(),
        }
    }
}

/// Effective configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,

    pub schema_id: String,

    pub created_at: DateTime<Utc>,

    /// The merged configuration object, redacted
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,
}

/// Keys whose values are not echoed
const REDACTED_KEYS: &[&str] = &["public_key", "token", "secret", "password"];

impl EffectiveConfig {
    /// Wrap a merged configuration, redacting key material
    pub fn new(mut merged: Value, sources: Vec<ConfigSource>) -> Self {
        let mut redactions = Vec::new();
        Self::redact(&mut merged, String::new(), &mut redactions);
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
            redactions,
        }
    }

    /// Read every layer and merge them. The result is not redacted.
    pub fn collect_layers(
        file: Option<&Path>,
        file_required: bool,
        env: &BTreeMap<String, String>,
        cli_overrides: Option<Value>,
    ) -> Result<(Value, Vec<ConfigSource>), ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource::new(ConfigOrigin::Builtin)];

        if let Some(path) = file {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                    ..ConfigSource::new(ConfigOrigin::File)
                });
            } else if file_required {
                return Err(ConfigError::IoError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
        }

        let (env_value, keys) = env_layer(env);
        if !keys.is_empty() {
            layers.push(env_value);
            sources.push(ConfigSource {
                keys,
                ..ConfigSource::new(ConfigOrigin::Env)
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource::new(ConfigOrigin::Cli));
        }

        Ok((merge_layers(layers), sources))
    }

    /// Load a TOML file, returning its JSON form and the digest of its bytes
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let digest = sha256_hex(&bytes);

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
        let table: toml::Table = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;
        let value = serde_json::to_value(table)
            .map_err(|e| ConfigError::ParseError(format!("TOML conversion error: {}", e)))?;

        Ok((value, digest))
    }

    fn redact(value: &mut Value, path: String, redactions: &mut Vec<String>) {
        let Value::Object(map) = value else {
            return;
        };
        for (key, val) in map.iter_mut() {
            let current = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };
            let lower = key.to_lowercase();
            let secret = REDACTED_KEYS.iter().any(|s| lower.contains(s));
            if secret && val.is_string() {
                *val = Value::String("[REDACTED]".to_string());
                redactions.push(current);
            } else {
                Self::redact(val, current, redactions);
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}
