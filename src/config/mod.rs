//! Gate configuration
//!
//! Four layers are merged in order, later layers winning:
//! 1. Built-in defaults
//! 2. TOML file (`release-gate.toml` or `--config`)
//! 3. Environment variables (`VERSION`, `FEEDS_ORIGIN`, ...)
//! 4. CLI flags
//!
//! The merged value is deserialized into a typed `GateConfig` and validated
//! once. Checks receive the resulting `GateConfig` read-only.

mod defaults;
mod effective;
mod env;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigOrigin, ConfigSource, EffectiveConfig};
pub use env::{env_layer, snapshot_env, ENV_KEYS};
pub use merge::{deep_merge, merge_layers};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use release_version::ReleaseVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::artifact::{Artifact, Platform, BLOCKMAP_SUFFIX};
use crate::feed::OriginAllowList;
use crate::retry::RetryPolicy;
use crate::timeout::TimeoutConfig;

/// Default TOML file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "release-gate.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Where the gate fetches from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origins {
    /// Origin serving update feeds
    pub feeds: Url,

    /// Origin serving release artifacts (defaults to `feeds`)
    #[serde(default)]
    pub artifacts: Option<Url>,

    /// Used when the primary origin does not resolve
    #[serde(default)]
    pub fallback: Option<Url>,
}

/// CI context used to cross-check provenance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiContext {
    #[serde(default)]
    pub commit_sha: Option<String>,

    #[serde(default)]
    pub runtime_version: Option<String>,
}

/// Expected response headers for one artifact.
///
/// Patterns are case-insensitive regular expressions matched anywhere in the
/// header value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    /// Filename template
    pub file: String,
    pub content_type: String,
    #[serde(default)]
    pub cache_control: Option<String>,
    #[serde(default)]
    pub x_content_type_options: Option<String>,
}

/// Per-platform release layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLayout {
    /// Update feed filename under the stable directory
    pub feed: String,

    /// Artifact filename templates
    pub artifacts: Vec<String>,

    /// Extensions checked for text/html and on-the-fly compression
    #[serde(default)]
    pub binary_extensions: Vec<String>,

    /// Extensions of installers that carry an operating-system signature
    #[serde(default)]
    pub signed_extensions: Vec<String>,

    #[serde(default)]
    pub headers: Vec<HeaderRule>,
}

/// Where release files live on the origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseLayout {
    /// Versioned directory: `<origin>/<releases_dir>/<version>/<file>`
    pub releases_dir: String,

    /// Live feed directory: `<origin>/<stable_dir>/<feed>`
    pub stable_dir: String,

    pub manifest: String,
    pub signature: String,
    pub provenance: String,

    /// Platform-independent files that must be published
    #[serde(default)]
    pub common_files: Vec<String>,

    pub platforms: BTreeMap<Platform, PlatformLayout>,
}

/// Typed, validated gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Release version under verification
    pub version: String,

    /// Substituted for `{product}` in filename templates
    pub product: String,

    pub origins: Origins,

    pub required_platforms: Vec<Platform>,

    /// Armored OpenPGP or base64 Ed25519 key; signature check is skipped when unset
    #[serde(default)]
    pub public_key: Option<String>,

    /// Validate local feeds before they are uploaded
    pub pre_deploy: bool,

    /// Local feed directory read in pre-deploy mode
    pub local_feed_dir: PathBuf,

    /// JSON file supplying `version` when none is configured
    pub package_manifest: PathBuf,

    /// Wildcard origins allowed in feed URLs besides the configured ones
    pub allowed_origin_patterns: Vec<String>,

    pub layout: ReleaseLayout,

    pub retry: RetryPolicy,

    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub ci: CiContext,
}

impl GateConfig {
    /// Deserialize and validate a merged configuration value
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let mut config: GateConfig = serde_json::from_value(value)
            .map_err(|e| ConfigError::ParseError(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        // Store the normalized form (leading `v` dropped)
        config.version = config.release_version()?.to_string();
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.release_version()?;

        if self.required_platforms.is_empty() {
            return Err(ConfigError::ValidationError(
                "required_platforms must not be empty".to_string(),
            ));
        }
        for platform in &self.required_platforms {
            if !self.layout.platforms.contains_key(platform) {
                return Err(ConfigError::ValidationError(format!(
                    "no layout configured for required platform '{}'",
                    platform
                )));
            }
        }

        for origin in [Some(&self.origins.feeds), self.origins.artifacts.as_ref(), self.origins.fallback.as_ref()]
            .into_iter()
            .flatten()
        {
            if !matches!(origin.scheme(), "https" | "http") || origin.host_str().is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "origin must be an http(s) URL with a host, got {}",
                    origin
                )));
            }
        }

        if self.retry.max_attempts == 0 || self.retry.max_attempts > 10 {
            return Err(ConfigError::ValidationError(format!(
                "retry.max_attempts must be in [1, 10], got {}",
                self.retry.max_attempts
            )));
        }

        self.timeouts
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        OriginAllowList::new(&self.allowed_origins(), &self.allowed_origin_patterns)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        for (platform, layout) in &self.layout.platforms {
            for rule in &layout.headers {
                for pattern in [Some(&rule.content_type), rule.cache_control.as_ref(), rule.x_content_type_options.as_ref()]
                    .into_iter()
                    .flatten()
                {
                    regex_lite::Regex::new(pattern).map_err(|e| {
                        ConfigError::ValidationError(format!(
                            "invalid header pattern '{}' for {}: {}",
                            pattern, platform, e
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Parsed release version
    pub fn release_version(&self) -> Result<ReleaseVersion, ConfigError> {
        ReleaseVersion::parse(&self.version)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Substitute `{version}` and `{product}` in a filename template
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{version}", &self.version)
            .replace("{product}", &self.product)
    }

    pub fn feeds_origin(&self) -> &Url {
        &self.origins.feeds
    }

    pub fn artifacts_origin(&self) -> &Url {
        self.origins.artifacts.as_ref().unwrap_or(&self.origins.feeds)
    }

    /// Configured origins, always allowed in feed URLs
    pub fn allowed_origins(&self) -> Vec<Url> {
        let mut origins = vec![self.origins.feeds.clone()];
        if let Some(ref artifacts) = self.origins.artifacts {
            origins.push(artifacts.clone());
        }
        origins
    }

    /// True when feeds and artifacts are served from the same host,
    /// including when no separate artifacts origin is configured
    pub fn shares_host(&self) -> bool {
        self.feeds_origin().host_str() == self.artifacts_origin().host_str()
    }

    fn platform_layouts(&self) -> impl Iterator<Item = (Platform, &PlatformLayout)> {
        self.required_platforms
            .iter()
            .filter_map(|p| self.layout.platforms.get(p).map(|layout| (*p, layout)))
    }

    /// Artifacts of every required platform, in platform order
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.platform_layouts()
            .flat_map(|(platform, layout)| {
                layout
                    .artifacts
                    .iter()
                    .map(move |t| Artifact::new(self.render(t), platform))
            })
            .collect()
    }

    /// Platform-independent files
    pub fn common_files(&self) -> Vec<String> {
        self.layout
            .common_files
            .iter()
            .map(|t| self.render(t))
            .collect()
    }

    /// `(platform, feed filename)` for every required platform
    pub fn feeds(&self) -> Vec<(Platform, String)> {
        self.platform_layouts()
            .map(|(platform, layout)| (platform, layout.feed.clone()))
            .collect()
    }

    /// Header rules of every required platform with filenames rendered
    pub fn header_rules(&self) -> Vec<HeaderRule> {
        self.platform_layouts()
            .flat_map(|(_, layout)| layout.headers.iter())
            .map(|rule| HeaderRule {
                file: self.render(&rule.file),
                ..rule.clone()
            })
            .collect()
    }

    /// Artifacts checked for HTML and compression, per binary extensions
    pub fn binary_artifacts(&self) -> Vec<Artifact> {
        self.platform_layouts()
            .flat_map(|(platform, layout)| {
                layout
                    .artifacts
                    .iter()
                    .map(move |t| Artifact::new(self.render(t), platform))
                    .filter(|a| a.has_extension(&layout.binary_extensions))
            })
            .collect()
    }

    /// Installers whose code signature is inspected after download
    pub fn signed_artifacts(&self) -> Vec<Artifact> {
        self.platform_layouts()
            .flat_map(|(platform, layout)| {
                layout
                    .artifacts
                    .iter()
                    .map(move |t| Artifact::new(self.render(t), platform))
                    .filter(|a| a.has_extension(&layout.signed_extensions))
            })
            .collect()
    }

    /// `(blockmap, target)` pairs: each blockmap sidecar and the artifact it describes
    pub fn blockmap_pairs(&self) -> Vec<(Artifact, Artifact)> {
        self.artifacts()
            .into_iter()
            .filter_map(|blockmap| {
                let target = blockmap.filename.strip_suffix(BLOCKMAP_SUFFIX)?.to_string();
                let platform = blockmap.platform;
                Some((blockmap, Artifact::new(target, platform)))
            })
            .collect()
    }
}

/// A loaded configuration and its provenance record
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: GateConfig,
    pub effective: EffectiveConfig,
}

/// Merge all layers, resolve the release version and validate.
///
/// `file` is optional; an explicitly named file must exist. `env` is a
/// snapshot of the process environment taken once at startup.
pub fn load_config(
    file: Option<&Path>,
    file_required: bool,
    env: &BTreeMap<String, String>,
    cli_overrides: Option<Value>,
) -> Result<LoadedConfig, ConfigError> {
    let (mut merged, sources) = EffectiveConfig::collect_layers(file, file_required, env, cli_overrides)?;
    resolve_version(&mut merged)?;

    let config = GateConfig::from_value(merged.clone())?;
    if let Some(obj) = merged.as_object_mut() {
        obj.insert("version".to_string(), Value::String(config.version.clone()));
    }
    let effective = EffectiveConfig::new(merged, sources);

    Ok(LoadedConfig { config, effective })
}

/// Fill `version` from the package manifest when no layer set it.
fn resolve_version(merged: &mut Value) -> Result<(), ConfigError> {
    let has_version = merged
        .get("version")
        .and_then(Value::as_str)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    if has_version {
        return Ok(());
    }

    let manifest = merged
        .get("package_manifest")
        .and_then(Value::as_str)
        .unwrap_or("package.json")
        .to_string();
    let version = read_manifest_version(Path::new(&manifest))?;
    tracing::debug!("Release version {} read from {}", version, manifest);

    if let Some(obj) = merged.as_object_mut() {
        obj.insert("version".to_string(), Value::String(version));
    }
    Ok(())
}

fn read_manifest_version(path: &Path) -> Result<String, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ValidationError(format!(
            "no release version configured (set VERSION or --release-version) and {} does not exist",
            path.display()
        )));
    }
    let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    let package: Value = serde_json::from_slice(&bytes).map_err(|e| {
        ConfigError::ParseError(format!("{}: {}", path.display(), e))
    })?;
    package
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ConfigError::ValidationError(format!("{} has no string 'version' field", path.display()))
        })
}
