//! Release artifacts
//!
//! - `Platform` / `Artifact`: the files a release publishes per platform
//! - `HashManifest`: the published `SHA256SUMS` list
//! - `verify`: streaming SHA-256 comparison
//! - `BlockmapRecord`: decoded differential-update blockmaps

mod blockmap;
mod manifest;
mod verify;

pub use blockmap::{BlockmapError, BlockmapRecord, BLOCKMAP_SUFFIX};
pub use manifest::{HashManifest, ManifestEntry, ManifestError};
pub use verify::{digests_match, sha256_hex, sha256_reader, StreamDigest};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target platform of an artifact or feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "windows")]
    Win,
    #[serde(alias = "macos", alias = "darwin")]
    Mac,
    Linux,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Win, Platform::Mac, Platform::Linux];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Win => "win",
            Platform::Mac => "mac",
            Platform::Linux => "linux",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win" | "windows" => Ok(Platform::Win),
            "mac" | "macos" | "darwin" => Ok(Platform::Mac),
            "linux" => Ok(Platform::Linux),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

/// Whether an artifact is an installable binary or a sidecar describing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Binary,
    Sidecar,
}

/// A published release file.
///
/// `filename` is the URL path segment as published and may be
/// percent-encoded. Manifests list the decoded name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub filename: String,
    pub platform: Platform,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, platform: Platform) -> Self {
        let filename = filename.into();
        let kind = if filename.ends_with(BLOCKMAP_SUFFIX) {
            ArtifactKind::Sidecar
        } else {
            ArtifactKind::Binary
        };
        Self {
            filename,
            platform,
            kind,
        }
    }

    /// Filename with percent-encoding removed
    pub fn decoded_name(&self) -> String {
        decode_filename(&self.filename)
    }

    /// True if the filename ends with `.{ext}` for one of `extensions`
    pub fn has_extension(&self, extensions: &[String]) -> bool {
        extensions
            .iter()
            .any(|ext| self.filename.ends_with(&format!(".{}", ext.trim_start_matches('.'))))
    }
}

/// Percent-decode a published filename. Invalid sequences are kept as-is.
pub fn decode_filename(filename: &str) -> String {
    match urlencoding::decode(filename) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => filename.to_string(),
    }
}
