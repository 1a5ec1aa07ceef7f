//! Published hash manifest (`SHA256SUMS`)
//!
//! One entry per line: `<hex digest><whitespace><filename>`. The filename is
//! everything after the first whitespace run, so names may contain spaces.
//! A leading `*` (binary-mode marker from `sha256sum -b`) is dropped.

use serde::{Deserialize, Serialize};

/// A manifest line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    /// Lowercase hex SHA-256
    pub sha256: String,
}

/// Ordered filename → digest list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashManifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("line {line}: expected '<sha256>  <filename>', got '{content}'")]
    MalformedLine { line: usize, content: String },

    #[error("line {line}: '{digest}' is not a SHA-256 hex digest")]
    InvalidDigest { line: usize, digest: String },

    #[error("manifest is not valid UTF-8")]
    InvalidUtf8,
}

impl HashManifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut entries = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let Some((digest, rest)) = line.split_once(char::is_whitespace) else {
                return Err(ManifestError::MalformedLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };

            let filename = rest.trim_start();
            let filename = filename.strip_prefix('*').unwrap_or(filename);
            if filename.is_empty() {
                return Err(ManifestError::MalformedLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            }

            if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ManifestError::InvalidDigest {
                    line: idx + 1,
                    digest: digest.to_string(),
                });
            }

            entries.push(ManifestEntry {
                filename: filename.to_string(),
                sha256: digest.to_ascii_lowercase(),
            });
        }
        Ok(Self { entries })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ManifestError::InvalidUtf8)?;
        Self::parse(text)
    }

    /// Digest published for `filename` (first entry wins)
    pub fn get(&self, filename: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.filename == filename)
            .map(|e| e.sha256.as_str())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
