//! Update feed documents
//!
//! Feeds are small YAML files (`latest.yml`, `latest-mac.yml`, ...). Only
//! top-level `key: value` lines matter to the gate, so they are read with a
//! line-oriented parser rather than a full YAML implementation. Nested
//! blocks and list items are ignored; surrounding quotes are stripped.

mod allowlist;
mod schema;

pub use allowlist::{AllowListError, OriginAllowList};
pub use schema::{validate_feed, FeedExpectations, FeedReport, MAC_HINT_FIELDS};

use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum FeedParseError {
    #[error("feed is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Parsed top-level feed fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    fields: BTreeMap<String, String>,
}

impl FeedDocument {
    /// Parse feed text. Lines that are not `key: value` are skipped; a
    /// repeated key keeps its last value.
    pub fn parse(text: &str) -> Self {
        let mut fields = BTreeMap::new();
        for line in text.lines() {
            if let Some((key, value)) = split_field(line) {
                fields.insert(key.to_string(), strip_quotes(value).to_string());
            }
        }
        Self { fields }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FeedParseError> {
        Ok(Self::parse(std::str::from_utf8(bytes)?))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn version(&self) -> Option<&str> {
        self.get("version").filter(|v| !v.is_empty())
    }

    pub fn url(&self) -> Option<&str> {
        self.get("url")
    }

    pub fn path(&self) -> Option<&str> {
        self.get("path")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

/// `key: value` at column 0, where key is `[A-Za-z0-9_]+` and value is
/// non-empty.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (key, rest) = line.split_once(':')?;
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }
    let value = rest.trim();
    if value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
