//! Case-insensitive response header map

use std::collections::BTreeMap;

/// Response headers keyed by lowercase name.
///
/// Repeated headers are joined with `", "`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: BTreeMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, appending to any existing value of the same name.
    pub fn insert(&mut self, name: &str, value: &str) {
        let key = name.trim().to_ascii_lowercase();
        let value = value.trim();
        self.entries
            .entry(key)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    pub fn cache_control(&self) -> Option<&str> {
        self.get("cache-control")
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.get("content-encoding")
    }

    pub fn x_content_type_options(&self) -> Option<&str> {
        self.get("x-content-type-options")
    }

    /// Parsed `Content-Length`, if present and numeric
    pub fn content_length(&self) -> Option<u64> {
        self.get("content-length")?.trim().parse().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.insert(name.as_ref(), value.as_ref());
        }
        map
    }
}
