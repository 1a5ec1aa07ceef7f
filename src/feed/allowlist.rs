//! Allowed origins for feed URLs
//!
//! A URL is allowed when its origin equals one of the configured origins or
//! matches a wildcard pattern such as `https://*.pages.dev`. `*` never
//! crosses a `/`, so a pattern only ever matches a host.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum AllowListError {
    #[error("invalid origin pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("origin pattern set error: {0}")]
    Build(#[from] globset::Error),
}

#[derive(Debug, Clone)]
pub struct OriginAllowList {
    origins: Vec<String>,
    patterns: GlobSet,
}

/// `scheme://host[:port]`, with default ports omitted
fn origin_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

impl OriginAllowList {
    pub fn new(origins: &[Url], patterns: &[String]) -> Result<Self, AllowListError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern.trim_end_matches('/'))
                .literal_separator(true)
                .case_insensitive(true)
                .build()
                .map_err(|source| AllowListError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
        }
        Ok(Self {
            origins: origins.iter().filter_map(origin_of).collect(),
            patterns: builder.build()?,
        })
    }

    pub fn allows(&self, url: &Url) -> bool {
        let Some(origin) = origin_of(url) else {
            return false;
        };
        self.origins.iter().any(|o| *o == origin) || self.patterns.is_match(&origin)
    }
}
