//! Origin selection
//!
//! The primary origin is used when its host resolves. Otherwise the fallback
//! (typically a Pages deployment) is tried. If neither resolves the gate
//! cannot reach any copy of the release.

use std::net::ToSocketAddrs;

use url::Url;

use super::FetchError;

/// DNS seam
pub trait Resolver: Send + Sync {
    /// True if `host` resolves to at least one address
    fn resolves(&self, host: &str) -> bool;
}

/// Resolver backed by the system stub resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolves(&self, host: &str) -> bool {
        match (host, 443u16).to_socket_addrs() {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                tracing::debug!("DNS lookup for {} failed: {}", host, e);
                false
            }
        }
    }
}

/// Pick the origin to use for this run.
pub fn pick_origin(
    resolver: &dyn Resolver,
    primary: &Url,
    fallback: Option<&Url>,
) -> Result<Url, FetchError> {
    let primary_host = primary.host_str().unwrap_or_default();
    if !primary_host.is_empty() && resolver.resolves(primary_host) {
        return Ok(primary.clone());
    }

    let mut candidates = vec![primary_host.to_string()];
    if let Some(fallback) = fallback {
        let fallback_host = fallback.host_str().unwrap_or_default();
        if !fallback_host.is_empty() && resolver.resolves(fallback_host) {
            tracing::warn!(
                "Primary origin {} does not resolve, using fallback {}",
                primary_host,
                fallback_host
            );
            return Ok(fallback.clone());
        }
        candidates.push(fallback_host.to_string());
    }

    Err(FetchError::Unresolvable { candidates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockResolver;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_primary_preferred() {
        let resolver = MockResolver::new()
            .with_host("updates.example.com")
            .with_host("app.pages.dev");
        let picked = pick_origin(
            &resolver,
            &url("https://updates.example.com"),
            Some(&url("https://app.pages.dev")),
        )
        .unwrap();
        assert_eq!(picked.host_str(), Some("updates.example.com"));
    }

    #[test]
    fn test_fallback_used_when_primary_unresolvable() {
        let resolver = MockResolver::new().with_host("app.pages.dev");
        let picked = pick_origin(
            &resolver,
            &url("https://updates.example.com"),
            Some(&url("https://app.pages.dev")),
        )
        .unwrap();
        assert_eq!(picked.host_str(), Some("app.pages.dev"));
    }

    #[test]
    fn test_neither_resolvable_names_both() {
        let resolver = MockResolver::new();
        let err = pick_origin(
            &resolver,
            &url("https://updates.example.com"),
            Some(&url("https://app.pages.dev")),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("updates.example.com"));
        assert!(msg.contains("app.pages.dev"));
    }

    #[test]
    fn test_no_fallback() {
        let resolver = MockResolver::new();
        let err = pick_origin(&resolver, &url("https://updates.example.com"), None).unwrap_err();
        assert!(matches!(err, FetchError::Unresolvable { ref candidates } if candidates.len() == 1));
    }
}
