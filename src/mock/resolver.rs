//! Static DNS resolver

use std::collections::BTreeSet;

use crate::net::Resolver;

/// Resolver that knows only the hosts it was given
#[derive(Debug, Clone, Default)]
pub struct MockResolver {
    hosts: BTreeSet<String>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.hosts.insert(host.to_ascii_lowercase());
        self
    }
}

impl Resolver for MockResolver {
    fn resolves(&self, host: &str) -> bool {
        self.hosts.contains(&host.to_ascii_lowercase())
    }
}
