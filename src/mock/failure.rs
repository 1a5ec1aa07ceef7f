//! Failure injection for the mock fetcher
//!
//! Failures are keyed by URL and can be limited to the first N requests so
//! retry behaviour can be exercised.

use std::collections::HashMap;

use crate::net::FetchError;

/// What an injected failure returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMode {
    /// Non-2xx status (404 becomes `FetchError::NotFound`)
    Status(u16),
    /// Request timeout
    Timeout,
    /// Connection-level failure
    Connection(String),
}

/// Failure configuration for a URL
#[derive(Debug, Clone)]
pub struct FailureConfig {
    pub mode: FailureMode,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    pub fn status(status: u16) -> Self {
        Self {
            mode: FailureMode::Status(status),
            fail_count: None,
        }
    }

    pub fn timeout() -> Self {
        Self {
            mode: FailureMode::Timeout,
            fail_count: None,
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            mode: FailureMode::Connection(message.into()),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// Error this failure produces for `url`
    pub fn to_error(&self, url: &str) -> FetchError {
        match &self.mode {
            FailureMode::Status(404) => FetchError::NotFound {
                url: url.to_string(),
            },
            FailureMode::Status(status) => FetchError::Status {
                url: url.to_string(),
                status: *status,
            },
            FailureMode::Timeout => FetchError::Timeout {
                url: url.to_string(),
            },
            FailureMode::Connection(message) => FetchError::Request {
                url: url.to_string(),
                message: message.clone(),
            },
        }
    }
}

/// Per-URL failure injector
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<String, FailureConfig>,
    call_counts: HashMap<String, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for a URL
    pub fn inject(&mut self, url: impl Into<String>, config: FailureConfig) {
        let url = url.into();
        self.call_counts.insert(url.clone(), 0);
        self.configs.insert(url, config);
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Returns the failure to apply to this request, if any
    pub fn check(&mut self, url: &str) -> Option<&FailureConfig> {
        let config = self.configs.get(url)?;
        let count = self.call_counts.entry(url.to_string()).or_insert(0);
        *count += 1;

        if let Some(fail_limit) = config.fail_count {
            if *count > fail_limit {
                return None;
            }
        }
        Some(config)
    }
}
