//! Network timeouts for gate fetches
//!
//! Three budgets are configured:
//! - `metadata_seconds`: HEAD requests used for presence and header checks
//! - `document_seconds`: small documents (feeds, manifest, signature, provenance)
//! - `stream_seconds`: full-body streams hashed for the SHA-256 check
//!
//! Each budget applies per attempt; the retrier multiplies them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for any single timeout
pub const MAX_TIMEOUT_SECONDS: u64 = 600;

/// Timeout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// HEAD request timeout (default: 15)
    pub metadata_seconds: u64,

    /// Document GET timeout (default: 30)
    pub document_seconds: u64,

    /// Streaming GET timeout (default: 300 = 5 min)
    pub stream_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            metadata_seconds: 15,
            document_seconds: 30,
            stream_seconds: 300,
        }
    }
}

impl TimeoutConfig {
    /// Validate timeout bounds
    pub fn validate(&self) -> Result<(), TimeoutValidationError> {
        if self.stream_seconds == 0 || self.stream_seconds > MAX_TIMEOUT_SECONDS {
            return Err(TimeoutValidationError::StreamOutOfBounds {
                value: self.stream_seconds,
            });
        }

        if self.document_seconds == 0 || self.document_seconds > MAX_TIMEOUT_SECONDS {
            return Err(TimeoutValidationError::DocumentOutOfBounds {
                value: self.document_seconds,
            });
        }

        // metadata_seconds must be in (0, stream_seconds]
        if self.metadata_seconds == 0 || self.metadata_seconds > self.stream_seconds {
            return Err(TimeoutValidationError::MetadataOutOfBounds {
                value: self.metadata_seconds,
                max: self.stream_seconds,
            });
        }

        Ok(())
    }

    pub fn metadata(&self) -> Duration {
        Duration::from_secs(self.metadata_seconds)
    }

    pub fn document(&self) -> Duration {
        Duration::from_secs(self.document_seconds)
    }

    pub fn stream(&self) -> Duration {
        Duration::from_secs(self.stream_seconds)
    }
}

/// Timeout validation errors
#[derive(Debug, thiserror::Error)]
pub enum TimeoutValidationError {
    #[error("stream_seconds must be in (0, 600], got {value}")]
    StreamOutOfBounds { value: u64 },

    #[error("document_seconds must be in (0, 600], got {value}")]
    DocumentOutOfBounds { value: u64 },

    #[error("metadata_seconds must be in (0, {max}], got {value}")]
    MetadataOutOfBounds { value: u64, max: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = TimeoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metadata(), Duration::from_secs(15));
    }

    #[test]
    fn test_zero_stream_invalid() {
        let config = TimeoutConfig {
            stream_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TimeoutValidationError::StreamOutOfBounds { value: 0 })
        ));
    }

    #[test]
    fn test_stream_too_large() {
        let config = TimeoutConfig {
            stream_seconds: 601,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_document_bounds() {
        let config = TimeoutConfig {
            document_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TimeoutValidationError::DocumentOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_metadata_exceeds_stream() {
        let config = TimeoutConfig {
            metadata_seconds: 120,
            stream_seconds: 60,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("(0, 60]"));
    }

    #[test]
    fn test_metadata_equals_stream_ok() {
        let config = TimeoutConfig {
            metadata_seconds: 60,
            document_seconds: 60,
            stream_seconds: 60,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: TimeoutConfig = serde_json::from_str(r#"{"stream_seconds": 120}"#).unwrap();
        assert_eq!(config.stream_seconds, 120);
        assert_eq!(config.metadata_seconds, 15);
    }
}
