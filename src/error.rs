//! Error taxonomy for the promotion gate
//!
//! Every check returns a `GateError` on failure. The `ErrorKind` is stable and
//! serializable so reports and callers can branch on the category instead of
//! matching message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::net::FetchError;

/// Category of a gate failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed version, manifest, feed or provenance document
    Parse,
    /// Artifact, feed or document absent
    NotFound,
    /// Hash, size or version mismatch
    IntegrityMismatch,
    /// Network, timeout or DNS failure after retries
    Transport,
    /// Bad or unverifiable signature
    Signature,
    /// One or more accumulated validation defects
    Validation,
    /// Invalid gate configuration
    Config,
}

impl ErrorKind {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "Malformed document",
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::IntegrityMismatch => "Integrity mismatch",
            ErrorKind::Transport => "Transport failure",
            ErrorKind::Signature => "Signature verification failed",
            ErrorKind::Validation => "Validation failed",
            ErrorKind::Config => "Configuration error",
        }
    }
}

/// What a mismatch compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    Hash,
    Size,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchKind::Hash => f.write_str("Hash"),
            MismatchKind::Size => f.write_str("Size"),
        }
    }
}

/// Failure of a single gate check
#[derive(Debug, Error)]
pub enum GateError {
    #[error("{what}: {detail}")]
    Parse { what: String, detail: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{kind} mismatch for {subject}: expected {expected} got {actual}")]
    IntegrityMismatch {
        subject: String,
        kind: MismatchKind,
        expected: String,
        actual: String,
    },

    #[error(
        "Version {candidate} is older than current {feed} version {current}; downgrades are not allowed"
    )]
    Downgrade {
        feed: String,
        candidate: String,
        current: String,
    },

    #[error("{file}: {header} '{actual}' does not match /{expected}/")]
    Header {
        file: String,
        header: String,
        expected: String,
        actual: String,
    },

    #[error("{0}")]
    Transport(FetchError),

    #[error("{0}")]
    Signature(String),

    #[error("{subject} failed with {} error(s):\n  {}", .errors.len(), .errors.join("\n  "))]
    Validation { subject: String, errors: Vec<String> },

    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// Stable category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::Parse { .. } => ErrorKind::Parse,
            GateError::NotFound { .. } => ErrorKind::NotFound,
            GateError::IntegrityMismatch { .. } | GateError::Downgrade { .. } => {
                ErrorKind::IntegrityMismatch
            }
            GateError::Transport(_) => ErrorKind::Transport,
            GateError::Signature(_) => ErrorKind::Signature,
            GateError::Validation { .. } | GateError::Header { .. } => ErrorKind::Validation,
            GateError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn parse(what: impl Into<String>, detail: impl fmt::Display) -> Self {
        GateError::Parse {
            what: what.into(),
            detail: detail.to_string(),
        }
    }

    /// Collapse the defects found by one check into a single error.
    ///
    /// A lone defect keeps its own kind; several become a `Validation` error
    /// listing every message. Returns `None` when there is nothing to report.
    pub fn combine(subject: impl Into<String>, mut errors: Vec<GateError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(GateError::Validation {
                subject: subject.into(),
                errors: errors.iter().map(|e| e.to_string()).collect(),
            }),
        }
    }
}

impl From<FetchError> for GateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound { url } => GateError::NotFound { resource: url },
            other => GateError::Transport(other),
        }
    }
}
