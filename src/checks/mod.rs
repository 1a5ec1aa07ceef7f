//! Gate checks
//!
//! Each check is a function of a `CheckContext` returning a `CheckResult`.
//! Checks accumulate their own defects and report them as one `GateError`;
//! they never read the process environment.

mod blockmap;
mod feeds;
mod hashes;
mod monotonic;
mod platform_signing;
mod presence;
mod provenance;
mod signature;

pub use blockmap::check_blockmaps;
pub use feeds::check_feeds;
pub use hashes::check_hashes;
pub use monotonic::check_monotonic_versions;
pub use platform_signing::check_platform_signing;
pub use presence::check_artifacts;
pub use provenance::check_provenance;
pub use signature::check_signature;

use std::fmt;
use std::io;
use std::str::FromStr;

use tempfile::NamedTempFile;

use url::Url;

use crate::artifact::{sha256_reader, StreamDigest};
use crate::config::GateConfig;
use crate::error::GateError;
use crate::net::{join_url, pick_origin, FetchError, Fetcher, HeaderMap, Resolver};
use crate::retry::retry;
use crate::signing::{CodeSigningTool, SignatureTool};

/// Successful check outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Passed, possibly with advisory findings
    Passed { warnings: Vec<String> },
    /// Not applicable to this run
    Skipped { reason: String },
}

impl CheckOutcome {
    pub fn passed() -> Self {
        CheckOutcome::Passed {
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(warnings: Vec<String>) -> Self {
        CheckOutcome::Passed { warnings }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        CheckOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

pub type CheckResult = Result<CheckOutcome, GateError>;

/// Finish a check from its accumulated defects and advisories
pub(crate) fn conclude(subject: &str, errors: Vec<GateError>, warnings: Vec<String>) -> CheckResult {
    match GateError::combine(subject, errors) {
        Some(err) => Err(err),
        None => Ok(CheckOutcome::with_warnings(warnings)),
    }
}

/// Everything a check may touch
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub config: &'a GateConfig,
    pub fetcher: &'a dyn Fetcher,
    pub resolver: &'a dyn Resolver,
    pub signature_tool: &'a dyn SignatureTool,
    pub code_signing: &'a dyn CodeSigningTool,
}

impl<'a> CheckContext<'a> {
    pub fn feeds_origin(&self) -> Result<Url, GateError> {
        Ok(pick_origin(
            self.resolver,
            self.config.feeds_origin(),
            self.config.origins.fallback.as_ref(),
        )?)
    }

    pub fn artifacts_origin(&self) -> Result<Url, GateError> {
        Ok(pick_origin(
            self.resolver,
            self.config.artifacts_origin(),
            self.config.origins.fallback.as_ref(),
        )?)
    }

    /// `<origin>/<releases_dir>/<version>/<filename>`
    pub fn release_url(&self, origin: &Url, filename: &str) -> Result<Url, GateError> {
        join_url(
            origin,
            &[&self.config.layout.releases_dir, &self.config.version, filename],
        )
        .map_err(|e| GateError::Config(format!("cannot build URL for {}: {}", filename, e)))
    }

    /// `<origin>/<stable_dir>/<feed>`
    pub fn feed_url(&self, origin: &Url, feed: &str) -> Result<Url, GateError> {
        join_url(origin, &[&self.config.layout.stable_dir, feed])
            .map_err(|e| GateError::Config(format!("cannot build URL for {}: {}", feed, e)))
    }

    /// Retried HEAD with the metadata timeout
    pub fn head(&self, url: &Url) -> Result<HeaderMap, GateError> {
        let timeout = self.config.timeouts.metadata();
        retry(&self.config.retry, url.as_str(), || self.fetcher.head(url, timeout))
            .map_err(GateError::from)
    }

    /// Retried GET of a small document with the document timeout
    pub fn document(&self, url: &Url) -> Result<Vec<u8>, GateError> {
        let timeout = self.config.timeouts.document();
        retry(&self.config.retry, url.as_str(), || {
            self.fetcher.get_bytes(url, timeout)
        })
        .map_err(GateError::from)
    }

    /// Retried streaming GET, hashed as it is read
    pub fn stream_digest(&self, url: &Url) -> Result<StreamDigest, GateError> {
        let timeout = self.config.timeouts.stream();
        retry(&self.config.retry, url.as_str(), || {
            let reader = self.fetcher.get_stream(url, timeout)?;
            sha256_reader(reader).map_err(|source| FetchError::Io {
                url: url.to_string(),
                source,
            })
        })
        .map_err(GateError::from)
    }

    /// Retried streaming GET into a temporary file, removed when dropped
    pub fn download(&self, url: &Url) -> Result<NamedTempFile, GateError> {
        let timeout = self.config.timeouts.stream();
        retry(&self.config.retry, url.as_str(), || {
            let mut reader = self.fetcher.get_stream(url, timeout)?;
            let io_error = |source: io::Error| FetchError::Io {
                url: url.to_string(),
                source,
            };
            let mut file = NamedTempFile::new().map_err(io_error)?;
            io::copy(&mut reader, &mut file).map_err(io_error)?;
            Ok::<NamedTempFile, FetchError>(file)
        })
        .map_err(GateError::from)
    }
}

/// Individually runnable checks, in standard order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum CheckName {
    Artifacts,
    Hashes,
    Feeds,
    Monotonic,
    Blockmap,
    PlatformSigning,
    Signature,
    Provenance,
}

impl CheckName {
    pub const ALL: [CheckName; 8] = [
        CheckName::Artifacts,
        CheckName::Hashes,
        CheckName::Feeds,
        CheckName::Monotonic,
        CheckName::Blockmap,
        CheckName::PlatformSigning,
        CheckName::Signature,
        CheckName::Provenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::Artifacts => "artifacts",
            CheckName::Hashes => "hashes",
            CheckName::Feeds => "feeds",
            CheckName::Monotonic => "monotonic",
            CheckName::Blockmap => "blockmap",
            CheckName::PlatformSigning => "platform-signing",
            CheckName::Signature => "signature",
            CheckName::Provenance => "provenance",
        }
    }

    /// Name shown in the verification matrix
    pub fn display_name(&self) -> &'static str {
        match self {
            CheckName::Artifacts => "Artifact Presence + Headers",
            CheckName::Hashes => "SHA-256 Hash Verification",
            CheckName::Feeds => "Feed Schema + Content",
            CheckName::Monotonic => "Monotonic Version Check",
            CheckName::Blockmap => "Blockmap Sanity Validation",
            CheckName::PlatformSigning => "Platform Signing Checks",
            CheckName::Signature => "Signature Verification",
            CheckName::Provenance => "Provenance Validation",
        }
    }

    /// Whether a failure blocks promotion
    pub fn is_required(&self) -> bool {
        !matches!(
            self,
            CheckName::PlatformSigning | CheckName::Signature | CheckName::Provenance
        )
    }

    pub fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        match self {
            CheckName::Artifacts => check_artifacts(ctx),
            CheckName::Hashes => check_hashes(ctx),
            CheckName::Feeds => check_feeds(ctx),
            CheckName::Monotonic => check_monotonic_versions(ctx),
            CheckName::Blockmap => check_blockmaps(ctx),
            CheckName::PlatformSigning => check_platform_signing(ctx),
            CheckName::Signature => check_signature(ctx),
            CheckName::Provenance => check_provenance(ctx),
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckName::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown check '{}'", s))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::{FailureConfig, MockResource};
    use serde_json::json;

    #[test]
    fn test_check_name_round_trip() {
        for name in CheckName::ALL {
            assert_eq!(name.as_str().parse::<CheckName>().unwrap(), name);
        }
        assert!("bogus".parse::<CheckName>().is_err());
    }

    #[test]
    fn test_required_flags() {
        let required: Vec<_> = CheckName::ALL.iter().filter(|c| c.is_required()).collect();
        assert_eq!(required.len(), 5);
        assert!(!CheckName::PlatformSigning.is_required());
        assert!(!CheckName::Signature.is_required());
        assert!(!CheckName::Provenance.is_required());
    }

    #[test]
    fn test_release_and_feed_urls() {
        let harness = Harness::new(config(json!({})));
        let ctx = harness.ctx();
        let origin = ctx.artifacts_origin().unwrap();
        assert_eq!(
            ctx.release_url(&origin, "App-1.2.0.AppImage").unwrap().as_str(),
            release("App-1.2.0.AppImage")
        );
        assert_eq!(
            ctx.feed_url(&origin, "latest-linux.yml").unwrap().as_str(),
            stable("latest-linux.yml")
        );
    }

    #[test]
    fn test_unresolvable_origin_is_transport() {
        let mut harness = Harness::new(config(json!({})));
        harness.resolver = crate::mock::MockResolver::new();
        let err = harness.ctx().feeds_origin().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("updates.example.com"));
    }

    #[test]
    fn test_document_retries_transient_failure() {
        let harness = Harness::new(config(json!({})));
        let url = stable("latest-linux.yml");
        harness
            .fetcher
            .insert(&url, MockResource::new("version: 1.2.0\n"));
        harness
            .fetcher
            .inject_failure(&url, FailureConfig::status(503).with_fail_count(1));

        let ctx = harness.ctx();
        let body = ctx.document(&Url::parse(&url).unwrap()).unwrap();
        assert_eq!(body, b"version: 1.2.0\n");
    }

    #[test]
    fn test_stream_digest() {
        let harness = Harness::new(config(json!({})));
        let url = release("App-1.2.0.AppImage");
        harness.fetcher.insert(&url, MockResource::new("abc"));
        let digest = harness
            .ctx()
            .stream_digest(&Url::parse(&url).unwrap())
            .unwrap();
        assert_eq!(digest.bytes, 3);
        assert_eq!(
            digest.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_download_retries_into_fresh_file() {
        let harness = Harness::new(config(json!({})));
        let url = release("App-1.2.0.AppImage");
        harness.fetcher.insert(&url, MockResource::new("payload"));
        harness
            .fetcher
            .inject_failure(&url, FailureConfig::status(503).with_fail_count(1));

        let file = harness
            .ctx()
            .download(&Url::parse(&url).unwrap())
            .unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), b"payload");
    }

    #[test]
    fn test_platform_signing_name() {
        assert_eq!(
            "platform-signing".parse::<CheckName>().unwrap(),
            CheckName::PlatformSigning
        );
        assert_eq!(CheckName::PlatformSigning.display_name(), "Platform Signing Checks");
    }
}
