//! Feed schema and content validation
//!
//! Defects are accumulated so one run reports every problem in a feed.

use url::Url;

use super::{FeedDocument, OriginAllowList};
use crate::artifact::Platform;

/// Fields that mark a feed as describing mac artifacts
pub const MAC_HINT_FIELDS: &[&str] = &["osx", "mac", "dmg"];

/// What a feed is validated against
#[derive(Debug, Clone, Copy)]
pub struct FeedExpectations<'a> {
    pub platform: Platform,
    /// The release's own version; the feed must carry exactly this string
    pub version: &'a str,
    /// `url`/`path` are origin-checked only when set (off in pre-deploy mode)
    pub check_urls: bool,
    pub allow_list: &'a OriginAllowList,
}

/// Accumulated defects and advisories for one feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl FeedReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_feed(doc: &FeedDocument, expect: &FeedExpectations<'_>) -> FeedReport {
    let mut report = FeedReport::default();

    match doc.version() {
        None => report
            .errors
            .push("Missing required field: version".to_string()),
        Some(version) => {
            if !is_semver(version) {
                report
                    .errors
                    .push(format!("Invalid semantic version format: {}", version));
            }
            if version != expect.version {
                report.errors.push(format!(
                    "Version mismatch: expected {}, got {}",
                    expect.version, version
                ));
            }
        }
    }

    if expect.check_urls {
        for (field, value) in [("url", doc.url()), ("path", doc.path())] {
            let Some(value) = value else { continue };
            match Url::parse(value) {
                Ok(url) if url.scheme() == "https" && url.host_str().is_some() => {
                    if !expect.allow_list.allows(&url) {
                        report.errors.push(format!(
                            "URL not from allowed origins in {}: {}",
                            field, value
                        ));
                    }
                }
                _ => report
                    .errors
                    .push(format!("Invalid URL format in {}: {}", field, value)),
            }
        }
    }

    if expect.platform == Platform::Mac {
        let has_mac_field = MAC_HINT_FIELDS.iter().any(|f| doc.contains(f));
        if let Some(url) = doc.url() {
            if !has_mac_field && !url.to_ascii_lowercase().contains("mac") {
                report
                    .warnings
                    .push("Mac feed should contain mac-specific artifact references".to_string());
            }
        }
    }

    report
}

/// Full semantic-version grammar: `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`
/// without leading zeros in numeric identifiers.
pub fn is_semver(s: &str) -> bool {
    let (rest, build) = match s.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (s, None),
    };
    let (core, prerelease) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() != 3 || !parts.iter().all(|p| is_numeric_identifier(p)) {
        return false;
    }

    if let Some(pre) = prerelease {
        let ok = pre.split('.').all(|id| {
            if id.is_empty() || !id.bytes().all(is_identifier_byte) {
                return false;
            }
            // Purely numeric identifiers must not have leading zeros
            !id.bytes().all(|b| b.is_ascii_digit()) || is_numeric_identifier(id)
        });
        if !ok {
            return false;
        }
    }

    if let Some(build) = build {
        if !build
            .split('.')
            .all(|id| !id.is_empty() && id.bytes().all(is_identifier_byte))
        {
            return false;
        }
    }

    true
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-'
}

fn is_numeric_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && (s == "0" || !s.starts_with('0'))
}
