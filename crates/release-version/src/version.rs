//! Parsed release version.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseVersionError {
    #[error("Invalid version format: {0}")]
    InvalidFormat(String),

    #[error("version component '{component}' out of range in {input}")]
    ComponentOverflow { input: String, component: String },
}

/// A release version: `major.minor.patch[-prerelease]`.
///
/// Accepts `^v?\d+\.\d+\.\d+(-.+)?$`. The prerelease tag is everything after
/// the first `-` and is kept verbatim (including any `+build` suffix).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl ReleaseVersion {
    /// Construct a release (non-prerelease) version.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// Attach a prerelease tag.
    pub fn with_prerelease(mut self, tag: impl Into<String>) -> Self {
        self.prerelease = Some(tag.into());
        self
    }

    /// Parse a version string.
    pub fn parse(input: &str) -> Result<Self, ParseVersionError> {
        let invalid = || ParseVersionError::InvalidFormat(input.to_string());

        let body = input.strip_prefix('v').unwrap_or(input);
        let (core, prerelease) = match body.split_once('-') {
            Some((core, tag)) if !tag.is_empty() => (core, Some(tag.to_string())),
            Some(_) => return Err(invalid()),
            None => (body, None),
        };

        let mut parts = core.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        Ok(Self {
            major: parse_component(input, major)?,
            minor: parse_component(input, minor)?,
            patch: parse_component(input, patch)?,
            prerelease,
        })
    }

    /// True if this version carries a prerelease tag.
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }
}

fn parse_component(input: &str, component: &str) -> Result<u64, ParseVersionError> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseVersionError::InvalidFormat(input.to_string()));
    }
    component
        .parse()
        .map_err(|_| ParseVersionError::ComponentOverflow {
            input: input.to_string(),
            component: component.to_string(),
        })
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref tag) = self.prerelease {
            write!(f, "-{}", tag)?;
        }
        Ok(())
    }
}

impl FromStr for ReleaseVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ReleaseVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReleaseVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let v = ReleaseVersion::parse("1.2.3").unwrap();
        assert_eq!(v, ReleaseVersion::new(1, 2, 3));
        assert!(!v.is_prerelease());
    }

    #[test]
    fn test_parse_leading_v() {
        assert_eq!(
            ReleaseVersion::parse("v0.4.0").unwrap(),
            ReleaseVersion::new(0, 4, 0)
        );
    }

    #[test]
    fn test_parse_prerelease_keeps_everything_after_dash() {
        let v = ReleaseVersion::parse("1.0.0-beta.2+build.7").unwrap();
        assert_eq!(v.prerelease.as_deref(), Some("beta.2+build.7"));

        let v = ReleaseVersion::parse("1.0.0-rc-1").unwrap();
        assert_eq!(v.prerelease.as_deref(), Some("rc-1"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "1",
            "1.2",
            "1.2.3.4",
            "1.2.x",
            "1..3",
            "1.2.3-",
            "V1.2.3",
            " 1.2.3",
            "1.2.3 ",
            "-1.2.3",
            "1.2.3+build",
        ] {
            assert!(
                matches!(
                    ReleaseVersion::parse(bad),
                    Err(ParseVersionError::InvalidFormat(_))
                ),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_overflow() {
        let err = ReleaseVersion::parse("99999999999999999999999.0.0").unwrap_err();
        assert!(matches!(err, ParseVersionError::ComponentOverflow { .. }));
    }

    #[test]
    fn test_display_drops_leading_v() {
        assert_eq!(ReleaseVersion::parse("v1.2.3-rc.1").unwrap().to_string(), "1.2.3-rc.1");
    }

    #[test]
    fn test_serde_as_string() {
        let v = ReleaseVersion::new(1, 2, 0).with_prerelease("beta");
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#""1.2.0-beta""#);
        let back: ReleaseVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert!(serde_json::from_str::<ReleaseVersion>(r#""nope""#).is_err());
    }
}
