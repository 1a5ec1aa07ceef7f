//! Release version ordering for the promotion gate.
//!
//! Versions are `major.minor.patch` with an optional prerelease tag and an
//! optional leading `v`. The ordering is total: numeric triple first, then a
//! release outranks any prerelease of the same triple, then prerelease tags
//! compare lexicographically.

mod guard;
mod version;

pub use guard::{check_monotonic, MonotonicVerdict};
pub use version::{ParseVersionError, ReleaseVersion};

use std::cmp::Ordering;

/// Compare two versions, returning -1, 0 or 1.
pub fn compare(a: &ReleaseVersion, b: &ReleaseVersion) -> i32 {
    match a.cmp(b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Parse both strings and compare them.
pub fn compare_str(a: &str, b: &str) -> Result<i32, ParseVersionError> {
    let a = ReleaseVersion::parse(a)?;
    let b = ReleaseVersion::parse(b)?;
    Ok(compare(&a, &b))
}
