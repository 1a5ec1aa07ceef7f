//! Monotonic downgrade guard.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::ReleaseVersion;

/// Outcome of comparing a candidate against the live version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonotonicVerdict {
    /// Nothing is published yet
    FirstDeployment,
    /// Candidate is newer than the live version
    Upgrade,
    /// Candidate equals the live version (possible re-deployment)
    Redeploy,
    /// Candidate is older than the live version
    Downgrade,
}

impl MonotonicVerdict {
    /// Only a downgrade blocks promotion.
    pub fn is_blocking(&self) -> bool {
        matches!(self, MonotonicVerdict::Downgrade)
    }

    /// A re-deployment passes but should be surfaced.
    pub fn is_warning(&self) -> bool {
        matches!(self, MonotonicVerdict::Redeploy)
    }
}

impl fmt::Display for MonotonicVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonotonicVerdict::FirstDeployment => "first deployment",
            MonotonicVerdict::Upgrade => "upgrade",
            MonotonicVerdict::Redeploy => "re-deployment",
            MonotonicVerdict::Downgrade => "downgrade",
        };
        f.write_str(s)
    }
}

/// Decide whether `candidate` may replace `current`.
pub fn check_monotonic(
    candidate: &ReleaseVersion,
    current: Option<&ReleaseVersion>,
) -> MonotonicVerdict {
    let Some(current) = current else {
        return MonotonicVerdict::FirstDeployment;
    };
    match candidate.cmp(current) {
        Ordering::Less => MonotonicVerdict::Downgrade,
        Ordering::Equal => MonotonicVerdict::Redeploy,
        Ordering::Greater => MonotonicVerdict::Upgrade,
    }
}
