//! Monotonic version guard against the live feeds

use release_version::{check_monotonic, MonotonicVerdict, ReleaseVersion};

use super::{conclude, CheckContext, CheckResult};
use crate::error::GateError;
use crate::feed::FeedDocument;

const SUBJECT: &str = "Monotonic version check";

pub fn check_monotonic_versions(ctx: &CheckContext<'_>) -> CheckResult {
    let config = ctx.config;
    let candidate = config
        .release_version()
        .map_err(|e| GateError::parse("release version", e))?;
    let origin = ctx.feeds_origin()?;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (_, feed) in config.feeds() {
        let url = ctx.feed_url(&origin, &feed)?;
        let current = match ctx.document(&url) {
            Ok(bytes) => match live_version(&feed, &bytes) {
                Ok(version) => Some(version),
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            },
            Err(GateError::NotFound { .. }) => None,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };

        match check_monotonic(&candidate, current.as_ref()) {
            MonotonicVerdict::FirstDeployment => {
                tracing::info!("{}: no live feed, first deployment of {}", feed, candidate)
            }
            MonotonicVerdict::Upgrade => {
                if let Some(current) = &current {
                    tracing::info!("{}: {} -> {}", feed, current, candidate);
                }
            }
            MonotonicVerdict::Redeploy => {
                let message = format!(
                    "{}: version {} is already live (re-deployment)",
                    feed, candidate
                );
                tracing::warn!("{}", message);
                warnings.push(message);
            }
            MonotonicVerdict::Downgrade => errors.push(GateError::Downgrade {
                feed,
                candidate: candidate.to_string(),
                current: current.map(|v| v.to_string()).unwrap_or_default(),
            }),
        }
    }

    conclude(SUBJECT, errors, warnings)
}

fn live_version(feed: &str, bytes: &[u8]) -> Result<ReleaseVersion, GateError> {
    let doc = FeedDocument::from_bytes(bytes).map_err(|e| GateError::parse(feed, e))?;
    let version = doc
        .version()
        .ok_or_else(|| GateError::parse(feed, "live feed has no version field"))?;
    ReleaseVersion::parse(version).map_err(|e| GateError::parse(feed, e))
}
