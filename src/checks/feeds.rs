//! Feed schema and content
//!
//! Feeds come from the live feeds origin, or from the local staging
//! directory in pre-deploy mode (where URL allow-listing is skipped).

use std::fs;

use url::Url;

use super::{conclude, CheckContext, CheckResult};
use crate::error::GateError;
use crate::feed::{validate_feed, FeedDocument, FeedExpectations, OriginAllowList};

const SUBJECT: &str = "Feed validation";

pub fn check_feeds(ctx: &CheckContext<'_>) -> CheckResult {
    let config = ctx.config;
    let allow_list = OriginAllowList::new(&config.allowed_origins(), &config.allowed_origin_patterns)
        .map_err(|e| GateError::Config(e.to_string()))?;
    let origin = if config.pre_deploy {
        None
    } else {
        Some(ctx.feeds_origin()?)
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (platform, feed) in config.feeds() {
        let doc = match load_feed(ctx, origin.as_ref(), &feed) {
            Ok(doc) => doc,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };

        let report = validate_feed(
            &doc,
            &FeedExpectations {
                platform,
                version: &config.version,
                check_urls: !config.pre_deploy,
                allow_list: &allow_list,
            },
        );
        for warning in report.warnings {
            tracing::warn!("{}: {}", feed, warning);
            warnings.push(format!("{}: {}", feed, warning));
        }
        if report.errors.is_empty() {
            tracing::info!("{} ok", feed);
        } else {
            errors.push(GateError::Validation {
                subject: feed,
                errors: report.errors,
            });
        }
    }

    conclude(SUBJECT, errors, warnings)
}

fn load_feed(
    ctx: &CheckContext<'_>,
    origin: Option<&Url>,
    feed: &str,
) -> Result<FeedDocument, GateError> {
    let bytes = match origin {
        Some(origin) => ctx.document(&ctx.feed_url(origin, feed)?)?,
        None => {
            let path = ctx.config.local_feed_dir.join(feed);
            if !path.exists() {
                return Err(GateError::NotFound {
                    resource: path.display().to_string(),
                });
            }
            tracing::debug!("Reading local feed {}", path.display());
            fs::read(&path).map_err(|e| GateError::parse(path.display().to_string(), e))?
        }
    };
    FeedDocument::from_bytes(&bytes).map_err(|e| GateError::parse(feed, e))
}
