//! Artifact presence and transport headers
//!
//! Four passes over the release:
//! 1. every platform artifact and common file answers a HEAD request
//! 2. configured header rules match (case-insensitive patterns)
//! 3. binaries are not served as `text/html` or compressed on the fly; files
//!    missing here are skipped
//! 4. live feeds carry `Cache-Control: no-store` and `X-Content-Type-Options: nosniff`

use std::collections::BTreeSet;

use regex_lite::Regex;

use super::{conclude, CheckContext, CheckResult};
use crate::artifact::decode_filename;
use crate::config::HeaderRule;
use crate::error::GateError;
use crate::net::HeaderMap;

const SUBJECT: &str = "Artifact presence and headers";
const MISSING: &str = "<missing>";

pub fn check_artifacts(ctx: &CheckContext<'_>) -> CheckResult {
    let config = ctx.config;
    let origin = ctx.artifacts_origin()?;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let names: Vec<String> = config
        .artifacts()
        .into_iter()
        .map(|a| a.filename)
        .chain(config.common_files())
        .collect();

    let mut missing = BTreeSet::new();
    for name in &names {
        let url = ctx.release_url(&origin, name)?;
        match ctx.head(&url) {
            Ok(_) => tracing::info!("Found {}", decode_filename(name)),
            Err(err) => {
                missing.insert(name.clone());
                errors.push(presence_error(name, err));
            }
        }
    }

    for rule in config.header_rules() {
        if missing.contains(&rule.file) {
            continue;
        }
        let url = ctx.release_url(&origin, &rule.file)?;
        match ctx.head(&url) {
            Ok(headers) => errors.extend(match_rule(&rule, &headers)?),
            Err(err) => errors.push(presence_error(&rule.file, err)),
        }
    }

    for artifact in config.binary_artifacts() {
        let name = artifact.decoded_name();
        let url = ctx.release_url(&origin, &artifact.filename)?;
        let headers = match ctx.head(&url) {
            Ok(headers) => headers,
            Err(err) => {
                tracing::warn!("Skipping binary header check for {}: {}", name, err);
                warnings.push(format!("{} binary headers not checked: {}", name, err));
                continue;
            }
        };
        errors.extend(binary_serving_errors(&name, &headers));
    }

    if config.pre_deploy {
        tracing::info!("Pre-deploy mode: feed transport headers not checked");
    } else {
        let feeds_origin = ctx.feeds_origin()?;
        for (_, feed) in config.feeds() {
            let url = ctx.feed_url(&feeds_origin, &feed)?;
            match ctx.head(&url) {
                Ok(headers) => errors.extend(feed_header_errors(&feed, &headers)),
                Err(err) => errors.push(err),
            }
        }
    }

    conclude(SUBJECT, errors, warnings)
}

/// Any non-2xx answer counts as absence, reported by readable name
fn presence_error(name: &str, err: GateError) -> GateError {
    match err {
        GateError::NotFound { .. } => GateError::NotFound {
            resource: decode_filename(name),
        },
        GateError::Transport(crate::net::FetchError::Status { status, .. }) => {
            GateError::NotFound {
                resource: format!("{} (HTTP {})", decode_filename(name), status),
            }
        }
        other => other,
    }
}

fn match_rule(rule: &HeaderRule, headers: &HeaderMap) -> Result<Vec<GateError>, GateError> {
    let expectations = [
        ("content-type", Some(&rule.content_type)),
        ("cache-control", rule.cache_control.as_ref()),
        ("x-content-type-options", rule.x_content_type_options.as_ref()),
    ];

    let mut errors = Vec::new();
    for (header, pattern) in expectations {
        let Some(pattern) = pattern else { continue };
        let regex = Regex::new(&format!("(?i){}", pattern))
            .map_err(|e| GateError::Config(format!("invalid header pattern '{}': {}", pattern, e)))?;
        let actual = headers.get(header);
        if !actual.map(|v| regex.is_match(v)).unwrap_or(false) {
            errors.push(GateError::Header {
                file: decode_filename(&rule.file),
                header: header.to_string(),
                expected: pattern.clone(),
                actual: actual.unwrap_or(MISSING).to_string(),
            });
        }
    }
    Ok(errors)
}

fn binary_serving_errors(name: &str, headers: &HeaderMap) -> Vec<GateError> {
    let mut errors = Vec::new();
    if let Some(content_type) = headers.content_type() {
        if content_type.to_ascii_lowercase().contains("text/html") {
            errors.push(GateError::Header {
                file: name.to_string(),
                header: "content-type".to_string(),
                expected: "not text/html".to_string(),
                actual: content_type.to_string(),
            });
        }
    }
    if let Some(encoding) = headers.content_encoding() {
        if !encoding.trim().eq_ignore_ascii_case("identity") {
            errors.push(GateError::Header {
                file: name.to_string(),
                header: "content-encoding".to_string(),
                expected: "identity".to_string(),
                actual: encoding.to_string(),
            });
        }
    }
    errors
}

fn feed_header_errors(feed: &str, headers: &HeaderMap) -> Vec<GateError> {
    let mut errors = Vec::new();
    let cache_control = headers.cache_control();
    if !cache_control
        .map(|v| v.to_ascii_lowercase().contains("no-store"))
        .unwrap_or(false)
    {
        errors.push(GateError::Header {
            file: feed.to_string(),
            header: "cache-control".to_string(),
            expected: "no-store".to_string(),
            actual: cache_control.unwrap_or(MISSING).to_string(),
        });
    }
    let nosniff = headers.x_content_type_options();
    if !nosniff
        .map(|v| v.trim().eq_ignore_ascii_case("nosniff"))
        .unwrap_or(false)
    {
        errors.push(GateError::Header {
            file: feed.to_string(),
            header: "x-content-type-options".to_string(),
            expected: "nosniff".to_string(),
            actual: nosniff.unwrap_or(MISSING).to_string(),
        });
    }
    errors
}
