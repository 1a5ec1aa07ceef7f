//! Blockmap sanity: declared size against the served size of the binary

use super::{conclude, CheckContext, CheckResult};
use crate::artifact::{Artifact, BlockmapRecord};
use crate::error::{GateError, MismatchKind};
use crate::net::FetchError;

const SUBJECT: &str = "Blockmap validation";

pub fn check_blockmaps(ctx: &CheckContext<'_>) -> CheckResult {
    let pairs = ctx.config.blockmap_pairs();
    if pairs.is_empty() {
        return Ok(super::CheckOutcome::skipped(
            "no blockmaps for the required platforms",
        ));
    }
    let origin = ctx.artifacts_origin()?;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (blockmap, target) in pairs {
        match check_pair(ctx, &origin, &blockmap, &target) {
            Ok(Some(warning)) => {
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
            Ok(None) => tracing::info!("{}: blockmap size ok", target.decoded_name()),
            Err(err) => errors.push(err),
        }
    }

    conclude(SUBJECT, errors, warnings)
}

fn check_pair(
    ctx: &CheckContext<'_>,
    origin: &url::Url,
    blockmap: &Artifact,
    target: &Artifact,
) -> Result<Option<String>, GateError> {
    let target_name = target.decoded_name();

    let target_url = ctx.release_url(origin, &target.filename)?;
    let actual = ctx.head(&target_url)?.content_length().ok_or_else(|| {
        GateError::Transport(FetchError::MissingHeader {
            url: target_url.to_string(),
            header: "content-length".to_string(),
        })
    })?;

    let bytes = ctx.document(&ctx.release_url(origin, &blockmap.filename)?)?;
    let record = BlockmapRecord::decode(&bytes)
        .map_err(|e| GateError::parse(blockmap.decoded_name(), e))?;

    let declared = record.declared_size_bytes.ok_or_else(|| {
        GateError::parse(blockmap.decoded_name(), "blockmap carries no size information")
    })?;
    if declared != actual {
        return Err(GateError::IntegrityMismatch {
            subject: target_name,
            kind: MismatchKind::Size,
            expected: declared.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(record
        .declared_name
        .filter(|name| *name != target_name && *name != target.filename)
        .map(|name| {
            format!(
                "{}: blockmap names '{}' instead of '{}'",
                blockmap.decoded_name(),
                name,
                target_name
            )
        }))
}
