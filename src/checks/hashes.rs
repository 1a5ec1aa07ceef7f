//! SHA-256 verification against the published hash manifest

use super::{conclude, CheckContext, CheckResult};
use crate::artifact::{digests_match, HashManifest};
use crate::error::{GateError, MismatchKind};

const SUBJECT: &str = "Hash verification";

pub fn check_hashes(ctx: &CheckContext<'_>) -> CheckResult {
    let config = ctx.config;
    let origin = ctx.artifacts_origin()?;

    let manifest_name = &config.layout.manifest;
    let bytes = ctx.document(&ctx.release_url(&origin, manifest_name)?)?;
    let manifest =
        HashManifest::from_bytes(&bytes).map_err(|e| GateError::parse(manifest_name.as_str(), e))?;
    tracing::debug!("{} lists {} file(s)", manifest_name, manifest.len());

    let mut errors = Vec::new();
    for artifact in config.artifacts() {
        let name = artifact.decoded_name();
        let Some(expected) = manifest.get(&name) else {
            errors.push(GateError::NotFound {
                resource: format!("published hash for {}", name),
            });
            continue;
        };

        let url = ctx.release_url(&origin, &artifact.filename)?;
        let digest = match ctx.stream_digest(&url) {
            Ok(digest) => digest,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };

        if digests_match(expected, &digest.sha256) {
            tracing::info!("{}: sha256 ok ({} bytes)", name, digest.bytes);
        } else {
            errors.push(GateError::IntegrityMismatch {
                subject: name,
                kind: MismatchKind::Hash,
                expected: expected.to_string(),
                actual: digest.sha256,
            });
        }
    }

    conclude(SUBJECT, errors, Vec::new())
}
