//! Detached signature over the hash manifest

use super::{CheckContext, CheckOutcome, CheckResult};
use crate::error::GateError;
use crate::signing::{verify_detached, PublicKeyMaterial};

pub fn check_signature(ctx: &CheckContext<'_>) -> CheckResult {
    let config = ctx.config;
    let Some(raw_key) = config.public_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        tracing::info!("No public key configured, signature verification skipped");
        return Ok(CheckOutcome::skipped("no public key configured"));
    };
    let key = PublicKeyMaterial::parse(raw_key).map_err(|e| GateError::Signature(e.to_string()))?;

    let origin = ctx.artifacts_origin()?;
    let signature = ctx.document(&ctx.release_url(&origin, &config.layout.signature)?)?;
    let manifest = ctx.document(&ctx.release_url(&origin, &config.layout.manifest)?)?;

    verify_detached(&key, ctx.signature_tool, &signature, &manifest).map_err(|e| {
        GateError::Signature(format!("{} over {}: {}", config.layout.signature, config.layout.manifest, e))
    })?;
    tracing::info!("{} verified with {}", config.layout.manifest, key.describe());
    Ok(CheckOutcome::passed())
}
