//! Build provenance check
//!
//! An absent document skips the check. A present one must pass every
//! structural sub-check; CI cross-references only warn.

use super::{CheckContext, CheckOutcome, CheckResult};
use crate::error::GateError;
use crate::provenance::{validate_statement, ProvenanceStatement};

pub fn check_provenance(ctx: &CheckContext<'_>) -> CheckResult {
    let config = ctx.config;
    let name = &config.layout.provenance;
    let origin = ctx.artifacts_origin()?;

    let bytes = match ctx.document(&ctx.release_url(&origin, name)?) {
        Ok(bytes) => bytes,
        Err(GateError::NotFound { .. }) => {
            tracing::info!("{} not published, provenance validation skipped", name);
            return Ok(CheckOutcome::skipped(format!("{} not published", name)));
        }
        Err(err) => return Err(err),
    };

    let statement =
        ProvenanceStatement::from_slice(&bytes).map_err(|e| GateError::parse(name.as_str(), e))?;
    let report = validate_statement(&statement, &config.ci);
    for warning in &report.warnings {
        tracing::warn!("{}: {}", name, warning);
    }

    if report.is_valid() {
        Ok(CheckOutcome::with_warnings(report.warnings))
    } else {
        Err(GateError::Validation {
            subject: name.clone(),
            errors: report.errors,
        })
    }
}
