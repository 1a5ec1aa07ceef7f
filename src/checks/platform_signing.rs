//! Operating-system code signatures on the published installers

use std::collections::BTreeSet;

use super::{conclude, CheckContext, CheckOutcome, CheckResult};
use crate::artifact::Platform;
use crate::error::GateError;
use crate::signing::SigningVerdict;

pub fn check_platform_signing(ctx: &CheckContext<'_>) -> CheckResult {
    let installers = ctx.config.signed_artifacts();
    if installers.is_empty() {
        return Ok(CheckOutcome::skipped("no signed installers for the required platforms"));
    }

    let (checkable, without_verifier): (Vec<_>, Vec<_>) = installers
        .into_iter()
        .partition(|installer| ctx.code_signing.supports(installer.platform));
    let mut unavailable: BTreeSet<Platform> = without_verifier.iter().map(|i| i.platform).collect();
    if checkable.is_empty() {
        return Ok(CheckOutcome::skipped(format!(
            "no code-signing verifier on this host for {}",
            list(&unavailable)
        )));
    }

    let origin = ctx.artifacts_origin()?;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut verified = 0;

    for installer in &checkable {
        let name = &installer.filename;
        let file = match ctx.download(&ctx.release_url(&origin, name)?) {
            Ok(file) => file,
            Err(GateError::NotFound { .. }) => {
                tracing::warn!("{} not available for signing check", name);
                warnings.push(format!("{} not available for signing check", name));
                continue;
            }
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        match ctx.code_signing.inspect(installer.platform, file.path()) {
            Some(Ok(SigningVerdict::Verified(detail))) => {
                tracing::info!("{} signature verified: {}", name, detail);
                verified += 1;
            }
            Some(Ok(SigningVerdict::Rejected(detail))) => errors.push(GateError::Signature(format!(
                "{} code signature rejected: {}",
                name, detail
            ))),
            Some(Err(e)) => errors.push(GateError::Signature(format!(
                "{} code signature check failed: {}",
                name, e
            ))),
            None => {
                unavailable.insert(installer.platform);
            }
        }
    }

    if !unavailable.is_empty() {
        tracing::info!("No code-signing verifier on this host for {}", list(&unavailable));
    }
    if errors.is_empty() && verified == 0 {
        let reason = if unavailable.is_empty() {
            "no signed installers available".to_string()
        } else {
            format!("no code-signing verifier on this host for {}", list(&unavailable))
        };
        return Ok(CheckOutcome::skipped(reason));
    }
    conclude("Platform signing", errors, warnings)
}

fn list(platforms: &BTreeSet<Platform>) -> String {
    platforms
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::*;
    use crate::error::ErrorKind;
    use crate::mock::{MockResource, ScriptedCodeSigningTool};
    use serde_json::json;

    const APPIMAGE: &str = "App-1.2.0.AppImage";

    fn linux_harness(tool: ScriptedCodeSigningTool) -> Harness {
        let mut h = Harness::new(config(json!({})));
        h.code_signing = tool;
        h.fetcher
            .insert(&release(APPIMAGE), MockResource::new("\x7fELF appimage"));
        h
    }

    #[test]
    fn test_verified_installer_passes() {
        let h = linux_harness(
            ScriptedCodeSigningTool::new()
                .with_verdict(Platform::Linux, SigningVerdict::Verified("AppImage type 2".into())),
        );
        assert_eq!(check_platform_signing(&h.ctx()).unwrap(), CheckOutcome::passed());
        assert_eq!(
            h.code_signing.inspected(),
            vec![(Platform::Linux, b"\x7fELF appimage".to_vec())]
        );
    }

    #[test]
    fn test_rejected_installer_fails() {
        let h = linux_harness(
            ScriptedCodeSigningTool::new()
                .with_verdict(Platform::Linux, SigningVerdict::Rejected("not an ELF executable".into())),
        );
        let err = check_platform_signing(&h.ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Signature);
        assert_eq!(
            err.to_string(),
            "App-1.2.0.AppImage code signature rejected: not an ELF executable"
        );
    }

    #[test]
    fn test_verifier_failure_reported() {
        let h = linux_harness(
            ScriptedCodeSigningTool::new().with_error(Platform::Linux, "spctl crashed"),
        );
        let err = check_platform_signing(&h.ctx()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Signature);
        assert!(err.to_string().contains("spctl crashed"));
    }

    #[test]
    fn test_no_verifier_skips_without_download() {
        let h = linux_harness(ScriptedCodeSigningTool::new());
        match check_platform_signing(&h.ctx()).unwrap() {
            CheckOutcome::Skipped { reason } => {
                assert_eq!(reason, "no code-signing verifier on this host for linux")
            }
            other => panic!("expected skip, got {:?}", other),
        }
        assert!(h.fetcher.requests().is_empty());
    }

    #[test]
    fn test_missing_installer_is_warning() {
        let mut h = Harness::new(config(json!({"required_platforms": ["win", "linux"]})));
        h.code_signing = ScriptedCodeSigningTool::new()
            .with_verdict(Platform::Win, SigningVerdict::Verified("Successfully verified".into()))
            .with_verdict(Platform::Linux, SigningVerdict::Verified("AppImage type 2".into()));
        h.fetcher.insert(&release(APPIMAGE), MockResource::new("elf"));

        let outcome = check_platform_signing(&h.ctx()).unwrap();
        assert_eq!(
            outcome,
            CheckOutcome::with_warnings(vec![
                "App-Setup-1.2.0.exe not available for signing check".to_string()
            ])
        );
        assert_eq!(h.code_signing.inspected().len(), 1);
    }

    #[test]
    fn test_nothing_signed_for_mac_zip() {
        let mut h = Harness::new(config(json!({"required_platforms": ["mac"]})));
        h.code_signing = ScriptedCodeSigningTool::new()
            .with_verdict(Platform::Mac, SigningVerdict::Verified("accepted".into()));
        assert!(matches!(
            check_platform_signing(&h.ctx()).unwrap(),
            CheckOutcome::Skipped { .. }
        ));
    }
}
