//! Operating-system code signing of downloaded installers
//!
//! Each platform has its own verifier:
//! - mac: `spctl -a -vvv -t install`, only available on a macOS host
//! - win: `signtool verify /pa /all`, only when `signtool` is installed
//! - linux: AppImages carry no OS signature; the ELF and AppImage magic are
//!   checked natively
//!
//! A verifier that cannot run on this host yields no verdict at all, so the
//! caller can tell "not checked" apart from "rejected".

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::Command;

use super::{SigningError, ToolOutput};
use crate::artifact::Platform;

/// Gatekeeper assessment lines that mean the installer is accepted
pub const MAC_MARKERS: &[&str] = &["source=Notarized Developer ID", "accepted", "Developer ID Application"];

/// signtool lines that mean an Authenticode signature was verified
pub const WIN_MARKERS: &[&str] = &["Successfully verified", "Number of signatures", "Hash algorithm"];

const ELF_MAGIC: &[u8] = b"\x7fELF";
const APPIMAGE_MAGIC: &[&[u8]] = &[b"AI\x01", b"AI\x02"];

/// Result of inspecting one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningVerdict {
    Verified(String),
    Rejected(String),
}

/// Seam over the platform verifiers
pub trait CodeSigningTool: Send + Sync {
    /// Whether this host may have a verifier for `platform`
    fn supports(&self, platform: Platform) -> bool;

    /// Inspect `path` as a `platform` installer; `None` when this host has no verifier for it
    fn inspect(&self, platform: Platform, path: &Path) -> Option<Result<SigningVerdict, SigningError>>;
}

/// Verifiers available on the running host
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCodeSigningTool;

impl CodeSigningTool for HostCodeSigningTool {
    fn supports(&self, platform: Platform) -> bool {
        platform != Platform::Mac || cfg!(target_os = "macos")
    }

    fn inspect(&self, platform: Platform, path: &Path) -> Option<Result<SigningVerdict, SigningError>> {
        match platform {
            Platform::Mac if cfg!(target_os = "macos") => Some(
                run_tool("spctl", &["-a", "-vvv", "-t", "install"], path)
                    .map(|output| judge(&output, MAC_MARKERS)),
            ),
            Platform::Mac => None,
            Platform::Win => match run_tool("signtool", &["verify", "/pa", "/all"], path) {
                Ok(output) => Some(Ok(judge(&output, WIN_MARKERS))),
                Err(SigningError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("signtool not installed, Authenticode check unavailable");
                    None
                }
                Err(e) => Some(Err(e)),
            },
            Platform::Linux => Some(inspect_appimage(path)),
        }
    }
}

fn run_tool(program: &str, args: &[&str], path: &Path) -> Result<ToolOutput, SigningError> {
    tracing::debug!("{} {} {}", program, args.join(" "), path.display());
    let output = Command::new(program).args(args).arg(path).output()?;
    Ok(ToolOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Accept when any marker appears on stdout or stderr
pub fn judge(output: &ToolOutput, markers: &[&str]) -> SigningVerdict {
    let lines = || output.stdout.lines().chain(output.stderr.lines()).map(str::trim);
    match lines().find(|line| markers.iter().any(|m| line.contains(m))) {
        Some(line) => SigningVerdict::Verified(line.to_string()),
        None => {
            let detail: Vec<&str> = lines().filter(|l| !l.is_empty()).take(3).collect();
            SigningVerdict::Rejected(if detail.is_empty() {
                "no signature information".to_string()
            } else {
                detail.join("; ")
            })
        }
    }
}

/// ELF executable with the AppImage type marker at offset 8
pub fn inspect_appimage(path: &Path) -> Result<SigningVerdict, SigningError> {
    let mut head = Vec::with_capacity(11);
    File::open(path)?.take(11).read_to_end(&mut head)?;
    if !head.starts_with(ELF_MAGIC) {
        return Ok(SigningVerdict::Rejected("not an ELF executable".to_string()));
    }
    match head.get(8..11) {
        Some(marker) if APPIMAGE_MAGIC.contains(&marker) => Ok(SigningVerdict::Verified(format!(
            "AppImage type {}",
            marker[2]
        ))),
        _ => Ok(SigningVerdict::Rejected(
            "ELF executable without AppImage magic".to_string(),
        )),
    }
}
