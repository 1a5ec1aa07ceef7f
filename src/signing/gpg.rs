//! OpenPGP verification through an external `gpg`
//!
//! Every verification runs against a fresh keyring in a temporary
//! GNUPGHOME that is removed when verification returns. Acceptance requires
//! an explicit `[GNUPG:] GOODSIG` or `[GNUPG:] VALIDSIG` status line; exit
//! codes alone are not trusted.
//!
//! Two invocation styles are tried in order:
//! 1. signature and payload as separate files (`--verify <sig> <payload>`)
//! 2. signature, newline, payload concatenated on stdin (`--verify -`)

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::SigningError;

/// Status lines that prove a good signature
pub const VALID_MARKERS: &[&str] = &["[GNUPG:] GOODSIG", "[GNUPG:] VALIDSIG"];

/// Captured output of one tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn has_valid_marker(&self) -> bool {
        self.stdout
            .lines()
            .any(|line| VALID_MARKERS.iter().any(|m| line.starts_with(m)))
    }
}

/// Seam over the external verification tool
pub trait SignatureTool: Send + Sync {
    /// Run the tool with `home` as its keyring directory
    fn run(&self, home: &Path, args: &[String], stdin: &[u8]) -> Result<ToolOutput, SigningError>;
}

/// The system `gpg` binary
#[derive(Debug, Clone)]
pub struct GpgTool {
    program: PathBuf,
}

impl Default for GpgTool {
    fn default() -> Self {
        Self {
            program: PathBuf::from("gpg"),
        }
    }
}

impl GpgTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl SignatureTool for GpgTool {
    fn run(&self, home: &Path, args: &[String], stdin: &[u8]) -> Result<ToolOutput, SigningError> {
        tracing::debug!("{} --homedir {} {}", self.program.display(), home.display(), args.join(" "));
        let mut child = Command::new(&self.program)
            .arg("--homedir")
            .arg(home)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SigningError::Tool(format!("failed to run {}: {}", self.program.display(), e)))?;

        // Feed stdin from a separate thread so a chatty child cannot block us
        let writer = child.stdin.take().map(|mut pipe| {
            let input = stdin.to_vec();
            std::thread::spawn(move || pipe.write_all(&input))
        });

        let output = child.wait_with_output()?;
        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                // The child may legitimately exit before consuming stdin
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(SigningError::Io(e)),
                Err(_) => return Err(SigningError::Tool("stdin writer panicked".to_string())),
            }
        }

        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Which invocation produced the accepted status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStyle {
    SeparateFiles,
    Concatenated,
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn summarize(output: &ToolOutput) -> String {
    let text = if output.stderr.trim().is_empty() {
        output.stdout.trim()
    } else {
        output.stderr.trim()
    };
    if text.is_empty() {
        "no valid signature status".to_string()
    } else {
        text.lines().take(3).collect::<Vec<_>>().join("; ")
    }
}

/// Verify a detached OpenPGP signature over `payload`
pub fn verify_openpgp(
    tool: &dyn SignatureTool,
    armored_key: &str,
    signature: &[u8],
    payload: &[u8],
) -> Result<InvocationStyle, SigningError> {
    let home = tempfile::Builder::new().prefix("release-gate-gnupg").tempdir()?;

    let import = tool.run(home.path(), &args(&["--batch", "--import"]), armored_key.as_bytes())?;
    if !import.success {
        return Err(SigningError::KeyImport(summarize(&import)));
    }

    let sig_path = home.path().join("payload.sig");
    let payload_path = home.path().join("payload");
    fs::write(&sig_path, signature)?;
    fs::write(&payload_path, payload)?;

    let separate = match tool.run(
        home.path(),
        &[
            args(&["--batch", "--status-fd", "1", "--verify"]),
            vec![
                sig_path.to_string_lossy().into_owned(),
                payload_path.to_string_lossy().into_owned(),
            ],
        ]
        .concat(),
        &[],
    ) {
        Ok(output) if output.has_valid_marker() => return Ok(InvocationStyle::SeparateFiles),
        Ok(output) => summarize(&output),
        Err(e) => e.to_string(),
    };
    tracing::debug!("separate-file verification failed: {}", separate);

    let mut combined = signature.to_vec();
    combined.push(b'\n');
    combined.extend_from_slice(payload);
    let concatenated = match tool.run(
        home.path(),
        &args(&["--batch", "--status-fd", "1", "--verify", "-"]),
        &combined,
    ) {
        Ok(output) if output.has_valid_marker() => {
            tracing::warn!("signature verified only via concatenated stdin input");
            return Ok(InvocationStyle::Concatenated);
        }
        Ok(output) => summarize(&output),
        Err(e) => e.to_string(),
    };

    Err(SigningError::NotVerified {
        first: separate,
        second: concatenated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedSignatureTool;

    const KEY: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----\nabc\n-----END PGP PUBLIC KEY BLOCK-----";

    fn ok(stdout: &str) -> ToolOutput {
        ToolOutput {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn fail(stderr: &str) -> ToolOutput {
        ToolOutput {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_marker_detection() {
        assert!(ok("[GNUPG:] NEWSIG\n[GNUPG:] GOODSIG ABCD Release <r@example.com>\n").has_valid_marker());
        assert!(ok("[GNUPG:] VALIDSIG ABCD 2024-01-01\n").has_valid_marker());
        assert!(!ok("[GNUPG:] BADSIG ABCD\n").has_valid_marker());
        assert!(!ok("gpg: Good signature from x\n").has_valid_marker());
    }

    #[test]
    fn test_first_style_accepted() {
        let tool = ScriptedSignatureTool::new(vec![ok(""), ok("[GNUPG:] GOODSIG ABCD x\n")]);
        let style = verify_openpgp(&tool, KEY, b"sig", b"sums").unwrap();
        assert_eq!(style, InvocationStyle::SeparateFiles);

        let calls = tool.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args, vec!["--batch", "--import"]);
        assert_eq!(calls[0].stdin, KEY.as_bytes());
        assert!(calls[1].args.contains(&"--status-fd".to_string()));
    }

    #[test]
    fn test_fallback_to_concatenated() {
        let tool = ScriptedSignatureTool::new(vec![
            ok(""),
            fail("gpg: BAD signature"),
            ok("[GNUPG:] VALIDSIG ABCD\n"),
        ]);
        let style = verify_openpgp(&tool, KEY, b"sig", b"sums").unwrap();
        assert_eq!(style, InvocationStyle::Concatenated);

        let calls = tool.calls();
        assert_eq!(calls[2].stdin, b"sig\nsums".to_vec());
        assert_eq!(calls[2].args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_both_styles_fail() {
        let tool = ScriptedSignatureTool::new(vec![
            ok(""),
            fail("gpg: BAD signature from x"),
            ok("[GNUPG:] BADSIG ABCD\n"),
        ]);
        let err = verify_openpgp(&tool, KEY, b"sig", b"sums").unwrap_err();
        assert!(matches!(err, SigningError::NotVerified { .. }));
        assert!(err.to_string().contains("BAD signature"));
    }

    #[test]
    fn test_first_style_tool_error_falls_through() {
        let tool = ScriptedSignatureTool::new(vec![ok("")])
            .then_error("broken pipe writing stdin")
            .then_output(ok("[GNUPG:] GOODSIG ABCD x\n"));
        let style = verify_openpgp(&tool, KEY, b"sig", b"sums").unwrap();
        assert_eq!(style, InvocationStyle::Concatenated);
        assert_eq!(tool.calls().len(), 3);
    }

    #[test]
    fn test_tool_errors_in_both_styles_reported() {
        let tool = ScriptedSignatureTool::new(vec![ok("")])
            .then_error("gpg crashed")
            .then_error("gpg crashed again");
        let err = verify_openpgp(&tool, KEY, b"sig", b"sums").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("gpg crashed"));
        assert!(message.contains("gpg crashed again"));
    }

    #[test]
    fn test_import_failure() {
        let tool = ScriptedSignatureTool::new(vec![fail("gpg: no valid OpenPGP data found.")]);
        let err = verify_openpgp(&tool, KEY, b"sig", b"sums").unwrap_err();
        assert!(matches!(err, SigningError::KeyImport(_)));
        assert_eq!(tool.calls().len(), 1);
    }

    #[test]
    fn test_keyring_removed_after_verification() {
        let tool = ScriptedSignatureTool::new(vec![ok(""), ok("[GNUPG:] GOODSIG ABCD\n")]);
        verify_openpgp(&tool, KEY, b"sig", b"sums").unwrap();
        let home = tool.calls()[0].home.clone();
        assert!(!home.exists());
    }

    #[test]
    fn test_missing_program() {
        let tool = GpgTool::new("/nonexistent/gpg-binary");
        let dir = tempfile::tempdir().unwrap();
        let err = tool.run(dir.path(), &[], b"").unwrap_err();
        assert!(matches!(err, SigningError::Tool(_)));
    }
}
