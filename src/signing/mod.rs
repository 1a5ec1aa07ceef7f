//! Detached signature verification of the hash manifest
//!
//! The configured public key decides the backend:
//! - an ASCII-armored OpenPGP key block goes through `gpg`
//! - a base64 Ed25519 public key is verified natively
//!
//! `platform` covers the operating-system signatures on the installers themselves.

mod ed25519;
mod gpg;
mod platform;

pub use ed25519::{compute_key_fingerprint, decode_signature, decode_verifying_key, verify_ed25519};
pub use gpg::{verify_openpgp, GpgTool, InvocationStyle, SignatureTool, ToolOutput, VALID_MARKERS};
pub use platform::{
    inspect_appimage, judge, CodeSigningTool, HostCodeSigningTool, SigningVerdict, MAC_MARKERS,
    WIN_MARKERS,
};

use ed25519_dalek::VerifyingKey;
use std::io;
use thiserror::Error;

const PGP_KEY_HEADER: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";

/// Errors from signature verification
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("public key import failed: {0}")]
    KeyImport(String),

    #[error("signature tool error: {0}")]
    Tool(String),

    #[error("signature not verified (separate files: {first}; concatenated: {second})")]
    NotVerified { first: String, second: String },
}

/// A parsed verification key
#[derive(Debug, Clone)]
pub enum PublicKeyMaterial {
    OpenPgp(String),
    Ed25519(VerifyingKey),
}

impl PublicKeyMaterial {
    pub fn parse(raw: &str) -> Result<Self, SigningError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SigningError::InvalidKey("public key is empty".to_string()));
        }
        if trimmed.contains(PGP_KEY_HEADER) {
            return Ok(PublicKeyMaterial::OpenPgp(trimmed.to_string()));
        }
        decode_verifying_key(trimmed)
            .map(PublicKeyMaterial::Ed25519)
            .map_err(|e| {
                SigningError::InvalidKey(format!(
                    "not an armored OpenPGP key or base64 Ed25519 key ({})",
                    e
                ))
            })
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            PublicKeyMaterial::OpenPgp(_) => "OpenPGP key".to_string(),
            PublicKeyMaterial::Ed25519(key) => {
                format!("Ed25519 key {}", &compute_key_fingerprint(key)[..16])
            }
        }
    }
}

/// Verify `signature` over `payload` with whichever backend `key` needs
pub fn verify_detached(
    key: &PublicKeyMaterial,
    tool: &dyn SignatureTool,
    signature: &[u8],
    payload: &[u8],
) -> Result<(), SigningError> {
    match key {
        PublicKeyMaterial::OpenPgp(armored) => {
            verify_openpgp(tool, armored, signature, payload).map(|_| ())
        }
        PublicKeyMaterial::Ed25519(key) => verify_ed25519(key, signature, payload),
    }
}
