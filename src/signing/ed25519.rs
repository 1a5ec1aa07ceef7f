//! Native Ed25519 detached signatures
//!
//! Keys are base64-encoded 32-byte public keys. Signature files hold either
//! the 64 raw signature bytes or their base64 encoding.

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use super::SigningError;

const STANDARD: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Compute SHA-256 fingerprint of an Ed25519 public key
pub fn compute_key_fingerprint(key: &VerifyingKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Decode a verifying key from base64
pub fn decode_verifying_key(encoded: &str) -> Result<VerifyingKey, SigningError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let bytes_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| SigningError::InvalidKey("key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes_array).map_err(|e| SigningError::InvalidKey(e.to_string()))
}

/// Decode a signature file: base64 text first, then raw bytes
pub fn decode_signature(contents: &[u8]) -> Result<Signature, SigningError> {
    if let Ok(text) = std::str::from_utf8(contents) {
        if let Ok(bytes) = STANDARD.decode(text.trim()) {
            if bytes.len() == Signature::BYTE_SIZE {
                return Signature::from_slice(&bytes)
                    .map_err(|e| SigningError::InvalidSignature(e.to_string()));
            }
        }
    }
    if contents.len() == Signature::BYTE_SIZE {
        return Signature::from_slice(contents)
            .map_err(|e| SigningError::InvalidSignature(e.to_string()));
    }
    Err(SigningError::InvalidSignature(format!(
        "expected a {}-byte Ed25519 signature (raw or base64), got {} bytes",
        Signature::BYTE_SIZE,
        contents.len()
    )))
}

/// Verify `signature_file` over `payload`
pub fn verify_ed25519(
    key: &VerifyingKey,
    signature_file: &[u8],
    payload: &[u8],
) -> Result<(), SigningError> {
    let signature = decode_signature(signature_file)?;
    key.verify(payload, &signature)
        .map_err(|e| SigningError::InvalidSignature(e.to_string()))
}
