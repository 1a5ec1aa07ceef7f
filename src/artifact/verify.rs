//! Streaming SHA-256 digests
//!
//! Artifacts can be hundreds of megabytes, so bodies are hashed through a
//! fixed buffer and never held in memory.

use sha2::{Digest, Sha256};
use std::io::{self, Read};

const BUFFER_SIZE: usize = 64 * 1024;

/// Digest and length of a hashed stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDigest {
    pub sha256: String,
    pub bytes: u64,
}

/// Hash everything `reader` yields
pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<StreamDigest> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
        total += n as u64;
    }
    Ok(StreamDigest {
        sha256: hex::encode(hasher.finalize()),
        bytes: total,
    })
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hex digests compare case-insensitively
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}
