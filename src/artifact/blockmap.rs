//! Differential-update blockmaps
//!
//! A blockmap is gzip-compressed JSON describing the chunk layout of a
//! binary. Only the first `files` entry matters here: its `size` must equal
//! the served size of the binary.

use flate2::read::GzDecoder;
use serde::Deserialize;
use std::io::Read;

/// Suffix that marks a blockmap sidecar
pub const BLOCKMAP_SUFFIX: &str = ".blockmap";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, thiserror::Error)]
pub enum BlockmapError {
    #[error("failed to decompress blockmap: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("blockmap is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct BlockmapDocument {
    #[serde(default)]
    files: Vec<BlockmapFile>,
}

#[derive(Debug, Deserialize)]
struct BlockmapFile {
    name: Option<String>,
    size: Option<u64>,
}

/// Name and size declared by a blockmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockmapRecord {
    pub declared_name: Option<String>,
    pub declared_size_bytes: Option<u64>,
}

impl BlockmapRecord {
    /// Decode raw blockmap bytes. Uncompressed JSON is accepted as well.
    pub fn decode(bytes: &[u8]) -> Result<Self, BlockmapError> {
        let json = if bytes.starts_with(&GZIP_MAGIC) {
            let mut out = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut out)
                .map_err(BlockmapError::Decompress)?;
            out
        } else {
            bytes.to_vec()
        };

        let document: BlockmapDocument = serde_json::from_slice(&json)?;
        let first = document.files.into_iter().next();
        Ok(Self {
            declared_name: first.as_ref().and_then(|f| f.name.clone()),
            declared_size_bytes: first.and_then(|f| f.size),
        })
    }
}
