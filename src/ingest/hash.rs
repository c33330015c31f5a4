//! Content fingerprinting for dedup.
//!
//! Streams the file through SHA-256 in fixed-size chunks so large
//! recordings never sit in memory whole. The hex digest is the record key.

use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 64 * 1024;

/// I/O failure while hashing. Transient: the file may have vanished
/// mid-read (iCloud eviction, still-syncing). The caller skips this cycle
/// and retries on the next event.
#[derive(Debug, Error)]
#[error("failed to read {path} while hashing: {source}")]
pub struct ReadError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// Compute the SHA-256 hex digest of a file's bytes.
pub async fn content_hash(path: &Path) -> Result<String, ReadError> {
    let wrap = |source: std::io::Error| ReadError {
        path: path.display().to_string(),
        source,
    };

    let mut file = File::open(path).await.map_err(wrap)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).await.map_err(wrap)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
