//! Full-content SHA-256 hashing for exact duplicate detection.
//!
//! Streams the file through the hasher in fixed-size chunks so memory
//! stays flat regardless of file size. Two files are exact duplicates
//! iff their digests match, so unlike a change-detection hash this one
//! must cover every byte.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the SHA-256 of a file's full byte content.
///
/// # Returns
///
/// Lowercase hex digest (64 characters).
///
/// # Errors
///
/// Returns an IO error if the file cannot be read.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
