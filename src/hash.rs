// Content fingerprinting using BLAKE3

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::constants::HASH_CHUNK_SIZE;
use crate::error::Result;

/// Compute the BLAKE3 fingerprint of a file's full byte content.
///
/// Streams the file in 1MB chunks and returns the 64-character hex digest.
/// Any open or read failure is an IO error; the caller skips cataloging
/// that file rather than aborting the scan.
pub fn compute_fingerprint(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;

    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
