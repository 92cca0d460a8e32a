// swcrv-aio/src/checksum.rs
use std::path::Path;

use sha2::{Digest, Sha256};
use swcrv_common::error::Result;
use tracing::debug;

/// Lowercase hex SHA-256 of a file, streamed through a buffered reader.
pub fn sha256_file(path: &Path) -> Result<String> {
    debug!("Hashing file: {}", path.display());
    let std_file = std::fs::File::open(path)?;
    let mut std_reader = std::io::BufReader::new(std_file);
    let mut hasher = Sha256::new();
    let bytes_copied = std::io::copy(&mut std_reader, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    debug!("Calculated SHA256: {} ({} bytes read)", actual, bytes_copied);
    Ok(actual)
}

/// Case-insensitive hex comparison. Not constant time: this guards integrity,
/// not a secret.
pub fn digests_match(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}
