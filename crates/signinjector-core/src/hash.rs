//! Content fingerprints for the before/after audit trail

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `bytes`
///
/// Used for change detection on the original and the signed document. It is
/// not a signature and proves nothing about who produced the bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
