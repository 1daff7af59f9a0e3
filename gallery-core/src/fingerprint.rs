//! Content hasher: SHA-256 fingerprints of attachment bytes.

use sha2::{Digest, Sha256};

use crate::types::Fingerprint;

/// Fingerprint `bytes` as a lowercase hex SHA-256 digest.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut h = Sha256::new();
    h.update(bytes);
    Fingerprint(hex::encode(h.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bytes_give_equal_fingerprints() {
        assert_eq!(fingerprint(b"photo"), fingerprint(b"photo"));
        assert_ne!(fingerprint(b"photo"), fingerprint(b"photo2"));
    }

    #[test]
    fn digest_is_hex_sha256() {
        assert_eq!(
            fingerprint(b"").0,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fingerprint(b"abc").0.len(), 64);
    }
}
