//! Content digests for stored objects.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of an object body.
pub fn content_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_stability() {
        assert_eq!(content_digest(b"image"), content_digest(b"image"));
    }

    #[test]
    fn test_digest_different_content() {
        assert_ne!(content_digest(b"image-a"), content_digest(b"image-b"));
    }

    #[test]
    fn test_digest_format() {
        let digest = content_digest(b"");
        assert_eq!(digest, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
