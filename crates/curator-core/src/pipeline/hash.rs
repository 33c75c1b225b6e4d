//! Content hashing for catalog records.

use blake3::Hasher as Blake3Hasher;

/// BLAKE3 content hashing.
pub struct Hasher;

impl Hasher {
    /// Generate a BLAKE3 hash from an in-memory byte buffer.
    ///
    /// Sources are already read into memory for decoding, so hashing the
    /// same buffer avoids a second read.
    pub fn content_hash(data: &[u8]) -> String {
        let mut hasher = Blake3Hasher::new();
        hasher.update(data);
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable_hex() {
        let a = Hasher::content_hash(b"wallpaper");
        let b = Hasher::content_hash(b"wallpaper");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, Hasher::content_hash(b"wallpaper2"));
    }
}
