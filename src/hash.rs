// src/hash.rs

//! SHA-256 hashing for checksum verification and content addressing
//!
//! The engine uses a single hash algorithm throughout: recipe checksums,
//! the content cache's keys, and asset verification all speak SHA-256 hex.

use sha2::{Digest, Sha256};
use std::io::{self, Read};

/// Compute the SHA-256 hex digest of a byte slice.
pub fn sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 hex digest of a reader's contents, streaming.
pub fn sha256_reader<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// `true` iff `s` is a well-formed lowercase SHA-256 hex digest.
pub fn is_valid_sha256(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sha256_value() {
        let hash = sha256(b"Hello, World!");
        assert_eq!(hash, "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f");
    }

    #[test]
    fn reader_matches_bytes() {
        let data = b"Hello, World!";
        let mut cursor = std::io::Cursor::new(data);
        assert_eq!(sha256_reader(&mut cursor).unwrap(), sha256(data));
    }

    #[test]
    fn validates_hex_length() {
        assert!(is_valid_sha256(&"a".repeat(64)));
        assert!(!is_valid_sha256(&"a".repeat(63)));
        assert!(!is_valid_sha256("not-hex-at-all-xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"));
    }
}
