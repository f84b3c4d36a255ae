//! Merged-source fingerprinting.
//!
//! The sandbox is recreated wholesale on any materially different merged
//! source; hosts compare fingerprints of successive documents to decide
//! whether a render actually needs a reload.

use sha2::{Digest, Sha256};

/// Stable content fingerprint of a rendered document (or any source text).
pub fn document_fingerprint(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(feature = "napi")]
use napi_derive::napi;

#[cfg(feature = "napi")]
#[napi]
pub fn document_fingerprint_native(source: String) -> String {
    document_fingerprint(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(document_fingerprint("abc"), document_fingerprint("abc"));
    }

    #[test]
    fn test_fingerprint_differs_on_change() {
        assert_ne!(document_fingerprint("abc"), document_fingerprint("abd"));
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = document_fingerprint("");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
