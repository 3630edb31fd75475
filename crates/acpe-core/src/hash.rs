//! Incremental integrity hashing.

use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

use crate::policy::HashAlgorithm;

/// A running hash for one of the supported algorithms.
#[derive(Clone)]
pub enum IntegrityHasher {
    Sha256(Sha256),
    Sha512(Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl IntegrityHasher {
    /// Start a new hash.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => IntegrityHasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => IntegrityHasher::Sha512(Sha512::new()),
            HashAlgorithm::Blake3 => IntegrityHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    /// Feed bytes.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            IntegrityHasher::Sha256(h) => h.update(data),
            IntegrityHasher::Sha512(h) => h.update(data),
            IntegrityHasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Finish and return the digest.
    pub fn finalize(self) -> Vec<u8> {
        match self {
            IntegrityHasher::Sha256(h) => h.finalize().to_vec(),
            IntegrityHasher::Sha512(h) => h.finalize().to_vec(),
            IntegrityHasher::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }
}

/// One-shot digest over several parts.
pub fn digest_parts(algorithm: HashAlgorithm, parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = IntegrityHasher::new(algorithm);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

/// Constant-time equality. Length mismatch is unequal.
pub fn ct_eq(a: &[u8], b: &[u8]) -> subtle::Choice {
    a.ct_eq(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_sizes() {
        assert_eq!(digest_parts(HashAlgorithm::Sha256, &[b"x"]).len(), 32);
        assert_eq!(digest_parts(HashAlgorithm::Sha512, &[b"x"]).len(), 64);
        assert_eq!(digest_parts(HashAlgorithm::Blake3, &[b"x"]).len(), 32);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        for alg in [HashAlgorithm::Sha256, HashAlgorithm::Sha512, HashAlgorithm::Blake3] {
            let mut h = IntegrityHasher::new(alg);
            h.update(b"hello ");
            h.update(b"world");
            assert_eq!(h.finalize(), digest_parts(alg, &[b"hello world"]));
        }
    }

    #[test]
    fn test_known_sha256() {
        let d = digest_parts(HashAlgorithm::Sha256, &[b"abc"]);
        assert_eq!(
            hex::encode(d),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_ct_eq() {
        assert!(bool::from(ct_eq(b"abc", b"abc")));
        assert!(!bool::from(ct_eq(b"abc", b"abd")));
        assert!(!bool::from(ct_eq(b"abc", b"ab")));
    }
}
