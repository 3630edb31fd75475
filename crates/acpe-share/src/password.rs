//! Argon2id password hashing for share gating.
//!
//! The PHC string gates access. Content keys are derived separately by the
//! crypto service, so a leaked hash does not decrypt the payload.

use acpe_core::{CryptoError, KdfParams};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::Result;

/// Hash a password into a PHC string using `params`.
pub fn hash_password(password: &[u8], params: &KdfParams) -> Result<String> {
    let argon = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
        .map(|p| Argon2::new(Algorithm::Argon2id, Version::V0x13, p))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    let salt =
        SaltString::encode_b64(&salt).map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let hash = argon
        .hash_password(password, &salt)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a PHC string. Malformed hashes never verify.
pub fn verify_password(password: &[u8], phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default().verify_password(password, &parsed).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acpe_testkit::fast_kdf;

    #[test]
    fn test_hash_and_verify() {
        let phc = hash_password(b"hunter2", &fast_kdf()).unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(verify_password(b"hunter2", &phc));
        assert!(!verify_password(b"hunter3", &phc));
        assert!(!verify_password(b"", &phc));
    }

    #[test]
    fn test_salted() {
        let a = hash_password(b"same", &fast_kdf()).unwrap();
        let b = hash_password(b"same", &fast_kdf()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_rejects() {
        assert!(!verify_password(b"anything", "not a phc string"));
    }
}
