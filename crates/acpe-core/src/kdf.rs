//! Password-based key derivation.
//!
//! Argon2id stretches the password into a 32-byte master secret, which is
//! then expanded with the policy's hash into a content key and a separate
//! key-check value. The key check lets a wrong password be told apart from a
//! tampered ciphertext without exposing the content key.

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::policy::HashAlgorithm;

/// Salt length for password-derived keys.
pub const SALT_LEN: usize = 16;

/// Length of the key-check value.
pub const KEY_CHECK_LEN: usize = 32;

const CONTENT_KEY_INFO: &str = "acpe-kdf-v1:content-key";
const KEY_CHECK_INFO: &str = "acpe-kdf-v1:key-check";

/// Argon2id cost parameters. Stored with every password-derived payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    pub(crate) fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, Some(32))
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Keys derived from a password.
pub struct DerivedKeys {
    pub content_key: Zeroizing<Vec<u8>>,
    pub key_check: [u8; KEY_CHECK_LEN],
}

/// Generate a fresh random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive the content key (of `key_len` bytes) and key check from a password.
pub fn derive_keys(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
    hash: HashAlgorithm,
    key_len: usize,
) -> Result<DerivedKeys> {
    let mut master = Zeroizing::new([0u8; 32]);
    params
        .argon2()?
        .hash_password_into(password, salt, &mut *master)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut content_key = Zeroizing::new(vec![0u8; key_len]);
    let mut key_check = [0u8; KEY_CHECK_LEN];
    expand(hash, salt, &*master, CONTENT_KEY_INFO, &mut content_key[..])?;
    expand(hash, salt, &*master, KEY_CHECK_INFO, &mut key_check)?;

    Ok(DerivedKeys {
        content_key,
        key_check,
    })
}

fn expand(hash: HashAlgorithm, salt: &[u8], ikm: &[u8], info: &str, out: &mut [u8]) -> Result<()> {
    match hash {
        HashAlgorithm::Sha256 => Hkdf::<Sha256>::new(Some(salt), ikm)
            .expand(info.as_bytes(), out)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string())),
        HashAlgorithm::Sha512 => Hkdf::<Sha512>::new(Some(salt), ikm)
            .expand(info.as_bytes(), out)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string())),
        HashAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new_derive_key(info);
            hasher.update(salt);
            hasher.update(ikm);
            hasher.finalize_xof().fill(out);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let salt = [3u8; SALT_LEN];
        let a = derive_keys(b"pw", &salt, &fast(), HashAlgorithm::Sha256, 32).unwrap();
        let b = derive_keys(b"pw", &salt, &fast(), HashAlgorithm::Sha256, 32).unwrap();
        assert_eq!(*a.content_key, *b.content_key);
        assert_eq!(a.key_check, b.key_check);
    }

    #[test]
    fn test_key_check_differs_from_content_key() {
        let salt = generate_salt();
        let k = derive_keys(b"pw", &salt, &fast(), HashAlgorithm::Sha512, 32).unwrap();
        assert_ne!(&k.content_key[..], &k.key_check[..]);
    }

    #[test]
    fn test_wrong_password_changes_keys() {
        let salt = generate_salt();
        for hash in [HashAlgorithm::Sha256, HashAlgorithm::Sha512, HashAlgorithm::Blake3] {
            let a = derive_keys(b"right", &salt, &fast(), hash, 16).unwrap();
            let b = derive_keys(b"wrong", &salt, &fast(), hash, 16).unwrap();
            assert_eq!(a.content_key.len(), 16);
            assert_ne!(a.key_check, b.key_check);
        }
    }

    #[test]
    fn test_bad_params_rejected() {
        let params = KdfParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        let err = derive_keys(b"pw", &[0u8; SALT_LEN], &params, HashAlgorithm::Sha256, 32);
        assert!(matches!(err, Err(CryptoError::KeyDerivation(_))));
    }
}
