//! Envelope key wrapping for payloads without a password.
//!
//! Each payload gets its own random content key. The content key is sealed
//! under a long-lived master key by a [`KeyWrapper`]; only the wrapped form
//! is stored.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

/// A content key sealed under a master key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Identifies the master key that sealed this key.
    pub key_id: String,
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

/// Seals and opens content keys.
pub trait KeyWrapper: Send + Sync {
    /// Identifier of the active master key.
    fn key_id(&self) -> &str;

    /// Seal a content key.
    fn wrap_key(&self, content_key: &[u8]) -> Result<WrappedKey>;

    /// Open a sealed content key.
    ///
    /// Any failure, including an unknown key id, is [`CryptoError::Integrity`].
    fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<Zeroizing<Vec<u8>>>;
}

/// ChaCha20-Poly1305 key wrapper holding the master key in process memory.
pub struct LocalKeyWrapper {
    key_id: String,
    master: Zeroizing<[u8; 32]>,
}

impl LocalKeyWrapper {
    /// Create a wrapper from an existing master key.
    pub fn new(key_id: impl Into<String>, master: [u8; 32]) -> Self {
        Self {
            key_id: key_id.into(),
            master: Zeroizing::new(master),
        }
    }

    /// Create a wrapper with a fresh random master key.
    pub fn generate() -> Self {
        let mut master = [0u8; 32];
        OsRng.fill_bytes(&mut master);
        let mut id = [0u8; 8];
        OsRng.fill_bytes(&mut id);
        Self::new(hex::encode(id), master)
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.master[..])
            .map_err(|e| CryptoError::KeyWrap(e.to_string()))
    }
}

impl KeyWrapper for LocalKeyWrapper {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn wrap_key(&self, content_key: &[u8]) -> Result<WrappedKey> {
        let mut nonce = [0u8; 12];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()?
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: content_key,
                    aad: self.key_id.as_bytes(),
                },
            )
            .map_err(|e| CryptoError::KeyWrap(e.to_string()))?;

        Ok(WrappedKey {
            key_id: self.key_id.clone(),
            nonce,
            ciphertext,
        })
    }

    fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<Zeroizing<Vec<u8>>> {
        if wrapped.key_id != self.key_id {
            return Err(CryptoError::Integrity);
        }
        self.cipher()?
            .decrypt(
                Nonce::from_slice(&wrapped.nonce),
                Payload {
                    msg: &wrapped.ciphertext,
                    aad: wrapped.key_id.as_bytes(),
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Integrity)
    }
}

impl fmt::Debug for LocalKeyWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeyWrapper")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap() {
        let wrapper = LocalKeyWrapper::generate();
        let key = [9u8; 32];
        let wrapped = wrapper.wrap_key(&key).unwrap();
        assert_ne!(wrapped.ciphertext[..32], key);
        assert_eq!(&wrapper.unwrap_key(&wrapped).unwrap()[..], &key);
    }

    #[test]
    fn test_foreign_wrapper_rejected() {
        let a = LocalKeyWrapper::new("k1", [1u8; 32]);
        let b = LocalKeyWrapper::new("k1", [2u8; 32]);
        let wrapped = a.wrap_key(&[5u8; 16]).unwrap();
        assert!(matches!(b.unwrap_key(&wrapped), Err(CryptoError::Integrity)));
    }

    #[test]
    fn test_unknown_key_id_rejected() {
        let wrapper = LocalKeyWrapper::new("k1", [1u8; 32]);
        let mut wrapped = wrapper.wrap_key(&[5u8; 16]).unwrap();
        wrapped.key_id = "k2".into();
        assert!(matches!(wrapper.unwrap_key(&wrapped), Err(CryptoError::Integrity)));
    }

    #[test]
    fn test_debug_hides_master_key() {
        let wrapper = LocalKeyWrapper::new("k1", [0xAB; 32]);
        let debug = format!("{:?}", wrapper);
        assert!(!debug.to_lowercase().contains("abab"));
    }
}
