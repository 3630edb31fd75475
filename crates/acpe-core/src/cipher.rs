//! Policy execution: authenticated encryption, integrity hashing, signing.
//!
//! [`CryptoService`] is stateless per call. Every encryption uses a fresh
//! content key and a fresh random nonce; the payload header is bound as
//! associated data so algorithm or level fields cannot be swapped.
//!
//! Decryption evaluates every check (key check, key unwrap, hash, signature,
//! AEAD tag) before deciding. The result collapses into
//! [`CryptoError::Auth`] or [`CryptoError::Integrity`].

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::ChaCha20Poly1305;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::Choice;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::{signed_message, Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{CryptoError, Result};
use crate::hash::{ct_eq, digest_parts};
use crate::kdf::{self, KdfParams, KEY_CHECK_LEN, SALT_LEN};
use crate::keywrap::{KeyWrapper, WrappedKey};
use crate::policy::{CryptoPolicy, EncryptionAlgorithm, HashAlgorithm};
use crate::types::SensitivityLevel;

/// Current payload format version.
pub const FORMAT_VERSION: u8 = 1;

/// AEAD nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AEAD tag length in bytes.
pub const TAG_LEN: usize = 16;

const HEADER_MAGIC: &[u8; 4] = b"ACPE";

// ─────────────────────────────────────────────────────────────────────────────
// Payload types
// ─────────────────────────────────────────────────────────────────────────────

/// Authenticated header of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadHeader {
    pub version: u8,
    pub algorithm: EncryptionAlgorithm,
    pub hash_algorithm: HashAlgorithm,
    pub sensitivity_level: SensitivityLevel,
    pub signed: bool,
    /// Whether the content key is password-derived.
    pub password_protected: bool,
}

impl PayloadHeader {
    pub(crate) fn for_policy(
        policy: &CryptoPolicy,
        level: SensitivityLevel,
        password_protected: bool,
    ) -> Self {
        Self {
            version: FORMAT_VERSION,
            algorithm: policy.encryption_algorithm,
            hash_algorithm: policy.hash_algorithm,
            sensitivity_level: level,
            signed: policy.signature_required,
            password_protected,
        }
    }

    /// Fixed-layout encoding used as associated data and in signatures.
    pub fn to_bytes(&self) -> [u8; 10] {
        let mut out = [0u8; 10];
        out[..4].copy_from_slice(HEADER_MAGIC);
        out[4] = self.version;
        out[5] = self.algorithm.as_u8();
        out[6] = self.hash_algorithm.as_u8();
        out[7] = self.sensitivity_level.as_u8();
        out[8] = self.signed as u8;
        out[9] = self.password_protected as u8;
        out
    }
}

/// How the content key of a payload is recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyMaterial {
    /// Derived from a password with Argon2id.
    Password {
        salt: [u8; SALT_LEN],
        params: KdfParams,
        key_check: [u8; KEY_CHECK_LEN],
    },
    /// Random key sealed by a [`KeyWrapper`].
    Wrapped(WrappedKey),
}

/// Everything needed to reverse an encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub header: PayloadHeader,
    pub key_material: KeyMaterial,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
    /// Integrity hash over nonce, ciphertext and tag.
    pub hash: Vec<u8>,
    pub signature: Option<Ed25519Signature>,
    pub signer: Option<Ed25519PublicKey>,
}

/// Plaintext plus which optional checks ran.
#[derive(Debug)]
pub struct Decrypted {
    pub plaintext: Vec<u8>,
    pub hash_verified: bool,
    pub signature_verified: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// AEAD dispatch
// ─────────────────────────────────────────────────────────────────────────────

fn seal_with<C: AeadInPlace + KeyInit>(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buf: &mut [u8],
) -> Result<[u8; TAG_LEN]> {
    let cipher = C::new_from_slice(key)
        .map_err(|_| CryptoError::UnsupportedPolicy("content key length".into()))?;
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&nonce[..]), aad, buf)
        .map_err(|_| CryptoError::Malformed("plaintext too large".into()))?;
    let mut out = [0u8; TAG_LEN];
    out.copy_from_slice(&tag);
    Ok(out)
}

fn open_with<C: AeadInPlace + KeyInit>(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buf: &mut [u8],
    tag: &[u8; TAG_LEN],
) -> bool {
    let Ok(cipher) = C::new_from_slice(key) else {
        return false;
    };
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&nonce[..]),
            aad,
            buf,
            GenericArray::from_slice(&tag[..]),
        )
        .is_ok()
}

/// Encrypt `buf` in place, returning the detached tag.
pub(crate) fn seal_detached(
    algorithm: EncryptionAlgorithm,
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buf: &mut [u8],
) -> Result<[u8; TAG_LEN]> {
    match algorithm {
        EncryptionAlgorithm::Aes128Gcm => seal_with::<Aes128Gcm>(key, nonce, aad, buf),
        EncryptionAlgorithm::Aes256Gcm => seal_with::<Aes256Gcm>(key, nonce, aad, buf),
        EncryptionAlgorithm::ChaCha20Poly1305 => {
            seal_with::<ChaCha20Poly1305>(key, nonce, aad, buf)
        }
    }
}

/// Decrypt `buf` in place. Returns whether the tag verified.
pub(crate) fn open_detached(
    algorithm: EncryptionAlgorithm,
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buf: &mut [u8],
    tag: &[u8; TAG_LEN],
) -> bool {
    match algorithm {
        EncryptionAlgorithm::Aes128Gcm => open_with::<Aes128Gcm>(key, nonce, aad, buf, tag),
        EncryptionAlgorithm::Aes256Gcm => open_with::<Aes256Gcm>(key, nonce, aad, buf, tag),
        EncryptionAlgorithm::ChaCha20Poly1305 => {
            open_with::<ChaCha20Poly1305>(key, nonce, aad, buf, tag)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CryptoService
// ─────────────────────────────────────────────────────────────────────────────

/// Default streaming chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A content key recovered for decryption, plus the checks that produced it.
pub(crate) struct RecoveredKey {
    pub key: Zeroizing<Vec<u8>>,
    /// Password present and key check matched (always set for wrapped keys).
    pub auth_ok: Choice,
    /// Key unwrap succeeded (always set for password keys).
    pub unwrap_ok: Choice,
}

/// Executes crypto policies.
#[derive(Clone)]
pub struct CryptoService {
    signer: Keypair,
    wrapper: Arc<dyn KeyWrapper>,
    kdf: KdfParams,
    chunk_size: usize,
}

impl CryptoService {
    /// Create a service signing with `signer` and wrapping keys with `wrapper`.
    pub fn new(signer: Keypair, wrapper: Arc<dyn KeyWrapper>, kdf: KdfParams) -> Self {
        Self {
            signer,
            wrapper,
            kdf,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the streaming chunk size (minimum 1 byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The public key that verifies this service's signatures.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.signer.public_key()
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Encrypt `plaintext` under `policy`.
    ///
    /// With a password the content key is derived from it; otherwise a random
    /// key is generated and wrapped.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        policy: &CryptoPolicy,
        level: SensitivityLevel,
        password: Option<&[u8]>,
    ) -> Result<EncryptedPayload> {
        let (key, key_material) = self.new_content_key(policy, level, password)?;
        let header = PayloadHeader::for_policy(policy, level, password.is_some());
        let aad = header.to_bytes();

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let mut ciphertext = plaintext.to_vec();
        let tag = seal_detached(header.algorithm, &key, &nonce, &aad, &mut ciphertext)?;
        let hash = digest_parts(header.hash_algorithm, &[&nonce, &ciphertext, &tag]);

        let (signature, signer) = if header.signed {
            let msg = signed_message(&aad, &hash);
            (Some(self.signer.sign(&msg)), Some(self.signer.public_key()))
        } else {
            (None, None)
        };

        debug!(
            algorithm = %header.algorithm,
            level = %level,
            len = plaintext.len(),
            signed = header.signed,
            "encrypted payload"
        );

        Ok(EncryptedPayload {
            header,
            key_material,
            nonce,
            ciphertext,
            tag,
            hash,
            signature,
            signer,
        })
    }

    /// Decrypt a payload, returning only the plaintext.
    pub fn decrypt(&self, payload: &EncryptedPayload, password: Option<&[u8]>) -> Result<Vec<u8>> {
        self.decrypt_verified(payload, password).map(|d| d.plaintext)
    }

    /// Decrypt a payload and report which checks were performed.
    pub fn decrypt_verified(
        &self,
        payload: &EncryptedPayload,
        password: Option<&[u8]>,
    ) -> Result<Decrypted> {
        let header = payload.header;
        if header.version != FORMAT_VERSION {
            return Err(CryptoError::Malformed(format!(
                "unsupported format version {}",
                header.version
            )));
        }
        let aad = header.to_bytes();

        let recovered = self.recover_key(&header, &payload.key_material, password)?;

        let expected = digest_parts(
            header.hash_algorithm,
            &[&payload.nonce, &payload.ciphertext, &payload.tag],
        );
        let hash_ok = ct_eq(&expected, &payload.hash);
        let sig_ok = self.check_signature(&header, &aad, &payload.hash, payload.signature.as_ref());

        let mut buf = Zeroizing::new(payload.ciphertext.clone());
        let aead_ok = Choice::from(open_detached(
            header.algorithm,
            &recovered.key,
            &payload.nonce,
            &aad,
            &mut buf,
            &payload.tag,
        ) as u8);

        let integrity_ok = hash_ok & sig_ok & aead_ok & recovered.unwrap_ok;
        if !bool::from(recovered.auth_ok) {
            warn!(level = %header.sensitivity_level, "payload rejected: authentication");
            return Err(CryptoError::Auth);
        }
        if !bool::from(integrity_ok) {
            warn!(level = %header.sensitivity_level, "payload rejected: integrity");
            return Err(CryptoError::Integrity);
        }

        Ok(Decrypted {
            plaintext: std::mem::take(&mut *buf),
            hash_verified: true,
            signature_verified: header.signed,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared helpers (also used by streaming)
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn new_content_key(
        &self,
        policy: &CryptoPolicy,
        level: SensitivityLevel,
        password: Option<&[u8]>,
    ) -> Result<(Zeroizing<Vec<u8>>, KeyMaterial)> {
        policy
            .validate(level)
            .map_err(|e| CryptoError::UnsupportedPolicy(e.to_string()))?;
        let key_len = policy.encryption_algorithm.key_len();

        match password {
            Some(password) => {
                let salt = kdf::generate_salt();
                let derived =
                    kdf::derive_keys(password, &salt, &self.kdf, policy.hash_algorithm, key_len)?;
                Ok((
                    derived.content_key,
                    KeyMaterial::Password {
                        salt,
                        params: self.kdf,
                        key_check: derived.key_check,
                    },
                ))
            }
            None => {
                let mut key = Zeroizing::new(vec![0u8; key_len]);
                OsRng.fill_bytes(&mut key[..]);
                let wrapped = self.wrapper.wrap_key(&key)?;
                Ok((key, KeyMaterial::Wrapped(wrapped)))
            }
        }
    }

    pub(crate) fn recover_key(
        &self,
        header: &PayloadHeader,
        material: &KeyMaterial,
        password: Option<&[u8]>,
    ) -> Result<RecoveredKey> {
        let key_len = header.algorithm.key_len();

        match (material, header.password_protected) {
            (
                KeyMaterial::Password {
                    salt,
                    params,
                    key_check,
                },
                true,
            ) => {
                let Some(password) = password else {
                    return Ok(RecoveredKey {
                        key: Zeroizing::new(vec![0u8; key_len]),
                        auth_ok: Choice::from(0),
                        unwrap_ok: Choice::from(1),
                    });
                };
                let derived =
                    kdf::derive_keys(password, salt, params, header.hash_algorithm, key_len)?;
                Ok(RecoveredKey {
                    auth_ok: ct_eq(&derived.key_check, key_check),
                    key: derived.content_key,
                    unwrap_ok: Choice::from(1),
                })
            }
            (KeyMaterial::Wrapped(wrapped), false) => {
                let (key, unwrap_ok) = match self.wrapper.unwrap_key(wrapped) {
                    Ok(key) if key.len() == key_len => (key, 1),
                    _ => (Zeroizing::new(vec![0u8; key_len]), 0),
                };
                Ok(RecoveredKey {
                    key,
                    auth_ok: Choice::from(1),
                    unwrap_ok: Choice::from(unwrap_ok),
                })
            }
            _ => Err(CryptoError::Integrity),
        }
    }

    pub(crate) fn sign_digest(&self, aad: &[u8], hash: &[u8]) -> (Ed25519Signature, Ed25519PublicKey) {
        (
            self.signer.sign(&signed_message(aad, hash)),
            self.signer.public_key(),
        )
    }

    pub(crate) fn check_signature(
        &self,
        header: &PayloadHeader,
        aad: &[u8],
        hash: &[u8],
        signature: Option<&Ed25519Signature>,
    ) -> Choice {
        if !header.signed {
            return Choice::from(1);
        }
        let ok = signature
            .map(|sig| self.signer.public_key().verify(&signed_message(aad, hash), sig))
            .unwrap_or(false);
        Choice::from(ok as u8)
    }
}

impl std::fmt::Debug for CryptoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoService")
            .field("signer", &self.signer.public_key())
            .field("key_id", &self.wrapper.key_id())
            .field("kdf", &self.kdf)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
