//! Chunked streaming encryption.
//!
//! Input is split into fixed-size chunks, each sealed as its own AEAD frame
//! (`ciphertext ‖ tag`). Frame nonces follow the STREAM construction:
//!
//! ```text
//! nonce = prefix (7 random bytes) ‖ counter (u32 BE) ‖ last-frame flag (1 byte)
//! ```
//!
//! Every frame but the last is full; the last is short (possibly empty), so
//! truncating or extending the stream breaks either a tag or the manifest.
//! Decryption verifies the whole stream before writing any plaintext.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use subtle::Choice;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::cipher::{
    open_detached, seal_detached, CryptoService, KeyMaterial, PayloadHeader, FORMAT_VERSION,
    NONCE_LEN, TAG_LEN,
};
use crate::crypto::{Ed25519PublicKey, Ed25519Signature};
use crate::error::{CryptoError, Result};
use crate::hash::{ct_eq, IntegrityHasher};
use crate::policy::CryptoPolicy;
use crate::types::SensitivityLevel;

/// Length of the random nonce prefix.
pub const NONCE_PREFIX_LEN: usize = 7;

/// Metadata needed to verify and decrypt a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamManifest {
    pub header: PayloadHeader,
    pub key_material: KeyMaterial,
    pub nonce_prefix: [u8; NONCE_PREFIX_LEN],
    pub chunk_size: u32,
    pub chunk_count: u64,
    pub plaintext_len: u64,
    /// Hash over the prefix, every frame, and the lengths.
    pub hash: Vec<u8>,
    pub signature: Option<Ed25519Signature>,
    pub signer: Option<Ed25519PublicKey>,
}

impl StreamManifest {
    /// Total bytes of sealed output.
    pub fn sealed_len(&self) -> u64 {
        self.plaintext_len + self.chunk_count * TAG_LEN as u64
    }

    fn frame_len(&self, index: u64) -> usize {
        let chunk = self.chunk_size as u64;
        if index + 1 < self.chunk_count {
            chunk as usize
        } else {
            (self.plaintext_len - chunk * (self.chunk_count - 1)) as usize
        }
    }

    fn check_shape(&self) -> Result<()> {
        if self.header.version != FORMAT_VERSION {
            return Err(CryptoError::Malformed(format!(
                "unsupported format version {}",
                self.header.version
            )));
        }
        if self.chunk_size == 0 {
            return Err(CryptoError::Malformed("zero chunk size".into()));
        }
        let expected = self.plaintext_len / self.chunk_size as u64 + 1;
        if self.chunk_count != expected || self.chunk_count > u32::MAX as u64 + 1 {
            return Err(CryptoError::Malformed("chunk count mismatch".into()));
        }
        Ok(())
    }
}

fn frame_nonce(prefix: &[u8; NONCE_PREFIX_LEN], counter: u64, last: bool) -> Result<[u8; NONCE_LEN]> {
    let counter = u32::try_from(counter)
        .map_err(|_| CryptoError::Malformed("stream exceeds frame counter".into()))?;
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..NONCE_PREFIX_LEN].copy_from_slice(prefix);
    nonce[NONCE_PREFIX_LEN..NONCE_LEN - 1].copy_from_slice(&counter.to_be_bytes());
    nonce[NONCE_LEN - 1] = last as u8;
    Ok(nonce)
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn finish_hash(mut hasher: IntegrityHasher, chunk_count: u64, plaintext_len: u64) -> Vec<u8> {
    hasher.update(&chunk_count.to_be_bytes());
    hasher.update(&plaintext_len.to_be_bytes());
    hasher.finalize()
}

impl CryptoService {
    /// Encrypt everything from `reader` into `writer` as sealed frames.
    pub fn encrypt_stream<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        policy: &CryptoPolicy,
        level: SensitivityLevel,
        password: Option<&[u8]>,
    ) -> Result<StreamManifest> {
        let (key, key_material) = self.new_content_key(policy, level, password)?;
        let header = PayloadHeader::for_policy(policy, level, password.is_some());
        let aad = header.to_bytes();
        let chunk_size = u32::try_from(self.chunk_size())
            .map_err(|_| CryptoError::UnsupportedPolicy("chunk size exceeds u32".into()))?;

        let mut nonce_prefix = [0u8; NONCE_PREFIX_LEN];
        OsRng.fill_bytes(&mut nonce_prefix);

        let mut hasher = IntegrityHasher::new(header.hash_algorithm);
        hasher.update(&nonce_prefix);

        let mut buf = Zeroizing::new(vec![0u8; chunk_size as usize]);
        let mut counter: u64 = 0;
        let mut plaintext_len: u64 = 0;

        loop {
            let n = read_full(&mut reader, &mut buf)?;
            let last = n < buf.len();
            let nonce = frame_nonce(&nonce_prefix, counter, last)?;
            let tag = seal_detached(header.algorithm, &key, &nonce, &aad, &mut buf[..n])?;

            writer.write_all(&buf[..n])?;
            writer.write_all(&tag)?;
            hasher.update(&buf[..n]);
            hasher.update(&tag);

            counter += 1;
            plaintext_len += n as u64;
            if last {
                break;
            }
        }
        writer.flush()?;

        let hash = finish_hash(hasher, counter, plaintext_len);
        let (signature, signer) = if header.signed {
            let (sig, pk) = self.sign_digest(&aad, &hash);
            (Some(sig), Some(pk))
        } else {
            (None, None)
        };

        debug!(
            chunks = counter,
            bytes = plaintext_len,
            level = %level,
            "encrypted stream"
        );

        Ok(StreamManifest {
            header,
            key_material,
            nonce_prefix,
            chunk_size,
            chunk_count: counter,
            plaintext_len,
            hash,
            signature,
            signer,
        })
    }

    /// Verify and decrypt a sealed stream into `writer`.
    ///
    /// The first pass checks the signature, hash, every tag and the stream
    /// length without emitting plaintext. Only a fully verified stream is
    /// decrypted on the second pass. Returns the number of plaintext bytes
    /// written.
    pub fn decrypt_stream<R: Read + Seek, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        manifest: &StreamManifest,
        password: Option<&[u8]>,
    ) -> Result<u64> {
        manifest.check_shape()?;
        let header = manifest.header;
        let aad = header.to_bytes();
        let recovered = self.recover_key(&header, &manifest.key_material, password)?;
        let start = reader.stream_position()?;

        // Pass 1: verify.
        let mut hasher = IntegrityHasher::new(header.hash_algorithm);
        hasher.update(&manifest.nonce_prefix);
        let mut frames_ok = Choice::from(1);
        let mut scratch = Zeroizing::new(vec![0u8; manifest.chunk_size as usize]);
        let mut tag = [0u8; TAG_LEN];

        for index in 0..manifest.chunk_count {
            let len = manifest.frame_len(index);
            let last = index + 1 == manifest.chunk_count;
            let frame = &mut scratch[..len];
            if read_full(&mut reader, frame)? != len || read_full(&mut reader, &mut tag)? != TAG_LEN
            {
                frames_ok = Choice::from(0);
                break;
            }
            hasher.update(frame);
            hasher.update(&tag);
            let nonce = frame_nonce(&manifest.nonce_prefix, index, last)?;
            let ok = open_detached(header.algorithm, &recovered.key, &nonce, &aad, frame, &tag);
            frames_ok &= Choice::from(ok as u8);
        }

        let mut trailing = [0u8; 1];
        let extended = read_full(&mut reader, &mut trailing)? != 0;
        frames_ok &= Choice::from((!extended) as u8);

        let hash = finish_hash(hasher, manifest.chunk_count, manifest.plaintext_len);
        let hash_ok = ct_eq(&hash, &manifest.hash);
        let sig_ok =
            self.check_signature(&header, &aad, &manifest.hash, manifest.signature.as_ref());

        if !bool::from(recovered.auth_ok) {
            warn!("stream rejected: authentication");
            return Err(CryptoError::Auth);
        }
        if !bool::from(frames_ok & hash_ok & sig_ok & recovered.unwrap_ok) {
            warn!(extended, "stream rejected: integrity");
            return Err(CryptoError::Integrity);
        }

        // Pass 2: decrypt.
        reader.seek(SeekFrom::Start(start))?;
        let mut written: u64 = 0;
        for index in 0..manifest.chunk_count {
            let len = manifest.frame_len(index);
            let last = index + 1 == manifest.chunk_count;
            let frame = &mut scratch[..len];
            reader.read_exact(frame)?;
            reader.read_exact(&mut tag)?;
            let nonce = frame_nonce(&manifest.nonce_prefix, index, last)?;
            // The source changed between passes.
            if !open_detached(header.algorithm, &recovered.key, &nonce, &aad, frame, &tag) {
                return Err(CryptoError::Integrity);
            }
            writer.write_all(frame)?;
            written += len as u64;
        }
        writer.flush()?;

        Ok(written)
    }
}
