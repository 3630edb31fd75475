//! # ACPE Core
//!
//! Pure primitives for the adaptive crypto policy engine: sensitivity levels,
//! crypto policies, policy execution, and risk scoring.
//!
//! This crate does no storage and no networking. The only I/O is the
//! `Read`/`Write` plumbing of streaming encryption.
//!
//! ## Key Types
//!
//! - [`PolicyRegistry`] - Validated level → [`CryptoPolicy`] table
//! - [`PolicyEngine`] - Classification → policy, with confidence escalation
//! - [`CryptoService`] - Executes a policy (AEAD, hash, signature, streaming)
//! - [`RiskScorer`] - Contextual 0–100 risk score
//! - [`ShareArtifact`] - Persisted share with its derived [`ShareState`]

pub mod cipher;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod kdf;
pub mod keywrap;
pub mod merkle;
pub mod policy;
pub mod records;
pub mod risk;
pub mod stream;
pub mod types;

pub use cipher::{
    CryptoService, Decrypted, EncryptedPayload, KeyMaterial, PayloadHeader, DEFAULT_CHUNK_SIZE,
};
pub use clock::{Clock, SystemClock, HOUR_MILLIS};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CryptoError, PolicyError};
pub use hash::IntegrityHasher;
pub use kdf::KdfParams;
pub use keywrap::{KeyWrapper, LocalKeyWrapper, WrappedKey};
pub use merkle::{merkle_root, MerkleProof, MerkleTree, DEFAULT_MERKLE_CHUNK_SIZE};
pub use policy::{
    AsymmetricAlgorithm, CryptoPolicy, EncryptionAlgorithm, HashAlgorithm, MfaDecision,
    MfaRequirement, PolicyConfig, PolicyEngine, PolicyRegistry, Resolution,
};
pub use records::{AuditAction, AuditEntry, DataItem, ShareArtifact, ShareState};
pub use risk::{
    ActionKind, PrincipalRole, RiskAssessment, RiskBand, RiskConfig, RiskContext, RiskScorer,
};
pub use stream::StreamManifest;
pub use types::{
    ClassificationResult, DataItemId, DetectedPattern, SensitivityLevel, Severity, ShareToken,
};
