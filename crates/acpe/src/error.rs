//! Error types for the engine facade.

use acpe_core::{CryptoError, PolicyError};
use acpe_share::ShareError;
use acpe_store::StoreError;
use thiserror::Error;

use crate::classifier::ClassifierUnavailable;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The classifier could not answer. The engine recovers from this by
    /// applying the most restrictive policy, so callers never see it.
    #[error(transparent)]
    ClassificationUnavailable(#[from] ClassifierUnavailable),

    /// Hash, signature, tag or key-unwrap mismatch. No plaintext is released.
    #[error("integrity check failed")]
    Integrity,

    /// Missing or wrong password.
    #[error("authentication failed ({failed_attempts} failed attempts)")]
    Auth { failed_attempts: u32 },

    #[error("share not found")]
    ShareNotFound,

    #[error("share has expired")]
    ShareExpired,

    #[error("share download limit reached")]
    ShareExhausted,

    /// Lock timeout or lost compare-and-swap. Safe to retry.
    #[error("concurrent modification, retry")]
    ConcurrentModification,

    /// A second factor is required and was not supplied or did not verify.
    #[error("multi-factor authentication required (risk score {risk_score})")]
    MfaRequired { risk_score: u8 },

    /// Unknown id, or an id owned by someone else.
    #[error("data item not found")]
    DataItemNotFound,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Crypto configuration or KDF fault.
    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl From<CryptoError> for EngineError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Integrity => EngineError::Integrity,
            CryptoError::Auth => EngineError::Auth { failed_attempts: 0 },
            other => EngineError::Crypto(other),
        }
    }
}

impl From<ShareError> for EngineError {
    fn from(e: ShareError) -> Self {
        match e {
            ShareError::NotFound => EngineError::ShareNotFound,
            ShareError::Expired => EngineError::ShareExpired,
            ShareError::Exhausted => EngineError::ShareExhausted,
            ShareError::Auth { failed_attempts } => EngineError::Auth { failed_attempts },
            ShareError::Integrity => EngineError::Integrity,
            ShareError::ConcurrentModification | ShareError::TokenCollision(_) => {
                EngineError::ConcurrentModification
            }
            ShareError::InvalidOptions(msg) => EngineError::InvalidRequest(msg),
            ShareError::Store(e) => EngineError::Store(e),
            ShareError::Crypto(e) => e.into(),
            ShareError::Task(msg) => EngineError::Task(msg),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
