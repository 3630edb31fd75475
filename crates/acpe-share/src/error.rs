//! Error types for share operations.

use acpe_core::CryptoError;
use acpe_store::StoreError;
use thiserror::Error;

/// Errors that can occur during share operations.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Unknown or malformed token.
    #[error("share not found")]
    NotFound,

    /// The share's expiry time has passed.
    #[error("share has expired")]
    Expired,

    /// The download limit has been reached.
    #[error("share download limit reached")]
    Exhausted,

    /// Missing or wrong password.
    #[error("authentication failed ({failed_attempts} failed attempts)")]
    Auth { failed_attempts: u32 },

    /// Stored ciphertext failed verification. No plaintext is released.
    #[error("share integrity check failed")]
    Integrity,

    /// Lock wait timed out, or another writer got there first. Retryable.
    #[error("concurrent modification")]
    ConcurrentModification,

    /// Rejected share options.
    #[error("invalid share options: {0}")]
    InvalidOptions(String),

    /// Every generated token collided with an existing one.
    #[error("could not allocate a unique token after {0} attempts")]
    TokenCollision(u32),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Cryptographic configuration or KDF fault.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A blocking task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

/// Result type for share operations.
pub type Result<T> = std::result::Result<T, ShareError>;
