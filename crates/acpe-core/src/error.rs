//! Error types for the policy engine core.

use thiserror::Error;

use crate::types::SensitivityLevel;

/// Errors produced while executing a crypto policy.
///
/// Decryption failures collapse into exactly two kinds, [`CryptoError::Auth`]
/// and [`CryptoError::Integrity`], so callers cannot learn which individual
/// check rejected a payload.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Missing or wrong password for a password-derived key.
    #[error("authentication failed")]
    Auth,

    /// Hash, signature, tag or key-unwrap mismatch.
    #[error("integrity check failed")]
    Integrity,

    /// The policy cannot be executed as written.
    #[error("unsupported policy: {0}")]
    UnsupportedPolicy(String),

    /// Key derivation failed (bad KDF parameters).
    #[error("key derivation error: {0}")]
    KeyDerivation(String),

    /// The key wrapping collaborator failed while sealing a key.
    #[error("key wrapping error: {0}")]
    KeyWrap(String),

    /// Malformed payload or stream manifest.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// I/O error while streaming.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    /// Whether this error is one of the two coarse decryption outcomes.
    pub fn is_rejection(&self) -> bool {
        matches!(self, CryptoError::Auth | CryptoError::Integrity)
    }
}

/// Errors raised while building or loading a policy registry.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The registry has no policy for a level.
    #[error("no policy registered for {0}")]
    MissingLevel(SensitivityLevel),

    /// A policy is internally inconsistent.
    #[error("invalid policy for {level}: {reason}")]
    InvalidPolicy {
        level: SensitivityLevel,
        reason: String,
    },

    /// A more sensitive level is protected more weakly than a lesser one.
    #[error("policy for {stronger} is weaker than policy for {weaker}")]
    NonMonotonic {
        weaker: SensitivityLevel,
        stronger: SensitivityLevel,
    },

    /// Configuration could not be parsed.
    #[error("policy configuration error: {0}")]
    Config(String),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
