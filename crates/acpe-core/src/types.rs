//! Strong type definitions for the policy engine.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How strongly a piece of data must be protected.
///
/// Variants are declared weakest first so the derived `Ord` matches the
/// required protection strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityLevel {
    Public,
    Internal,
    Confidential,
    HighlySensitive,
}

impl SensitivityLevel {
    /// All levels, weakest first.
    pub const ALL: [SensitivityLevel; 4] = [
        SensitivityLevel::Public,
        SensitivityLevel::Internal,
        SensitivityLevel::Confidential,
        SensitivityLevel::HighlySensitive,
    ];

    /// The most restrictive level.
    pub const MOST_RESTRICTIVE: SensitivityLevel = SensitivityLevel::HighlySensitive;

    /// The next stronger level, saturating at `HighlySensitive`.
    pub fn escalate(self) -> Self {
        match self {
            SensitivityLevel::Public => SensitivityLevel::Internal,
            SensitivityLevel::Internal => SensitivityLevel::Confidential,
            SensitivityLevel::Confidential | SensitivityLevel::HighlySensitive => {
                SensitivityLevel::HighlySensitive
            }
        }
    }

    /// Stable string form, as used in storage and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitivityLevel::Public => "public",
            SensitivityLevel::Internal => "internal",
            SensitivityLevel::Confidential => "confidential",
            SensitivityLevel::HighlySensitive => "highly_sensitive",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(SensitivityLevel::Public),
            "internal" => Some(SensitivityLevel::Internal),
            "confidential" => Some(SensitivityLevel::Confidential),
            "highly_sensitive" => Some(SensitivityLevel::HighlySensitive),
            _ => None,
        }
    }

    /// Compact tag used in authenticated headers.
    pub(crate) fn as_u8(&self) -> u8 {
        match self {
            SensitivityLevel::Public => 0,
            SensitivityLevel::Internal => 1,
            SensitivityLevel::Confidential => 2,
            SensitivityLevel::HighlySensitive => 3,
        }
    }
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a detected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A sensitive pattern found by a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// Pattern identifier, e.g. `ssn` or `financial_keywords`.
    pub pattern_type: String,
    /// Number of occurrences.
    pub count: usize,
    pub severity: Severity,
    /// Masked examples, never the raw match.
    pub examples: Vec<String>,
}

/// Output of one classify call. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub level: SensitivityLevel,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f64,
    pub detected_patterns: Vec<DetectedPattern>,
    pub explanation: String,
}

impl ClassificationResult {
    /// A result carrying only a level and confidence.
    pub fn new(level: SensitivityLevel, confidence: f64) -> Self {
        Self {
            level,
            confidence,
            detected_patterns: Vec::new(),
            explanation: String::new(),
        }
    }

    /// The fail-safe result used when no classifier answer is available.
    ///
    /// Zero confidence plus the most restrictive level always resolves to the
    /// strongest registered policy.
    pub fn fail_safe(reason: impl Into<String>) -> Self {
        Self {
            level: SensitivityLevel::MOST_RESTRICTIVE,
            confidence: 0.0,
            detected_patterns: Vec::new(),
            explanation: reason.into(),
        }
    }
}

/// A 128-bit random identifier for a stored data item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataItemId(pub [u8; 16]);

impl DataItemId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for DataItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataItemId({})", self.to_hex())
    }
}

impl fmt::Display for DataItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Opaque, URL-safe share token.
///
/// The token is the only secret needed to reach an unprotected share, so it
/// is never printed in full by `Debug`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareToken(String);

impl ShareToken {
    /// Wrap an existing token string without validation.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The full token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token only uses the base64url alphabet and has a sane length.
    pub fn is_well_formed(&self) -> bool {
        (22..=128).contains(&self.0.len())
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }

    /// First eight characters, safe for log lines.
    ///
    /// Tokens arrive from URLs unchecked, so the cut lands on a char boundary.
    pub fn redacted(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShareToken({}…)", self.redacted())
    }
}

impl fmt::Display for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShareToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
