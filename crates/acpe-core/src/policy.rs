//! Crypto policies and the level → policy mapping.
//!
//! A [`PolicyRegistry`] is built once and never mutated. [`PolicyEngine`]
//! turns a classifier answer into the policy that must be executed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::error::PolicyError;
use crate::risk::RiskBand;
use crate::types::{ClassificationResult, SensitivityLevel};

// ─────────────────────────────────────────────────────────────────────────────
// Algorithms
// ─────────────────────────────────────────────────────────────────────────────

/// Symmetric AEAD algorithm. All use a 96-bit nonce and a 128-bit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionAlgorithm {
    Aes128Gcm,
    Aes256Gcm,
    #[serde(rename = "chacha20_poly1305")]
    ChaCha20Poly1305,
}

impl EncryptionAlgorithm {
    /// Key size in bits.
    pub const fn key_size_bits(&self) -> u16 {
        match self {
            EncryptionAlgorithm::Aes128Gcm => 128,
            EncryptionAlgorithm::Aes256Gcm | EncryptionAlgorithm::ChaCha20Poly1305 => 256,
        }
    }

    /// Key size in bytes.
    pub const fn key_len(&self) -> usize {
        self.key_size_bits() as usize / 8
    }

    pub(crate) fn as_u8(&self) -> u8 {
        match self {
            EncryptionAlgorithm::Aes128Gcm => 1,
            EncryptionAlgorithm::Aes256Gcm => 2,
            EncryptionAlgorithm::ChaCha20Poly1305 => 3,
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EncryptionAlgorithm::Aes128Gcm => "AES-128-GCM",
            EncryptionAlgorithm::Aes256Gcm => "AES-256-GCM",
            EncryptionAlgorithm::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        };
        f.write_str(name)
    }
}

/// Integrity hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    /// Digest size in bits.
    pub const fn digest_bits(&self) -> u16 {
        match self {
            HashAlgorithm::Sha256 | HashAlgorithm::Blake3 => 256,
            HashAlgorithm::Sha512 => 512,
        }
    }

    pub(crate) fn as_u8(&self) -> u8 {
        match self {
            HashAlgorithm::Sha256 => 1,
            HashAlgorithm::Sha512 => 2,
            HashAlgorithm::Blake3 => 3,
        }
    }
}

/// Asymmetric signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsymmetricAlgorithm {
    Ed25519,
}

/// How strongly a policy demands a second factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaRequirement {
    None,
    /// Required only when the risk band is high.
    Conditional,
    Required,
}

/// Outcome of applying a risk band to an [`MfaRequirement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaDecision {
    pub required: bool,
    /// The risk score turned a conditional requirement into a hard one.
    pub stepped_up: bool,
}

impl MfaRequirement {
    /// Decide whether a second factor is needed for a request in `band`.
    pub fn decide(self, band: RiskBand) -> MfaDecision {
        match self {
            MfaRequirement::None => MfaDecision {
                required: false,
                stepped_up: false,
            },
            MfaRequirement::Required => MfaDecision {
                required: true,
                stepped_up: false,
            },
            MfaRequirement::Conditional => {
                let high = band == RiskBand::High;
                MfaDecision {
                    required: high,
                    stepped_up: high,
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CryptoPolicy
// ─────────────────────────────────────────────────────────────────────────────

/// The algorithm / key size / signature / MFA bundle bound to one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoPolicy {
    pub encryption_algorithm: EncryptionAlgorithm,
    pub key_size_bits: u16,
    pub hash_algorithm: HashAlgorithm,
    #[serde(default)]
    pub asymmetric_algorithm: Option<AsymmetricAlgorithm>,
    #[serde(default)]
    pub signature_required: bool,
    pub mfa_required: MfaRequirement,
    #[serde(default)]
    pub description: String,
}

impl CryptoPolicy {
    /// Check the policy is executable as written.
    pub fn validate(&self, level: SensitivityLevel) -> Result<(), PolicyError> {
        if self.key_size_bits != self.encryption_algorithm.key_size_bits() {
            return Err(PolicyError::InvalidPolicy {
                level,
                reason: format!(
                    "{} requires a {}-bit key, got {}",
                    self.encryption_algorithm,
                    self.encryption_algorithm.key_size_bits(),
                    self.key_size_bits
                ),
            });
        }
        if self.signature_required && self.asymmetric_algorithm.is_none() {
            return Err(PolicyError::InvalidPolicy {
                level,
                reason: "signature required without an asymmetric algorithm".into(),
            });
        }
        Ok(())
    }

    /// Whether `self` is at least as strong as `other` on every axis.
    pub fn at_least_as_strong_as(&self, other: &CryptoPolicy) -> bool {
        self.key_size_bits >= other.key_size_bits
            && self.hash_algorithm.digest_bits() >= other.hash_algorithm.digest_bits()
            && (self.signature_required || !other.signature_required)
            && self.mfa_required >= other.mfa_required
    }

    fn preset(
        encryption_algorithm: EncryptionAlgorithm,
        hash_algorithm: HashAlgorithm,
        signed: bool,
        mfa_required: MfaRequirement,
        description: &str,
    ) -> Self {
        Self {
            encryption_algorithm,
            key_size_bits: encryption_algorithm.key_size_bits(),
            hash_algorithm,
            asymmetric_algorithm: signed.then_some(AsymmetricAlgorithm::Ed25519),
            signature_required: signed,
            mfa_required,
            description: description.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PolicyRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Total, validated mapping from every level to its policy.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: [CryptoPolicy; 4],
}

impl PolicyRegistry {
    /// Build a registry, checking totality, consistency and monotonic strength.
    pub fn new(mut map: BTreeMap<SensitivityLevel, CryptoPolicy>) -> Result<Self, PolicyError> {
        let mut take = |level: SensitivityLevel| -> Result<CryptoPolicy, PolicyError> {
            let policy = map.remove(&level).ok_or(PolicyError::MissingLevel(level))?;
            policy.validate(level)?;
            Ok(policy)
        };

        let policies = [
            take(SensitivityLevel::Public)?,
            take(SensitivityLevel::Internal)?,
            take(SensitivityLevel::Confidential)?,
            take(SensitivityLevel::HighlySensitive)?,
        ];

        for pair in SensitivityLevel::ALL.windows(2) {
            let (weaker, stronger) = (pair[0], pair[1]);
            let lo = &policies[weaker.as_u8() as usize];
            let hi = &policies[stronger.as_u8() as usize];
            if !hi.at_least_as_strong_as(lo) {
                return Err(PolicyError::NonMonotonic { weaker, stronger });
            }
        }

        Ok(Self { policies })
    }

    /// Load a registry from a JSON object keyed by level name.
    ///
    /// ```json
    /// { "public": { "encryption_algorithm": "aes128_gcm", "key_size_bits": 128, ... }, ... }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let map: BTreeMap<SensitivityLevel, CryptoPolicy> =
            serde_json::from_str(json).map_err(|e| PolicyError::Config(e.to_string()))?;
        Self::new(map)
    }

    /// The policy for a level. Never fails once the registry exists.
    pub fn get(&self, level: SensitivityLevel) -> &CryptoPolicy {
        &self.policies[level.as_u8() as usize]
    }

    /// Iterate over `(level, policy)` pairs, weakest first.
    pub fn iter(&self) -> impl Iterator<Item = (SensitivityLevel, &CryptoPolicy)> {
        SensitivityLevel::ALL
            .into_iter()
            .map(move |level| (level, self.get(level)))
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        use EncryptionAlgorithm::*;
        use HashAlgorithm::*;

        Self {
            policies: [
                CryptoPolicy::preset(
                    Aes128Gcm,
                    Sha256,
                    false,
                    MfaRequirement::None,
                    "Basic encryption for public data",
                ),
                CryptoPolicy::preset(
                    Aes256Gcm,
                    Sha256,
                    false,
                    MfaRequirement::None,
                    "Standard encryption for internal data",
                ),
                CryptoPolicy::preset(
                    Aes256Gcm,
                    Sha512,
                    true,
                    MfaRequirement::Conditional,
                    "Strong encryption with signatures for confidential data",
                ),
                CryptoPolicy::preset(
                    Aes256Gcm,
                    Sha512,
                    true,
                    MfaRequirement::Required,
                    "Maximum protection for highly sensitive data",
                ),
            ],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PolicyEngine
// ─────────────────────────────────────────────────────────────────────────────

/// Default confidence below which the classified level is escalated.
pub const DEFAULT_ESCALATION_THRESHOLD: f64 = 0.5;

/// Policy-engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Confidence threshold in `[0, 1]`.
    pub escalation_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
        }
    }
}

/// Result of resolving a classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub policy: CryptoPolicy,
    pub classified_level: SensitivityLevel,
    /// Level whose policy was selected.
    pub effective_level: SensitivityLevel,
    pub escalated: bool,
    pub mfa: MfaRequirement,
}

/// Maps classifier output to the policy to execute.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    registry: PolicyRegistry,
    threshold: f64,
}

impl PolicyEngine {
    /// Create an engine over `registry`.
    ///
    /// The threshold is clamped to `[0, 1]`; a NaN threshold falls back to
    /// the default.
    pub fn new(registry: PolicyRegistry, config: PolicyConfig) -> Self {
        let threshold = if config.escalation_threshold.is_nan() {
            DEFAULT_ESCALATION_THRESHOLD
        } else {
            config.escalation_threshold.clamp(0.0, 1.0)
        };
        Self {
            registry,
            threshold,
        }
    }

    /// The registry backing this engine.
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// The effective escalation threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Resolve a classification into a policy. Pure and total.
    pub fn resolve(&self, result: &ClassificationResult) -> Resolution {
        let confident = result.confidence.is_finite() && result.confidence >= self.threshold;
        let effective_level = if confident {
            result.level
        } else {
            result.level.escalate()
        };
        let policy = self.registry.get(effective_level).clone();

        debug!(
            classified = %result.level,
            effective = %effective_level,
            confidence = result.confidence,
            "resolved crypto policy"
        );

        Resolution {
            mfa: policy.mfa_required,
            policy,
            classified_level: result.level,
            effective_level,
            escalated: effective_level != result.level,
        }
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(PolicyRegistry::default(), PolicyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn default_map() -> BTreeMap<SensitivityLevel, CryptoPolicy> {
        PolicyRegistry::default()
            .iter()
            .map(|(l, p)| (l, p.clone()))
            .collect()
    }

    #[test]
    fn test_default_table() {
        let reg = PolicyRegistry::default();
        let public = reg.get(SensitivityLevel::Public);
        assert_eq!(public.encryption_algorithm, EncryptionAlgorithm::Aes128Gcm);
        assert_eq!(public.key_size_bits, 128);
        assert!(!public.signature_required);

        let hs = reg.get(SensitivityLevel::HighlySensitive);
        assert_eq!(hs.encryption_algorithm, EncryptionAlgorithm::Aes256Gcm);
        assert_eq!(hs.hash_algorithm, HashAlgorithm::Sha512);
        assert!(hs.signature_required);
        assert_eq!(hs.mfa_required, MfaRequirement::Required);

        assert_eq!(
            reg.get(SensitivityLevel::Confidential).mfa_required,
            MfaRequirement::Conditional
        );
    }

    #[test]
    fn test_default_table_passes_validation() {
        assert!(PolicyRegistry::new(default_map()).is_ok());
    }

    #[test]
    fn test_missing_level_rejected() {
        let mut map = default_map();
        map.remove(&SensitivityLevel::Internal);
        assert!(matches!(
            PolicyRegistry::new(map),
            Err(PolicyError::MissingLevel(SensitivityLevel::Internal))
        ));
    }

    #[test]
    fn test_key_size_mismatch_rejected() {
        let mut map = default_map();
        map.get_mut(&SensitivityLevel::Public).unwrap().key_size_bits = 256;
        assert!(matches!(
            PolicyRegistry::new(map),
            Err(PolicyError::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn test_signature_without_algorithm_rejected() {
        let mut map = default_map();
        map.get_mut(&SensitivityLevel::HighlySensitive)
            .unwrap()
            .asymmetric_algorithm = None;
        assert!(matches!(
            PolicyRegistry::new(map),
            Err(PolicyError::InvalidPolicy {
                level: SensitivityLevel::HighlySensitive,
                ..
            })
        ));
    }

    #[test]
    fn test_non_monotonic_rejected() {
        let mut map = default_map();
        let weak = map[&SensitivityLevel::Public].clone();
        map.insert(SensitivityLevel::HighlySensitive, weak);
        assert!(matches!(
            PolicyRegistry::new(map),
            Err(PolicyError::NonMonotonic {
                weaker: SensitivityLevel::Confidential,
                stronger: SensitivityLevel::HighlySensitive,
            })
        ));
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::to_string(&default_map()).unwrap();
        let reg = PolicyRegistry::from_json(&json).unwrap();
        for (level, policy) in PolicyRegistry::default().iter() {
            assert_eq!(reg.get(level), policy);
        }

        assert!(matches!(
            PolicyRegistry::from_json("{not json"),
            Err(PolicyError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_confident_returns_registered_policy() {
        let engine = PolicyEngine::default();
        for level in SensitivityLevel::ALL {
            let res = engine.resolve(&ClassificationResult::new(level, 1.0));
            assert_eq!(&res.policy, engine.registry().get(level));
            assert_eq!(res.effective_level, level);
            assert!(!res.escalated);
        }
    }

    #[test]
    fn test_resolve_low_confidence_escalates() {
        let engine = PolicyEngine::default();
        let res = engine.resolve(&ClassificationResult::new(SensitivityLevel::Public, 0.3));
        assert_eq!(res.effective_level, SensitivityLevel::Internal);
        assert!(res.escalated);

        // Exactly at threshold is confident.
        let res = engine.resolve(&ClassificationResult::new(SensitivityLevel::Public, 0.5));
        assert!(!res.escalated);
    }

    #[test]
    fn test_resolve_nan_confidence_escalates() {
        let engine = PolicyEngine::default();
        let res = engine.resolve(&ClassificationResult::new(
            SensitivityLevel::Internal,
            f64::NAN,
        ));
        assert_eq!(res.effective_level, SensitivityLevel::Confidential);
    }

    #[test]
    fn test_fail_safe_resolves_to_strongest() {
        let engine = PolicyEngine::default();
        let res = engine.resolve(&ClassificationResult::fail_safe("classifier down"));
        assert_eq!(res.effective_level, SensitivityLevel::HighlySensitive);
        assert_eq!(res.mfa, MfaRequirement::Required);
    }

    #[test]
    fn test_threshold_is_clamped() {
        let engine = PolicyEngine::new(
            PolicyRegistry::default(),
            PolicyConfig {
                escalation_threshold: 7.0,
            },
        );
        assert_eq!(engine.threshold(), 1.0);
    }

    #[test]
    fn test_mfa_decide() {
        let d = MfaRequirement::Conditional.decide(RiskBand::High);
        assert!(d.required && d.stepped_up);
        let d = MfaRequirement::Conditional.decide(RiskBand::Medium);
        assert!(!d.required && !d.stepped_up);
        let d = MfaRequirement::Required.decide(RiskBand::Low);
        assert!(d.required && !d.stepped_up);
        assert!(!MfaRequirement::None.decide(RiskBand::High).required);
    }

    fn level_strategy() -> impl Strategy<Value = SensitivityLevel> {
        prop::sample::select(SensitivityLevel::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_low_confidence_never_weaker(level in level_strategy(), confidence in 0.0f64..0.5) {
            let engine = PolicyEngine::default();
            let res = engine.resolve(&ClassificationResult::new(level, confidence));
            prop_assert!(res.effective_level >= level);
            prop_assert!(res.policy.at_least_as_strong_as(engine.registry().get(level)));
        }

        #[test]
        fn prop_resolve_is_deterministic(level in level_strategy(), confidence in any::<f64>()) {
            let engine = PolicyEngine::default();
            let result = ClassificationResult::new(level, confidence);
            prop_assert_eq!(engine.resolve(&result), engine.resolve(&result));
        }
    }
}
