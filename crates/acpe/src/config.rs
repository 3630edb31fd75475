//! Engine configuration.

use serde::{Deserialize, Serialize};

use acpe_core::{KdfParams, PolicyConfig, RiskConfig, DEFAULT_CHUNK_SIZE};
use acpe_share::ShareConfig;

use crate::error::{EngineError, Result};

/// Everything tunable about the engine except the policy table itself.
///
/// Every field has a default, so a JSON document only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub policy: PolicyConfig,
    pub risk: RiskConfig,
    pub share: ShareConfig,
    pub kdf: KdfParams,
    /// Plaintext bytes per frame for streaming encryption.
    pub chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            risk: RiskConfig::default(),
            share: ShareConfig::default(),
            kdf: KdfParams::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(EngineError::Config("chunk_size must be positive".into()));
        }
        if self.share.merkle_chunk_size == 0 {
            return Err(EngineError::Config(
                "share.merkle_chunk_size must be positive".into(),
            ));
        }
        if self.risk.low_max >= self.risk.medium_max {
            return Err(EngineError::Config(
                "risk.low_max must be below risk.medium_max".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json(
            r#"{
                "policy": { "escalation_threshold": 0.7 },
                "share": { "base_url": "https://files.example.com/s", "token_bytes": 24 },
                "risk": { "burst_threshold": 5 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.policy.escalation_threshold, 0.7);
        assert_eq!(config.share.base_url, "https://files.example.com/s");
        assert_eq!(config.share.token_bytes, 24);
        assert_eq!(config.share.lock_timeout_ms, ShareConfig::default().lock_timeout_ms);
        assert_eq!(config.risk.burst_threshold, 5);
        assert_eq!(config.kdf, KdfParams::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "chunk_size": 0 }"#),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "risk": { "low_max": 70, "medium_max": 60 } }"#),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(EngineError::Config(_))
        ));
    }
}
