//! Persisted records: stored data items, share artifacts, audit entries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cipher::EncryptedPayload;
use crate::merkle::NodeHash;
use crate::types::{DataItemId, SensitivityLevel, ShareToken};

// ─────────────────────────────────────────────────────────────────────────────
// DataItem
// ─────────────────────────────────────────────────────────────────────────────

/// Encrypted data owned by an authenticated principal. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub id: DataItemId,
    pub owner: String,
    pub payload: EncryptedPayload,
    /// Level whose policy protected the payload.
    pub sensitivity_level: SensitivityLevel,
    pub confidence_score: f64,
    pub created_at: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// ShareArtifact
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a share. `Expired` and `Exhausted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareState {
    Active,
    Expired,
    Exhausted,
}

impl fmt::Display for ShareState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShareState::Active => "active",
            ShareState::Expired => "expired",
            ShareState::Exhausted => "exhausted",
        })
    }
}

/// An encrypted blob reachable through an opaque token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareArtifact {
    pub token: ShareToken,
    pub payload: EncryptedPayload,
    pub filename: Option<String>,
    pub content_type: String,
    /// Plaintext size in bytes.
    pub file_size: u64,
    /// Argon2id PHC string.
    pub password_hash: Option<String>,
    pub expires_at: Option<i64>,
    pub max_downloads: Option<u32>,
    pub download_count: u32,
    pub failed_attempts: u32,
    pub created_at: i64,
    pub last_accessed_at: Option<i64>,
    pub sensitivity_level: SensitivityLevel,
    pub confidence_score: f64,
    /// Root over the ciphertext split into `merkle_chunk_size` chunks.
    pub merkle_root: NodeHash,
    pub merkle_chunk_size: u32,
    /// Compare-and-swap stamp, bumped on every counter write.
    pub version: u64,
}

impl ShareArtifact {
    /// State at `now`. Expiry wins over exhaustion; `now == expires_at` is expired.
    pub fn state(&self, now: i64) -> ShareState {
        if self.expires_at.is_some_and(|at| now >= at) {
            ShareState::Expired
        } else if self
            .max_downloads
            .is_some_and(|max| self.download_count >= max)
        {
            ShareState::Exhausted
        } else {
            ShareState::Active
        }
    }

    pub fn is_available(&self, now: i64) -> bool {
        self.state(now) == ShareState::Active
    }

    /// Downloads left, or `None` when unlimited.
    pub fn remaining_downloads(&self) -> Option<u32> {
        self.max_downloads
            .map(|max| max.saturating_sub(self.download_count))
    }

    pub fn password_protected(&self) -> bool {
        self.password_hash.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuditEntry
// ─────────────────────────────────────────────────────────────────────────────

/// Audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Classify,
    Encrypt,
    Decrypt,
    Delete,
    ShareCreate,
    ShareInfo,
    ShareConsume,
    SharePurge,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Classify => "classify",
            AuditAction::Encrypt => "encrypt",
            AuditAction::Decrypt => "decrypt",
            AuditAction::Delete => "delete",
            AuditAction::ShareCreate => "share_create",
            AuditAction::ShareInfo => "share_info",
            AuditAction::ShareConsume => "share_consume",
            AuditAction::SharePurge => "share_purge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "classify" => AuditAction::Classify,
            "encrypt" => AuditAction::Encrypt,
            "decrypt" => AuditAction::Decrypt,
            "delete" => AuditAction::Delete,
            "share_create" => AuditAction::ShareCreate,
            "share_info" => AuditAction::ShareInfo,
            "share_consume" => AuditAction::ShareConsume,
            "share_purge" => AuditAction::SharePurge,
            _ => return None,
        })
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: i64,
    /// Principal, or `anonymous` for share consumers.
    pub actor: String,
    pub action: AuditAction,
    /// Data item id or redacted share token.
    pub resource: Option<String>,
    pub success: bool,
    pub risk_score: Option<u8>,
    pub mfa_required: bool,
    pub mfa_stepped_up: bool,
    pub mfa_completed: bool,
    pub ip_address: Option<String>,
    pub failure_reason: Option<String>,
}

impl AuditEntry {
    /// A successful entry with no optional fields set.
    pub fn new(timestamp: i64, actor: impl Into<String>, action: AuditAction) -> Self {
        Self {
            timestamp,
            actor: actor.into(),
            action,
            resource: None,
            success: true,
            risk_score: None,
            mfa_required: false,
            mfa_stepped_up: false,
            mfa_completed: false,
            ip_address: None,
            failure_reason: None,
        }
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn origin(mut self, ip: Option<&str>) -> Self {
        self.ip_address = ip.map(str::to_string);
        self
    }

    pub fn risk(mut self, score: u8) -> Self {
        self.risk_score = Some(score);
        self
    }

    pub fn mfa(mut self, required: bool, stepped_up: bool, completed: bool) -> Self {
        self.mfa_required = required;
        self.mfa_stepped_up = stepped_up;
        self.mfa_completed = completed;
        self
    }

    /// Mark the entry failed.
    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.success = false;
        self.failure_reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::tests::service;
    use crate::policy::PolicyRegistry;

    fn artifact(expires_at: Option<i64>, max: Option<u32>, count: u32) -> ShareArtifact {
        let level = SensitivityLevel::Public;
        let payload = service()
            .encrypt(b"x", PolicyRegistry::default().get(level), level, None)
            .unwrap();
        ShareArtifact {
            token: ShareToken::new("t".repeat(43)),
            payload,
            filename: None,
            content_type: "text/plain".into(),
            file_size: 1,
            password_hash: None,
            expires_at,
            max_downloads: max,
            download_count: count,
            failed_attempts: 0,
            created_at: 0,
            last_accessed_at: None,
            sensitivity_level: level,
            confidence_score: 1.0,
            merkle_root: [0u8; 32],
            merkle_chunk_size: 4096,
            version: 0,
        }
    }

    #[test]
    fn test_state_active() {
        let a = artifact(Some(1_000), Some(2), 1);
        assert_eq!(a.state(999), ShareState::Active);
        assert_eq!(a.remaining_downloads(), Some(1));
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let a = artifact(Some(1_000), None, 0);
        assert_eq!(a.state(1_000), ShareState::Expired);
        assert_eq!(a.remaining_downloads(), None);
    }

    #[test]
    fn test_expired_beats_exhausted() {
        let a = artifact(Some(1_000), Some(1), 1);
        assert_eq!(a.state(500), ShareState::Exhausted);
        assert_eq!(a.state(2_000), ShareState::Expired);
    }

    #[test]
    fn test_no_limits_stays_active() {
        let a = artifact(None, None, 10_000);
        assert!(a.is_available(i64::MAX));
    }

    #[test]
    fn test_audit_builder() {
        let e = AuditEntry::new(5, "alice", AuditAction::Decrypt)
            .resource("abc")
            .risk(70)
            .mfa(true, true, false)
            .failed("mfa required");
        assert!(!e.success);
        assert_eq!(e.risk_score, Some(70));
        assert!(e.mfa_stepped_up);
        assert_eq!(AuditAction::parse(e.action.as_str()), Some(AuditAction::Decrypt));
    }
}
