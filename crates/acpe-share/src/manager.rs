//! The share manager: issuance, inspection, consumption and sweep.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use acpe_core::{
    merkle_root, Clock, CryptoError, CryptoPolicy, CryptoService, SensitivityLevel, ShareArtifact,
    ShareState, ShareToken, DEFAULT_MERKLE_CHUNK_SIZE, HOUR_MILLIS,
};
use acpe_store::{CasResult, InsertResult, Store};

use crate::error::{Result, ShareError};
use crate::locks::TokenLocks;
use crate::password::{hash_password, verify_password};
use crate::token::generate_token;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for share issuance and consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Prefix for public share URLs. The token is appended as a path segment.
    pub base_url: String,
    /// Random bytes per token.
    pub token_bytes: usize,
    /// How long a consumer waits for a busy token.
    pub lock_timeout_ms: u64,
    /// Chunk size for the ciphertext Merkle root.
    pub merkle_chunk_size: u32,
    /// Token collisions tolerated before giving up.
    pub max_token_attempts: u32,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/share".into(),
            token_bytes: 32,
            lock_timeout_ms: 5_000,
            merkle_chunk_size: DEFAULT_MERKLE_CHUNK_SIZE as u32,
            max_token_attempts: 5,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / response types
// ─────────────────────────────────────────────────────────────────────────────

/// Optional gates on a new share.
#[derive(Clone, Default)]
pub struct ShareOptions {
    pub password: Option<String>,
    pub expiration_hours: Option<u32>,
    pub max_downloads: Option<u32>,
}

impl ShareOptions {
    fn validate(&self) -> Result<()> {
        if self.expiration_hours == Some(0) {
            return Err(ShareError::InvalidOptions(
                "expiration_hours must be at least 1".into(),
            ));
        }
        if self.max_downloads == Some(0) {
            return Err(ShareError::InvalidOptions(
                "max_downloads must be at least 1".into(),
            ));
        }
        if self.password.as_deref() == Some("") {
            return Err(ShareError::InvalidOptions("password must not be empty".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for ShareOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareOptions")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("expiration_hours", &self.expiration_hours)
            .field("max_downloads", &self.max_downloads)
            .finish()
    }
}

/// Descriptive data stored with a share.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareMetadata {
    pub filename: Option<String>,
    pub content_type: String,
    pub sensitivity_level: SensitivityLevel,
    pub confidence_score: f64,
}

/// What the creator gets back. Never carries ciphertext.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareTicket {
    pub token: ShareToken,
    pub share_url: String,
    pub sensitivity_level: SensitivityLevel,
    pub confidence_score: f64,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub max_downloads: Option<u32>,
    pub password_protected: bool,
}

/// Public, read-only view of a share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareInfo {
    pub state: ShareState,
    pub is_available: bool,
    pub filename: Option<String>,
    pub content_type: String,
    pub file_size: u64,
    pub sensitivity_level: SensitivityLevel,
    pub password_protected: bool,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub max_downloads: Option<u32>,
    pub download_count: u32,
    pub remaining_downloads: Option<u32>,
    /// Wrong or missing passwords presented for this token so far.
    pub failed_attempts: u32,
}

/// A successful consumption.
#[derive(Clone, PartialEq)]
pub struct ConsumedShare {
    pub content: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: String,
    pub sensitivity_level: SensitivityLevel,
    pub remaining_downloads: Option<u32>,
    pub state_after: ShareState,
}

impl fmt::Debug for ConsumedShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumedShare")
            .field("content_len", &self.content.len())
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("sensitivity_level", &self.sensitivity_level)
            .field("remaining_downloads", &self.remaining_downloads)
            .field("state_after", &self.state_after)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ShareManager
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the share lifecycle.
///
/// Counter writes on one token are serialized by a per-token lock and then
/// committed with a store-level version check, so a second process sharing
/// the store still cannot push `download_count` past `max_downloads`.
pub struct ShareManager<S: Store> {
    store: Arc<S>,
    crypto: CryptoService,
    clock: Arc<dyn Clock>,
    config: ShareConfig,
    locks: TokenLocks,
}

impl<S: Store + 'static> ShareManager<S> {
    pub fn new(
        store: Arc<S>,
        crypto: CryptoService,
        clock: Arc<dyn Clock>,
        config: ShareConfig,
    ) -> Self {
        let locks = TokenLocks::new(Duration::from_millis(config.lock_timeout_ms));
        Self {
            store,
            crypto,
            clock,
            config,
            locks,
        }
    }

    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    /// Public URL for a token.
    pub fn share_url(&self, token: &ShareToken) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), token)
    }

    /// Encrypt `content` under `policy` and persist it behind a fresh token.
    pub async fn create(
        &self,
        content: Vec<u8>,
        policy: &CryptoPolicy,
        metadata: ShareMetadata,
        options: ShareOptions,
    ) -> Result<ShareTicket> {
        options.validate()?;
        let now = self.clock.now_millis();
        let expires_at = options
            .expiration_hours
            .map(|hours| now.saturating_add(i64::from(hours) * HOUR_MILLIS));
        let file_size = content.len() as u64;

        let crypto = self.crypto.clone();
        let policy = policy.clone();
        let level = metadata.sensitivity_level;
        let password = options.password.clone();
        let chunk_size = self.config.merkle_chunk_size;

        let (payload, password_hash, root) = tokio::task::spawn_blocking(move || -> Result<_> {
            let password = password.as_deref().map(str::as_bytes);
            let payload = crypto.encrypt(&content, &policy, level, password)?;
            let password_hash = password
                .map(|pw| hash_password(pw, crypto.kdf_params()))
                .transpose()?;
            let root = merkle_root(&payload.ciphertext, chunk_size as usize)?;
            Ok((payload, password_hash, root))
        })
        .await
        .map_err(|e| ShareError::Task(e.to_string()))??;

        let mut artifact = ShareArtifact {
            token: generate_token(self.config.token_bytes),
            payload,
            filename: metadata.filename,
            content_type: metadata.content_type,
            file_size,
            password_hash,
            expires_at,
            max_downloads: options.max_downloads,
            download_count: 0,
            failed_attempts: 0,
            created_at: now,
            last_accessed_at: None,
            sensitivity_level: level,
            confidence_score: metadata.confidence_score,
            merkle_root: root,
            merkle_chunk_size: chunk_size,
            version: 0,
        };

        let attempts = self.config.max_token_attempts.max(1);
        for attempt in 1..=attempts {
            match self.store.insert_share(&artifact).await? {
                InsertResult::Inserted => {
                    info!(
                        token = artifact.token.redacted(),
                        level = %level,
                        expires_at,
                        max_downloads = artifact.max_downloads,
                        password = artifact.password_protected(),
                        "share created"
                    );
                    return Ok(ShareTicket {
                        share_url: self.share_url(&artifact.token),
                        token: artifact.token,
                        sensitivity_level: level,
                        confidence_score: artifact.confidence_score,
                        created_at: now,
                        expires_at,
                        max_downloads: artifact.max_downloads,
                        password_protected: artifact.password_hash.is_some(),
                    });
                }
                InsertResult::AlreadyExists => {
                    warn!(attempt, "share token collision, regenerating");
                    artifact.token = generate_token(self.config.token_bytes);
                }
            }
        }
        Err(ShareError::TokenCollision(attempts))
    }

    /// Read-only view of a share. No crypto, no counter changes.
    pub async fn get_info(&self, token: &ShareToken) -> Result<ShareInfo> {
        let share = self.load(token).await?;
        let state = share.state(self.clock.now_millis());
        Ok(ShareInfo {
            state,
            is_available: state == ShareState::Active,
            password_protected: share.password_protected(),
            remaining_downloads: share.remaining_downloads(),
            filename: share.filename,
            content_type: share.content_type,
            file_size: share.file_size,
            sensitivity_level: share.sensitivity_level,
            created_at: share.created_at,
            expires_at: share.expires_at,
            max_downloads: share.max_downloads,
            download_count: share.download_count,
            failed_attempts: share.failed_attempts,
        })
    }

    /// Download a share, spending one unit of its budget.
    pub async fn consume(
        &self,
        token: &ShareToken,
        password: Option<&str>,
    ) -> Result<ConsumedShare> {
        if !token.is_well_formed() {
            return Err(ShareError::NotFound);
        }
        let _guard = self.locks.acquire(token.as_str()).await?;
        let mut share = self.load(token).await?;
        let now = self.clock.now_millis();

        match share.state(now) {
            ShareState::Active => {}
            ShareState::Expired => {
                warn!(token = token.redacted(), "consume rejected: expired");
                return Err(ShareError::Expired);
            }
            ShareState::Exhausted => {
                warn!(token = token.redacted(), "consume rejected: exhausted");
                return Err(ShareError::Exhausted);
            }
        }

        if let Some(phc) = share.password_hash.clone() {
            let ok = match password {
                Some(pw) => {
                    let pw = pw.to_owned();
                    tokio::task::spawn_blocking(move || verify_password(pw.as_bytes(), &phc))
                        .await
                        .map_err(|e| ShareError::Task(e.to_string()))?
                }
                None => false,
            };
            if !ok {
                share.failed_attempts = share.failed_attempts.saturating_add(1);
                share.last_accessed_at = Some(now);
                self.commit(&share).await?;
                warn!(
                    token = token.redacted(),
                    failed_attempts = share.failed_attempts,
                    "consume rejected: bad password"
                );
                return Err(ShareError::Auth {
                    failed_attempts: share.failed_attempts,
                });
            }
        }

        let content = self.open(&share, password).await?;

        share.download_count += 1;
        share.last_accessed_at = Some(now);
        self.commit(&share).await?;

        let state_after = share.state(now);
        if state_after == ShareState::Exhausted {
            info!(token = token.redacted(), "share exhausted");
        } else {
            debug!(
                token = token.redacted(),
                download_count = share.download_count,
                "share consumed"
            );
        }

        Ok(ConsumedShare {
            content,
            filename: share.filename.clone(),
            content_type: share.content_type.clone(),
            sensitivity_level: share.sensitivity_level,
            remaining_downloads: share.remaining_downloads(),
            state_after,
        })
    }

    /// Delete shares that are expired or exhausted now.
    pub async fn purge_expired(&self) -> Result<usize> {
        let removed = self.store.purge_shares(self.clock.now_millis()).await?;
        if removed > 0 {
            info!(removed, "purged shares");
        }
        Ok(removed)
    }

    async fn load(&self, token: &ShareToken) -> Result<ShareArtifact> {
        if !token.is_well_formed() {
            return Err(ShareError::NotFound);
        }
        self.store
            .get_share(token)
            .await?
            .ok_or(ShareError::NotFound)
    }

    /// Verify the Merkle root and decrypt. Both checks run before any result is used.
    async fn open(&self, share: &ShareArtifact, password: Option<&str>) -> Result<Vec<u8>> {
        let crypto = self.crypto.clone();
        let payload = share.payload.clone();
        let expected_root = share.merkle_root;
        let chunk_size = share.merkle_chunk_size as usize;
        let password = password.map(str::to_owned);

        tokio::task::spawn_blocking(move || {
            let root_ok = merkle_root(&payload.ciphertext, chunk_size)
                .map(|root| root == expected_root)
                .unwrap_or(false);
            let decrypted = crypto.decrypt(&payload, password.as_deref().map(str::as_bytes));
            match decrypted {
                Ok(plaintext) if root_ok => Ok(plaintext),
                Ok(_) | Err(CryptoError::Auth) | Err(CryptoError::Integrity) => {
                    Err(ShareError::Integrity)
                }
                Err(e) => Err(ShareError::Crypto(e)),
            }
        })
        .await
        .map_err(|e| ShareError::Task(e.to_string()))?
        .map_err(|e| {
            if matches!(e, ShareError::Integrity) {
                warn!(token = share.token.redacted(), "share failed integrity check");
            }
            e
        })
    }

    async fn commit(&self, share: &ShareArtifact) -> Result<()> {
        match self.store.compare_and_swap_share(share, share.version).await? {
            CasResult::Swapped => Ok(()),
            CasResult::VersionMismatch { current } => {
                warn!(
                    token = share.token.redacted(),
                    expected = share.version,
                    current,
                    "share changed underneath us"
                );
                // The competing write may have spent the last download.
                let fresh = self.load(&share.token).await?;
                match fresh.state(self.clock.now_millis()) {
                    ShareState::Active => Err(ShareError::ConcurrentModification),
                    ShareState::Expired => Err(ShareError::Expired),
                    ShareState::Exhausted => Err(ShareError::Exhausted),
                }
            }
            CasResult::Missing => Err(ShareError::NotFound),
        }
    }
}
