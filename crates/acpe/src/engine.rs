//! The Engine: unified API for the adaptive crypto policy engine.
//!
//! The Engine brings together classification, policy resolution, crypto
//! execution, risk scoring, sharing and auditing behind one interface.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use acpe_core::{
    ActionKind, AuditAction, AuditEntry, ClassificationResult, Clock, CryptoService, DataItem,
    DataItemId, Ed25519PublicKey, Keypair, KeyWrapper, LocalKeyWrapper, MfaDecision,
    MfaRequirement, PolicyEngine, PolicyRegistry, PrincipalRole, Resolution, RiskAssessment,
    RiskContext, RiskScorer, SensitivityLevel, ShareToken, SystemClock, HOUR_MILLIS,
};
use acpe_share::{ShareInfo, ShareManager, ShareMetadata, ShareOptions};
use acpe_store::{InsertResult, Store, StoreError};

use crate::audit::{AuditFailure, AuditRecorder, AuditSink, StoreAuditSink};
use crate::classifier::{Classifier, PatternClassifier};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::mfa::{DenyAllMfa, MfaVerifier};

/// Actor recorded for share operations without an authenticated caller.
pub const ANONYMOUS: &str = "anonymous";

/// Actor recorded for maintenance operations.
pub const SYSTEM: &str = "system";

/// Window for the burst signal.
const BURST_WINDOW_MILLIS: i64 = 60_000;

// ─────────────────────────────────────────────────────────────────────────────
// Request / response types
// ─────────────────────────────────────────────────────────────────────────────

/// Who is calling, from where, and with which second factor.
#[derive(Clone)]
pub struct RequestContext {
    pub principal: String,
    pub role: PrincipalRole,
    pub origin: Option<String>,
    pub mfa_code: Option<String>,
}

impl RequestContext {
    pub fn new(principal: impl Into<String>, role: PrincipalRole) -> Self {
        Self {
            principal: principal.into(),
            role,
            origin: None,
            mfa_code: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_mfa_code(mut self, code: impl Into<String>) -> Self {
        self.mfa_code = Some(code.into());
        self
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("principal", &self.principal)
            .field("role", &self.role)
            .field("origin", &self.origin)
            .field("mfa_code", &self.mfa_code.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A stored item opened for its owner.
#[derive(Clone, PartialEq)]
pub struct DecryptedItem {
    pub id: DataItemId,
    pub plaintext: Vec<u8>,
    pub sensitivity_level: SensitivityLevel,
    pub hash_verified: bool,
    pub signature_verified: bool,
}

impl fmt::Debug for DecryptedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedItem")
            .field("id", &self.id)
            .field("plaintext_len", &self.plaintext.len())
            .field("sensitivity_level", &self.sensitivity_level)
            .field("hash_verified", &self.hash_verified)
            .field("signature_verified", &self.signature_verified)
            .finish()
    }
}

/// Content to publish behind a share link.
#[derive(Debug, Clone)]
pub struct ShareRequest {
    pub content: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: String,
    pub options: ShareOptions,
}

/// Returned to a share's creator.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareReceipt {
    pub token: ShareToken,
    pub share_url: String,
    pub sensitivity_level: SensitivityLevel,
    pub confidence_score: f64,
    pub expires_at: Option<i64>,
    pub max_downloads: Option<u32>,
    pub password_protected: bool,
}

/// Returned to a share's consumer.
#[derive(Clone, PartialEq)]
pub struct SharedContent {
    pub content: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
    pub remaining_downloads: Option<u32>,
}

impl fmt::Debug for SharedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContent")
            .field("content_len", &self.content.len())
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .field("remaining_downloads", &self.remaining_downloads)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Assembles an [`Engine`]. Every collaborator except the store has a default.
pub struct EngineBuilder<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
    registry: Option<PolicyRegistry>,
    classifier: Option<Arc<dyn Classifier>>,
    mfa: Option<Arc<dyn MfaVerifier>>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    clock: Option<Arc<dyn Clock>>,
    signer: Option<Keypair>,
    key_wrapper: Option<Arc<dyn KeyWrapper>>,
}

impl<S: Store + 'static> EngineBuilder<S> {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(mut self, registry: PolicyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn mfa(mut self, mfa: Arc<dyn MfaVerifier>) -> Self {
        self.mfa = Some(mfa);
        self
    }

    /// Defaults to the engine's own store.
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Payload signing key. A fresh key is generated if unset.
    pub fn signer(mut self, signer: Keypair) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Wraps random content keys. A [`LocalKeyWrapper`] with a fresh master
    /// key is used if unset.
    pub fn key_wrapper(mut self, wrapper: Arc<dyn KeyWrapper>) -> Self {
        self.key_wrapper = Some(wrapper);
        self
    }

    pub fn build(self) -> Result<Engine<S>> {
        self.config.validate()?;

        let classifier: Arc<dyn Classifier> = match self.classifier {
            Some(c) => c,
            None => Arc::new(
                PatternClassifier::with_default_rules()
                    .map_err(|e| EngineError::Config(e.to_string()))?,
            ),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(c) => c,
            None => Arc::new(SystemClock),
        };
        let audit_sink: Arc<dyn AuditSink> = match self.audit_sink {
            Some(s) => s,
            None => Arc::new(StoreAuditSink::new(self.store.clone())),
        };
        let key_wrapper: Arc<dyn KeyWrapper> = match self.key_wrapper {
            Some(w) => w,
            None => Arc::new(LocalKeyWrapper::generate()),
        };
        let mfa: Arc<dyn MfaVerifier> = match self.mfa {
            Some(m) => m,
            None => Arc::new(DenyAllMfa),
        };

        let crypto = CryptoService::new(
            self.signer.unwrap_or_else(Keypair::generate),
            key_wrapper,
            self.config.kdf,
        )
        .with_chunk_size(self.config.chunk_size);

        let shares = ShareManager::new(
            self.store.clone(),
            crypto.clone(),
            clock.clone(),
            self.config.share.clone(),
        );

        Ok(Engine {
            policy: PolicyEngine::new(self.registry.unwrap_or_default(), self.config.policy),
            risk: RiskScorer::new(self.config.risk.clone()),
            mfa,
            audit: AuditRecorder::new(audit_sink),
            store: self.store,
            classifier,
            crypto,
            shares,
            clock,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// The main Engine struct.
///
/// Provides a unified API for:
/// - Classifying text
/// - Encrypting, opening and deleting stored data
/// - Creating, inspecting and consuming share links
/// - Risk-based MFA step-up and auditing across all of the above
pub struct Engine<S: Store> {
    store: Arc<S>,
    classifier: Arc<dyn Classifier>,
    policy: PolicyEngine,
    crypto: CryptoService,
    risk: RiskScorer,
    shares: ShareManager<S>,
    mfa: Arc<dyn MfaVerifier>,
    audit: AuditRecorder,
    clock: Arc<dyn Clock>,
}

impl<S: Store + 'static> Engine<S> {
    /// Start building an engine over `store`.
    pub fn builder(store: S) -> EngineBuilder<S> {
        Self::builder_shared(Arc::new(store))
    }

    /// Like [`Engine::builder`], for a store the caller keeps a handle to.
    pub fn builder_shared(store: Arc<S>) -> EngineBuilder<S> {
        EngineBuilder {
            store,
            config: EngineConfig::default(),
            registry: None,
            classifier: None,
            mfa: None,
            audit_sink: None,
            clock: None,
            signer: None,
            key_wrapper: None,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy_engine(&self) -> &PolicyEngine {
        &self.policy
    }

    /// Key that signs payloads for signature-required policies.
    pub fn signing_key(&self) -> Ed25519PublicKey {
        self.crypto.public_key()
    }

    /// Receive audit writes that failed from now on.
    pub fn subscribe_audit_failures(&self) -> broadcast::Receiver<AuditFailure> {
        self.audit.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Classification
    // ─────────────────────────────────────────────────────────────────────────

    /// Classify text. Never fails: if the classifier is unavailable the
    /// result is the most restrictive level with zero confidence.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        match self.classifier.classify(text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "classifier unavailable, applying most restrictive policy");
                ClassificationResult::fail_safe(e.to_string())
            }
        }
    }

    /// Classify on behalf of a caller. The request is scored and audited.
    pub async fn classify_as(
        &self,
        ctx: &RequestContext,
        text: &str,
    ) -> Result<ClassificationResult> {
        let result = self.classify(text).await;
        let assessment = self
            .assess(ctx, result.level, ActionKind::Classify, ctx.origin.as_deref())
            .await?;
        self.audit
            .record(self.entry(ctx, AuditAction::Classify).risk(assessment.score))
            .await;
        Ok(result)
    }

    /// Classify and resolve in one step.
    pub async fn resolve(&self, text: &str) -> (ClassificationResult, Resolution) {
        let classification = self.classify(text).await;
        let resolution = self.policy.resolve(&classification);
        (classification, resolution)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stored Data Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Classify, encrypt under the resolved policy, and store for `ctx.principal`.
    pub async fn encrypt_stored(&self, ctx: &RequestContext, text: &str) -> Result<DataItem> {
        let (classification, resolution) = self.resolve(text).await;
        let level = resolution.effective_level;
        let assessment = self
            .assess(ctx, level, ActionKind::Encrypt, ctx.origin.as_deref())
            .await?;
        let mfa = self
            .require_mfa(ctx, resolution.mfa, &assessment, AuditAction::Encrypt, None)
            .await?;

        let crypto = self.crypto.clone();
        let policy = resolution.policy.clone();
        let plaintext = text.as_bytes().to_vec();
        let payload = tokio::task::spawn_blocking(move || {
            crypto.encrypt(&plaintext, &policy, level, None)
        })
        .await
        .map_err(|e| EngineError::Task(e.to_string()))??;

        let item = DataItem {
            id: DataItemId::generate(),
            owner: ctx.principal.clone(),
            payload,
            sensitivity_level: level,
            confidence_score: classification.confidence,
            created_at: self.clock.now_millis(),
        };

        if self.store.insert_data_item(&item).await? == InsertResult::AlreadyExists {
            let msg = format!("duplicate data item id {}", item.id);
            return Err(StoreError::InvalidData(msg).into());
        }

        info!(
            id = %item.id,
            owner = %item.owner,
            %level,
            escalated = resolution.escalated,
            risk = assessment.score,
            "data item stored"
        );
        self.audit
            .record(
                self.entry(ctx, AuditAction::Encrypt)
                    .resource(item.id.to_hex())
                    .risk(assessment.score)
                    .mfa(mfa.decision.required, mfa.decision.stepped_up, mfa.completed),
            )
            .await;
        Ok(item)
    }

    /// Open one of the caller's stored items.
    pub async fn decrypt_stored(
        &self,
        ctx: &RequestContext,
        id: &DataItemId,
    ) -> Result<DecryptedItem> {
        let item = self.owned_item(ctx, id, AuditAction::Decrypt).await?;
        let requirement = self
            .policy
            .registry()
            .get(item.sensitivity_level)
            .mfa_required;
        let assessment = self
            .assess(
                ctx,
                item.sensitivity_level,
                ActionKind::Decrypt,
                ctx.origin.as_deref(),
            )
            .await?;
        let mfa = self
            .require_mfa(ctx, requirement, &assessment, AuditAction::Decrypt, Some(id))
            .await?;

        let crypto = self.crypto.clone();
        let payload = item.payload.clone();
        let outcome = tokio::task::spawn_blocking(move || crypto.decrypt_verified(&payload, None))
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?;

        let base = self
            .entry(ctx, AuditAction::Decrypt)
            .resource(id.to_hex())
            .risk(assessment.score)
            .mfa(mfa.decision.required, mfa.decision.stepped_up, mfa.completed);

        match outcome {
            Ok(decrypted) => {
                debug!(%id, "data item decrypted");
                self.audit.record(base).await;
                Ok(DecryptedItem {
                    id: *id,
                    plaintext: decrypted.plaintext,
                    sensitivity_level: item.sensitivity_level,
                    hash_verified: decrypted.hash_verified,
                    signature_verified: decrypted.signature_verified,
                })
            }
            Err(e) => {
                let err = EngineError::from(e);
                warn!(%id, error = %err, "stored item failed verification");
                self.audit.record(base.failed(err.to_string())).await;
                Err(err)
            }
        }
    }

    /// Delete one of the caller's stored items.
    pub async fn delete_stored(&self, ctx: &RequestContext, id: &DataItemId) -> Result<()> {
        if !self.store.delete_data_item(id, &ctx.principal).await? {
            self.audit
                .record(
                    self.entry(ctx, AuditAction::Delete)
                        .resource(id.to_hex())
                        .failed("not found"),
                )
                .await;
            return Err(EngineError::DataItemNotFound);
        }
        info!(%id, owner = %ctx.principal, "data item deleted");
        self.audit
            .record(self.entry(ctx, AuditAction::Delete).resource(id.to_hex()))
            .await;
        Ok(())
    }

    /// The caller's stored items, oldest first.
    pub async fn list_stored(&self, ctx: &RequestContext) -> Result<Vec<DataItem>> {
        Ok(self.store.list_data_items(&ctx.principal).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Share Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Classify `request.content` and publish it behind a new token.
    ///
    /// Authenticated creators go through the MFA gate; anonymous creation is
    /// scored and audited only.
    pub async fn create_share(
        &self,
        ctx: Option<&RequestContext>,
        request: ShareRequest,
    ) -> Result<ShareReceipt> {
        let (classification, resolution) = match std::str::from_utf8(&request.content) {
            Ok(text) => self.resolve(text).await,
            Err(_) => {
                // Replacement characters can split patterns, so never trust the verdict.
                let text = String::from_utf8_lossy(&request.content);
                let mut classification = self.classify(&text).await;
                classification.confidence = 0.0;
                classification.explanation =
                    format!("{}; content is not valid UTF-8", classification.explanation);
                let resolution = self.policy.resolve(&classification);
                (classification, resolution)
            }
        };
        let level = resolution.effective_level;

        let anonymous = RequestContext::new(ANONYMOUS, PrincipalRole::Guest);
        let caller = ctx.unwrap_or(&anonymous);
        let assessment = self
            .assess(caller, level, ActionKind::ShareCreate, caller.origin.as_deref())
            .await?;
        let mfa = match ctx {
            Some(ctx) => {
                self.require_mfa(ctx, resolution.mfa, &assessment, AuditAction::ShareCreate, None)
                    .await?
            }
            None => MfaOutcome::default(),
        };

        let base = self
            .entry(caller, AuditAction::ShareCreate)
            .risk(assessment.score)
            .mfa(mfa.decision.required, mfa.decision.stepped_up, mfa.completed);

        let created = self
            .shares
            .create(
                request.content,
                &resolution.policy,
                ShareMetadata {
                    filename: request.filename,
                    content_type: request.content_type,
                    sensitivity_level: level,
                    confidence_score: classification.confidence,
                },
                request.options,
            )
            .await;

        match created {
            Ok(ticket) => {
                self.audit
                    .record(base.resource(ticket.token.redacted()))
                    .await;
                Ok(ShareReceipt {
                    token: ticket.token,
                    share_url: ticket.share_url,
                    sensitivity_level: ticket.sensitivity_level,
                    confidence_score: ticket.confidence_score,
                    expires_at: ticket.expires_at,
                    max_downloads: ticket.max_downloads,
                    password_protected: ticket.password_protected,
                })
            }
            Err(e) => {
                let err = EngineError::from(e);
                self.audit.record(base.failed(err.to_string())).await;
                Err(err)
            }
        }
    }

    /// Public metadata for a share. No crypto, no counter changes.
    pub async fn get_share_info(&self, token: &str) -> Result<ShareInfo> {
        let token = ShareToken::new(token);
        let info = self.shares.get_info(&token).await;
        let entry = AuditEntry::new(self.clock.now_millis(), ANONYMOUS, AuditAction::ShareInfo)
            .resource(token.redacted());
        match info {
            Ok(info) => {
                self.audit.record(entry).await;
                Ok(info)
            }
            Err(e) => {
                let err = EngineError::from(e);
                self.audit.record(entry.failed(err.to_string())).await;
                Err(err)
            }
        }
    }

    /// Download a share.
    ///
    /// Consumption is anonymous, so risk is scored and recorded but never
    /// blocks the download.
    pub async fn consume_share(
        &self,
        token: &str,
        password: Option<&str>,
        origin: Option<&str>,
    ) -> Result<SharedContent> {
        let token = ShareToken::new(token);
        let (level, token_failures) = match self.shares.get_info(&token).await {
            Ok(info) => (info.sensitivity_level, info.failed_attempts),
            Err(_) => (SensitivityLevel::Public, 0),
        };

        let actor = origin.unwrap_or(ANONYMOUS);
        let caller = RequestContext::new(actor, PrincipalRole::Guest);
        let assessment = self
            .assess_with(&caller, level, ActionKind::ShareConsume, origin, token_failures)
            .await?;

        let base = AuditEntry::new(self.clock.now_millis(), actor, AuditAction::ShareConsume)
            .resource(token.redacted())
            .origin(origin)
            .risk(assessment.score);

        match self.shares.consume(&token, password).await {
            Ok(consumed) => {
                self.audit.record(base).await;
                Ok(SharedContent {
                    content: consumed.content,
                    content_type: consumed.content_type,
                    filename: consumed.filename,
                    remaining_downloads: consumed.remaining_downloads,
                })
            }
            Err(e) => {
                let err = EngineError::from(e);
                self.audit.record(base.failed(err.to_string())).await;
                Err(err)
            }
        }
    }

    /// Delete expired and exhausted shares.
    pub async fn purge_expired_shares(&self) -> Result<usize> {
        let removed = self.shares.purge_expired().await?;
        self.audit
            .record(
                AuditEntry::new(self.clock.now_millis(), SYSTEM, AuditAction::SharePurge)
                    .resource(removed.to_string()),
            )
            .await;
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    fn entry(&self, ctx: &RequestContext, action: AuditAction) -> AuditEntry {
        AuditEntry::new(self.clock.now_millis(), ctx.principal.clone(), action)
            .origin(ctx.origin.as_deref())
    }

    async fn owned_item(
        &self,
        ctx: &RequestContext,
        id: &DataItemId,
        action: AuditAction,
    ) -> Result<DataItem> {
        match self.store.get_data_item(id).await? {
            Some(item) if item.owner == ctx.principal => Ok(item),
            _ => {
                self.audit
                    .record(
                        self.entry(ctx, action)
                            .resource(id.to_hex())
                            .failed("not found"),
                    )
                    .await;
                Err(EngineError::DataItemNotFound)
            }
        }
    }

    /// Score a request from the caller's recent audit history and origin.
    async fn assess(
        &self,
        ctx: &RequestContext,
        level: SensitivityLevel,
        action: ActionKind,
        origin: Option<&str>,
    ) -> Result<RiskAssessment> {
        self.assess_with(ctx, level, action, origin, 0).await
    }

    /// Like `assess`, but failures already charged to the target resource
    /// count too. A guesser rotating origins still climbs on the token.
    async fn assess_with(
        &self,
        ctx: &RequestContext,
        level: SensitivityLevel,
        action: ActionKind,
        origin: Option<&str>,
        resource_failures: u32,
    ) -> Result<RiskAssessment> {
        let now = self.clock.now_millis();
        let new_origin = match origin {
            Some(origin) => self.store.record_origin(&ctx.principal, origin, now).await?,
            None => false,
        };

        let recent = self
            .store
            .audit_since(&ctx.principal, now - HOUR_MILLIS)
            .await?;
        let recent_failures =
            (recent.iter().filter(|e| !e.success).count() as u32).max(resource_failures);
        let recent_requests = recent
            .iter()
            .filter(|e| e.timestamp >= now - BURST_WINDOW_MILLIS)
            .count() as u32;

        let assessment = self.risk.score(&RiskContext {
            role: ctx.role,
            level,
            action,
            new_origin,
            recent_failures,
            recent_requests,
            at_millis: now,
        });
        debug!(
            principal = %ctx.principal,
            score = assessment.score,
            band = %assessment.band,
            "risk assessed"
        );
        Ok(assessment)
    }

    /// Apply the policy's MFA requirement under the current risk band.
    async fn require_mfa(
        &self,
        ctx: &RequestContext,
        requirement: MfaRequirement,
        assessment: &RiskAssessment,
        action: AuditAction,
        resource: Option<&DataItemId>,
    ) -> Result<MfaOutcome> {
        let decision = requirement.decide(assessment.band);
        if !decision.required {
            return Ok(MfaOutcome {
                decision,
                completed: false,
            });
        }

        let completed = match ctx.mfa_code.as_deref() {
            Some(code) => self.mfa.verify(&ctx.principal, code).await,
            None => false,
        };
        if completed {
            return Ok(MfaOutcome {
                decision,
                completed,
            });
        }

        warn!(
            principal = %ctx.principal,
            score = assessment.score,
            stepped_up = decision.stepped_up,
            "mfa required"
        );
        let mut entry = self
            .entry(ctx, action)
            .risk(assessment.score)
            .mfa(true, decision.stepped_up, false)
            .failed("mfa required");
        if let Some(id) = resource {
            entry = entry.resource(id.to_hex());
        }
        self.audit.record(entry).await;
        Err(EngineError::MfaRequired {
            risk_score: assessment.score,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct MfaOutcome {
    decision: MfaDecision,
    completed: bool,
}

impl Default for MfaOutcome {
    fn default() -> Self {
        Self {
            decision: MfaDecision {
                required: false,
                stepped_up: false,
            },
            completed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_secrets() {
        let ctx = RequestContext::new("alice", PrincipalRole::User).with_mfa_code("135790");
        let shown = format!("{ctx:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("135790"));

        let content = SharedContent {
            content: b"payroll".to_vec(),
            content_type: "text/plain".into(),
            filename: None,
            remaining_downloads: Some(0),
        };
        assert!(!format!("{content:?}").contains("payroll"));
    }
}
