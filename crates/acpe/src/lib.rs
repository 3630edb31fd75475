//! # ACPE
//!
//! The unified API for the adaptive crypto policy engine: data is classified,
//! the classification picks a crypto policy, and the policy decides how the
//! data is encrypted, hashed, signed, shared and who must pass MFA to touch it.
//!
//! ## Overview
//!
//! - **Classification**: Pattern rules map text to a [`core::SensitivityLevel`]
//!   with a confidence. An unavailable classifier fails safe to the most
//!   restrictive level.
//! - **Policy**: Low-confidence results escalate one level, so uncertainty
//!   never weakens protection.
//! - **Stored data**: Encrypted under the resolved policy, owned by a principal.
//! - **Shares**: One-time or limited links with expiry, download budgets and
//!   optional passwords. Budgets are never overspent under concurrency.
//! - **Risk**: Every request is scored; conditional MFA steps up when the
//!   score is high.
//! - **Audit**: Every operation is recorded. Audit failures never fail the
//!   operation and are broadcast to subscribers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use acpe::{Engine, RequestContext, ShareRequest};
//! use acpe::core::PrincipalRole;
//! use acpe::share::ShareOptions;
//! use acpe::store::SqliteStore;
//!
//! async fn example() -> acpe::Result<()> {
//!     let store = SqliteStore::open("acpe.db")?;
//!     let engine = Engine::builder(store).build()?;
//!
//!     let alice = RequestContext::new("alice", PrincipalRole::User);
//!     let item = engine.encrypt_stored(&alice, "quarterly numbers").await?;
//!     let opened = engine.decrypt_stored(&alice, &item.id).await?;
//!     assert_eq!(opened.plaintext, b"quarterly numbers");
//!
//!     let receipt = engine
//!         .create_share(
//!             Some(&alice),
//!             ShareRequest {
//!                 content: b"meeting notes".to_vec(),
//!                 filename: Some("notes.txt".into()),
//!                 content_type: "text/plain".into(),
//!                 options: ShareOptions {
//!                     expiration_hours: Some(24),
//!                     max_downloads: Some(1),
//!                     ..Default::default()
//!                 },
//!             },
//!         )
//!         .await?;
//!     let shared = engine
//!         .consume_share(receipt.token.as_str(), None, Some("203.0.113.7"))
//!         .await?;
//!     assert_eq!(shared.content, b"meeting notes");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `acpe::core` - Levels, policies, crypto execution, risk scoring
//! - `acpe::store` - Storage abstraction, memory and SQLite
//! - `acpe::share` - Share lifecycle

pub mod audit;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod mfa;

// Re-export component crates
pub use acpe_core as core;
pub use acpe_share as share;
pub use acpe_store as store;

pub use audit::{AuditFailure, AuditSink, AuditSinkError, StoreAuditSink};
pub use classifier::{
    default_rules, ClassificationRule, Classifier, ClassifierUnavailable, PatternClassifier,
};
pub use config::EngineConfig;
pub use engine::{
    DecryptedItem, Engine, EngineBuilder, RequestContext, ShareReceipt, ShareRequest,
    SharedContent,
};
pub use error::{EngineError, Result};
pub use mfa::{DenyAllMfa, MfaVerifier, StaticMfaCodes};

pub use acpe_core::{
    ClassificationResult, CryptoPolicy, PrincipalRole, RiskBand, SensitivityLevel, ShareState,
};
