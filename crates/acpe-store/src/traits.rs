//! Store trait: the abstract interface for engine persistence.
//!
//! This trait allows the engine to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use acpe_core::{AuditEntry, DataItem, DataItemId, ShareArtifact, ShareToken};

use crate::error::Result;

/// Result of inserting a record under a unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was inserted.
    Inserted,
    /// A record with the same key exists; nothing was written.
    AlreadyExists,
}

/// Result of a compare-and-swap write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasResult {
    /// The stored version matched and the record was replaced.
    Swapped,
    /// Someone else wrote first.
    VersionMismatch { current: u64 },
    /// No record under that key.
    Missing,
}

/// The Store trait: async interface for engine persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Unique inserts**: inserting under an existing key returns `AlreadyExists`
///   and never overwrites.
/// - **Share counters** change only through [`Store::compare_and_swap_share`].
/// - **Audit entries** are append-only.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Data Item Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a data item.
    async fn insert_data_item(&self, item: &DataItem) -> Result<InsertResult>;

    /// Get a data item by id.
    async fn get_data_item(&self, id: &DataItemId) -> Result<Option<DataItem>>;

    /// Delete a data item if it belongs to `owner`. Returns whether a row went away.
    async fn delete_data_item(&self, id: &DataItemId, owner: &str) -> Result<bool>;

    /// List the items owned by `owner`, oldest first.
    async fn list_data_items(&self, owner: &str) -> Result<Vec<DataItem>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Share Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new share. The token must be unused.
    async fn insert_share(&self, share: &ShareArtifact) -> Result<InsertResult>;

    /// Get a share by token.
    async fn get_share(&self, token: &ShareToken) -> Result<Option<ShareArtifact>>;

    /// Write a share's counters if its stored version is still `expected_version`.
    ///
    /// Only `download_count`, `failed_attempts` and `last_accessed_at` are
    /// mutable. On success the stored version becomes `expected_version + 1`,
    /// whatever `share.version` says.
    async fn compare_and_swap_share(
        &self,
        share: &ShareArtifact,
        expected_version: u64,
    ) -> Result<CasResult>;

    /// Delete shares that are expired or exhausted at `now`. Returns the count.
    async fn purge_shares(&self, now: i64) -> Result<usize>;

    // ─────────────────────────────────────────────────────────────────────────
    // Audit Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an audit entry.
    async fn append_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// Entries for `actor` with `timestamp >= since`, oldest first.
    async fn audit_since(&self, actor: &str, since: i64) -> Result<Vec<AuditEntry>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Origin Tracking (for risk scoring)
    // ─────────────────────────────────────────────────────────────────────────

    /// Remember that `principal` was seen from `origin`.
    ///
    /// Returns `true` the first time the pair is seen.
    async fn record_origin(&self, principal: &str, origin: &str, at: i64) -> Result<bool>;
}
