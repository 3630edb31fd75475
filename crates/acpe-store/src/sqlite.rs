//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Encrypted payloads
//! are stored as CBOR blobs.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use acpe_core::{
    AuditAction, AuditEntry, Clock, DataItem, DataItemId, EncryptedPayload, SensitivityLevel,
    ShareArtifact, ShareToken, SystemClock,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{CasResult, InsertResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        migration::migrate(&mut conn, SystemClock.now_millis())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(format!("connection mutex: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

fn conversion_error(column: usize, ty: Type, msg: impl Into<String>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, ty, msg.into().into())
}

fn encode_payload(payload: &EncryptedPayload) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(payload, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_payload(bytes: &[u8]) -> rusqlite::Result<EncryptedPayload> {
    ciborium::from_reader(bytes).map_err(|e| conversion_error(0, Type::Blob, e.to_string()))
}

fn decode_level(s: &str) -> rusqlite::Result<SensitivityLevel> {
    SensitivityLevel::parse(s)
        .ok_or_else(|| conversion_error(0, Type::Text, format!("unknown level {s}")))
}

// Helper to convert a row to DataItem
fn row_to_data_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<DataItem> {
    let id_bytes: Vec<u8> = row.get("id")?;
    let id: [u8; 16] = id_bytes
        .try_into()
        .map_err(|_| conversion_error(0, Type::Blob, "id is not 16 bytes"))?;
    let level: String = row.get("sensitivity_level")?;
    let payload: Vec<u8> = row.get("payload")?;

    Ok(DataItem {
        id: DataItemId::from_bytes(id),
        owner: row.get("owner")?,
        payload: decode_payload(&payload)?,
        sensitivity_level: decode_level(&level)?,
        confidence_score: row.get("confidence_score")?,
        created_at: row.get("created_at")?,
    })
}

// Helper to convert a row to ShareArtifact
fn row_to_share(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShareArtifact> {
    let token: String = row.get("token")?;
    let payload: Vec<u8> = row.get("payload")?;
    let level: String = row.get("sensitivity_level")?;
    let root_bytes: Vec<u8> = row.get("merkle_root")?;
    let merkle_root: [u8; 32] = root_bytes
        .try_into()
        .map_err(|_| conversion_error(0, Type::Blob, "merkle root is not 32 bytes"))?;

    Ok(ShareArtifact {
        token: ShareToken::new(token),
        payload: decode_payload(&payload)?,
        filename: row.get("filename")?,
        content_type: row.get("content_type")?,
        file_size: row.get("file_size")?,
        password_hash: row.get("password_hash")?,
        expires_at: row.get("expires_at")?,
        max_downloads: row.get("max_downloads")?,
        download_count: row.get("download_count")?,
        failed_attempts: row.get("failed_attempts")?,
        created_at: row.get("created_at")?,
        last_accessed_at: row.get("last_accessed_at")?,
        sensitivity_level: decode_level(&level)?,
        confidence_score: row.get("confidence_score")?,
        merkle_root,
        merkle_chunk_size: row.get("merkle_chunk_size")?,
        version: row.get("version")?,
    })
}

// Helper to convert a row to AuditEntry
fn row_to_audit(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    let action: String = row.get("action")?;
    Ok(AuditEntry {
        timestamp: row.get("timestamp")?,
        actor: row.get("actor")?,
        action: AuditAction::parse(&action)
            .ok_or_else(|| conversion_error(0, Type::Text, format!("unknown action {action}")))?,
        resource: row.get("resource")?,
        success: row.get("success")?,
        risk_score: row.get("risk_score")?,
        mfa_required: row.get("mfa_required")?,
        mfa_stepped_up: row.get("mfa_stepped_up")?,
        mfa_completed: row.get("mfa_completed")?,
        ip_address: row.get("ip_address")?,
        failure_reason: row.get("failure_reason")?,
    })
}

const SHARE_COLUMNS: &str = "token, payload, filename, content_type, file_size, password_hash,
     expires_at, max_downloads, download_count, failed_attempts, created_at,
     last_accessed_at, sensitivity_level, confidence_score, merkle_root,
     merkle_chunk_size, version";

#[async_trait]
impl Store for SqliteStore {
    async fn insert_data_item(&self, item: &DataItem) -> Result<InsertResult> {
        let item = item.clone();
        let payload = encode_payload(&item.payload)?;

        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO data_items (
                    id, owner, sensitivity_level, confidence_score, payload, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    item.id.as_bytes().as_slice(),
                    item.owner,
                    item.sensitivity_level.as_str(),
                    item.confidence_score,
                    payload,
                    item.created_at,
                ],
            )?;
            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_data_item(&self, id: &DataItemId) -> Result<Option<DataItem>> {
        let id = *id;
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, owner, sensitivity_level, confidence_score, payload, created_at
                 FROM data_items WHERE id = ?1",
                params![id.as_bytes().as_slice()],
                row_to_data_item,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn delete_data_item(&self, id: &DataItemId, owner: &str) -> Result<bool> {
        let id = *id;
        let owner = owner.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "DELETE FROM data_items WHERE id = ?1 AND owner = ?2",
                params![id.as_bytes().as_slice(), owner],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn list_data_items(&self, owner: &str) -> Result<Vec<DataItem>> {
        let owner = owner.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner, sensitivity_level, confidence_score, payload, created_at
                 FROM data_items WHERE owner = ?1 ORDER BY created_at, rowid",
            )?;
            let items = stmt
                .query_map(params![owner], row_to_data_item)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(items)
        })
        .await
    }

    async fn insert_share(&self, share: &ShareArtifact) -> Result<InsertResult> {
        let share = share.clone();
        let payload = encode_payload(&share.payload)?;

        self.run(move |conn| {
            let changed = conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO shares ({SHARE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                ),
                params![
                    share.token.as_str(),
                    payload,
                    share.filename,
                    share.content_type,
                    share.file_size,
                    share.password_hash,
                    share.expires_at,
                    share.max_downloads,
                    share.download_count,
                    share.failed_attempts,
                    share.created_at,
                    share.last_accessed_at,
                    share.sensitivity_level.as_str(),
                    share.confidence_score,
                    share.merkle_root.as_slice(),
                    share.merkle_chunk_size,
                    share.version,
                ],
            )?;
            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_share(&self, token: &ShareToken) -> Result<Option<ShareArtifact>> {
        let token = token.as_str().to_string();
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {SHARE_COLUMNS} FROM shares WHERE token = ?1"),
                params![token],
                row_to_share,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn compare_and_swap_share(
        &self,
        share: &ShareArtifact,
        expected_version: u64,
    ) -> Result<CasResult> {
        let token = share.token.as_str().to_string();
        let download_count = share.download_count;
        let failed_attempts = share.failed_attempts;
        let last_accessed_at = share.last_accessed_at;

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE shares
                 SET download_count = ?1, failed_attempts = ?2, last_accessed_at = ?3,
                     version = ?4
                 WHERE token = ?5 AND version = ?6",
                params![
                    download_count,
                    failed_attempts,
                    last_accessed_at,
                    expected_version + 1,
                    token,
                    expected_version,
                ],
            )?;
            if changed == 1 {
                return Ok(CasResult::Swapped);
            }

            let current: Option<u64> = conn
                .query_row(
                    "SELECT version FROM shares WHERE token = ?1",
                    params![token],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(match current {
                Some(current) => CasResult::VersionMismatch { current },
                None => CasResult::Missing,
            })
        })
        .await
    }

    async fn purge_shares(&self, now: i64) -> Result<usize> {
        self.run(move |conn| {
            let removed = conn.execute(
                "DELETE FROM shares
                 WHERE (expires_at IS NOT NULL AND expires_at <= ?1)
                    OR (max_downloads IS NOT NULL AND download_count >= max_downloads)",
                params![now],
            )?;
            debug!(removed, now, "purged shares");
            Ok(removed)
        })
        .await
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        let e = entry.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO audit_log (
                    timestamp, actor, action, resource, success, risk_score,
                    mfa_required, mfa_stepped_up, mfa_completed, ip_address, failure_reason
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    e.timestamp,
                    e.actor,
                    e.action.as_str(),
                    e.resource,
                    e.success,
                    e.risk_score,
                    e.mfa_required,
                    e.mfa_stepped_up,
                    e.mfa_completed,
                    e.ip_address,
                    e.failure_reason,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn audit_since(&self, actor: &str, since: i64) -> Result<Vec<AuditEntry>> {
        let actor = actor.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, actor, action, resource, success, risk_score,
                        mfa_required, mfa_stepped_up, mfa_completed, ip_address, failure_reason
                 FROM audit_log WHERE actor = ?1 AND timestamp >= ?2
                 ORDER BY timestamp, id",
            )?;
            let entries = stmt
                .query_map(params![actor, since], row_to_audit)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(entries)
        })
        .await
    }

    async fn record_origin(&self, principal: &str, origin: &str, at: i64) -> Result<bool> {
        let principal = principal.to_string();
        let origin = origin.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO principal_origins (principal, origin, first_seen)
                 VALUES (?1, ?2, ?3)",
                params![principal, origin, at],
            )?;
            Ok(changed == 1)
        })
        .await
    }
}
