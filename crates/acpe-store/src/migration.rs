//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection, now: i64) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: data items, shares, audit log.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Encrypted data owned by authenticated principals
        CREATE TABLE data_items (
            id BLOB PRIMARY KEY,              -- 16 bytes, random
            owner TEXT NOT NULL,
            sensitivity_level TEXT NOT NULL,  -- snake_case level name
            confidence_score REAL NOT NULL,
            payload BLOB NOT NULL,            -- CBOR EncryptedPayload
            created_at INTEGER NOT NULL
        );

        -- Token-addressed share artifacts
        CREATE TABLE shares (
            token TEXT PRIMARY KEY,
            payload BLOB NOT NULL,            -- CBOR EncryptedPayload
            filename TEXT,
            content_type TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            password_hash TEXT,               -- Argon2id PHC string
            expires_at INTEGER,
            max_downloads INTEGER,
            download_count INTEGER NOT NULL DEFAULT 0,
            failed_attempts INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            last_accessed_at INTEGER,
            sensitivity_level TEXT NOT NULL,
            confidence_score REAL NOT NULL,
            merkle_root BLOB NOT NULL,        -- 32 bytes
            merkle_chunk_size INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 0  -- compare-and-swap stamp
        );

        -- Append-only audit log
        CREATE TABLE audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            actor TEXT NOT NULL,
            action TEXT NOT NULL,
            resource TEXT,
            success INTEGER NOT NULL,
            risk_score INTEGER,
            mfa_required INTEGER NOT NULL DEFAULT 0,
            mfa_stepped_up INTEGER NOT NULL DEFAULT 0,
            mfa_completed INTEGER NOT NULL DEFAULT 0,
            ip_address TEXT,
            failure_reason TEXT
        );

        CREATE INDEX idx_data_items_owner ON data_items(owner, created_at);
        CREATE INDEX idx_shares_expires ON shares(expires_at);
        CREATE INDEX idx_audit_actor_time ON audit_log(actor, timestamp);
        "#,
    )?;

    Ok(())
}

/// Migration v2: origin tracking for risk scoring.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE principal_origins (
            principal TEXT NOT NULL,
            origin TEXT NOT NULL,
            first_seen INTEGER NOT NULL,
            PRIMARY KEY (principal, origin)
        );
        "#,
    )?;

    Ok(())
}
