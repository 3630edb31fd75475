//! # ACPE Store
//!
//! Storage abstraction for the adaptive crypto policy engine. Provides a
//! trait-based interface for data items, share artifacts, the audit log and
//! origin history, with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of a unique insert
//! - [`CasResult`] - Result of a versioned share update
//!
//! ## Usage
//!
//! ```rust,no_run
//! use acpe_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("acpe.db").unwrap();
//!     let removed = store.purge_shares(1_700_000_000_000).await.unwrap();
//!     println!("purged {removed} shares");
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Unique inserts**: inserting under an existing key returns `AlreadyExists`
//! - **Compare-and-swap**: share counters only move through a version check,
//!   so two consumers can never both take the last download

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CasResult, InsertResult, Store};
