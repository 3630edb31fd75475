//! # ACPE Share
//!
//! Share-link artifacts: encrypted blobs reachable through an opaque token,
//! optionally gated by a password, an expiry time and a download budget.
//!
//! ## State Machine
//!
//! ```text
//!            time >= expires_at
//!   Active ──────────────────────▶ Expired
//!      │
//!      │ download_count == max_downloads
//!      ▼
//!   Exhausted
//! ```
//!
//! Both end states are terminal. When both apply, Expired wins.
//!
//! ## Concurrency
//!
//! Consumption of one token is serialized by a per-token lock, and every
//! counter write is a compare-and-swap on the share's version. With a budget
//! of N and any number of concurrent consumers, exactly N succeed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let ticket = manager.create(content, policy, metadata, ShareOptions {
//!     max_downloads: Some(1),
//!     ..Default::default()
//! }).await?;
//! let consumed = manager.consume(&ticket.token, None).await?;
//! ```

pub mod error;
pub mod locks;
pub mod manager;
pub mod password;
pub mod token;

pub use error::{Result, ShareError};
pub use manager::{
    ConsumedShare, ShareConfig, ShareInfo, ShareManager, ShareMetadata, ShareOptions, ShareTicket,
};
pub use token::generate_token;
