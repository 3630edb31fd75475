//! # ACPE Testkit
//!
//! Testing utilities for the adaptive crypto policy engine.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic keys, a memory store and a manual clock
//! - **Clock**: [`ManualClock`] for expiry and risk tests
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use acpe_testkit::generators::classification;
//!
//! proptest! {
//!     #[test]
//!     fn escalation_never_weakens(result in classification()) {
//!         let resolution = acpe_core::PolicyEngine::default().resolve(&result);
//!         prop_assert!(resolution.effective_level >= result.level);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use acpe_core::SensitivityLevel;
//! use acpe_testkit::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let payload = fixture.encrypt(b"hello", SensitivityLevel::Internal, None);
//! assert_eq!(fixture.crypto().decrypt(&payload, None).unwrap(), b"hello");
//! ```

pub mod clock;
pub mod fixtures;
pub mod generators;

pub use clock::ManualClock;
pub use fixtures::{classified, fast_kdf, TestFixture, BUSINESS_HOURS_START};
