//! Second-factor verification.
//!
//! TOTP secrets and code generation live outside the engine. The engine only
//! asks whether a code is valid for a principal right now.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

/// Checks a second-factor code.
#[async_trait]
pub trait MfaVerifier: Send + Sync {
    async fn verify(&self, principal: &str, code: &str) -> bool;
}

/// Rejects every code. Used when no MFA backend is configured, so any
/// request that needs step-up fails closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAllMfa;

#[async_trait]
impl MfaVerifier for DenyAllMfa {
    async fn verify(&self, _principal: &str, _code: &str) -> bool {
        false
    }
}

/// Fixed per-principal codes. For tests and local setups.
#[derive(Debug, Default)]
pub struct StaticMfaCodes {
    codes: RwLock<HashMap<String, String>>,
}

impl StaticMfaCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the code `principal` must present.
    pub fn set(&self, principal: impl Into<String>, code: impl Into<String>) {
        if let Ok(mut codes) = self.codes.write() {
            codes.insert(principal.into(), code.into());
        }
    }
}

#[async_trait]
impl MfaVerifier for StaticMfaCodes {
    async fn verify(&self, principal: &str, code: &str) -> bool {
        self.codes
            .read()
            .map(|codes| codes.get(principal).is_some_and(|expected| expected == code))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deny_all() {
        assert!(!DenyAllMfa.verify("alice", "123456").await);
    }

    #[tokio::test]
    async fn test_static_codes() {
        let mfa = StaticMfaCodes::new();
        mfa.set("alice", "123456");
        assert!(mfa.verify("alice", "123456").await);
        assert!(!mfa.verify("alice", "654321").await);
        assert!(!mfa.verify("bob", "123456").await);
    }
}
