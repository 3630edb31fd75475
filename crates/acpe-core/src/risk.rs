//! Contextual risk scoring.
//!
//! A [`RiskScorer`] sums weighted signals into a 0–100 score. The score is
//! used to step up conditional MFA and is recorded on audit entries.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::SensitivityLevel;

/// Role of the requesting principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalRole {
    Admin,
    Manager,
    User,
    /// Also used for anonymous share consumers.
    Guest,
}

/// Kind of operation being scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Login,
    Classify,
    Encrypt,
    Decrypt,
    ShareCreate,
    ShareConsume,
}

/// Coarse risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskBand::Low => "low",
            RiskBand::Medium => "medium",
            RiskBand::High => "high",
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Base score per principal role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleWeights {
    pub admin: u32,
    pub manager: u32,
    pub user: u32,
    pub guest: u32,
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self {
            admin: 10,
            manager: 20,
            user: 30,
            guest: 50,
        }
    }
}

/// Points per sensitivity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelWeights {
    pub public: u32,
    pub internal: u32,
    pub confidential: u32,
    pub highly_sensitive: u32,
}

impl Default for LevelWeights {
    fn default() -> Self {
        Self {
            public: 0,
            internal: 0,
            confidential: 20,
            highly_sensitive: 40,
        }
    }
}

/// Points per action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionWeights {
    pub login: u32,
    pub classify: u32,
    pub encrypt: u32,
    pub decrypt: u32,
    pub share_create: u32,
    pub share_consume: u32,
}

impl Default for ActionWeights {
    fn default() -> Self {
        Self {
            login: 0,
            classify: 0,
            encrypt: 0,
            decrypt: 10,
            share_create: 0,
            share_consume: 10,
        }
    }
}

/// Risk-scoring weights and thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub roles: RoleWeights,
    pub levels: LevelWeights,
    pub actions: ActionWeights,
    pub new_origin: u32,
    pub per_failed_attempt: u32,
    pub failed_attempts_cap: u32,
    pub off_hours: u32,
    pub weekend: u32,
    pub burst: u32,
    /// Requests in the last minute above which `burst` applies.
    pub burst_threshold: u32,
    /// Business hours in UTC, `[start, end)`.
    pub business_start_hour: u32,
    pub business_end_hour: u32,
    /// Highest score still in the low band.
    pub low_max: u8,
    /// Highest score still in the medium band.
    pub medium_max: u8,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            roles: RoleWeights::default(),
            levels: LevelWeights::default(),
            actions: ActionWeights::default(),
            new_origin: 15,
            per_failed_attempt: 10,
            failed_attempts_cap: 30,
            off_hours: 15,
            weekend: 10,
            burst: 20,
            burst_threshold: 10,
            business_start_hour: 9,
            business_end_hour: 18,
            low_max: 30,
            medium_max: 60,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scoring
// ─────────────────────────────────────────────────────────────────────────────

/// Signals describing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskContext {
    pub role: PrincipalRole,
    pub level: SensitivityLevel,
    pub action: ActionKind,
    /// The origin was never seen for this principal before.
    pub new_origin: bool,
    pub recent_failures: u32,
    /// Requests by the same principal in the last minute.
    pub recent_requests: u32,
    /// Request time, Unix millis.
    pub at_millis: i64,
}

/// One contributing signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskFactor {
    pub name: &'static str,
    pub points: u32,
}

/// Score plus band and the factors that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub band: RiskBand,
    pub factors: Vec<RiskFactor>,
}

/// Computes risk scores from a [`RiskConfig`].
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Band for a score under this configuration.
    pub fn band(&self, score: u8) -> RiskBand {
        if score <= self.config.low_max {
            RiskBand::Low
        } else if score <= self.config.medium_max {
            RiskBand::Medium
        } else {
            RiskBand::High
        }
    }

    /// Score a request.
    pub fn score(&self, ctx: &RiskContext) -> RiskAssessment {
        let c = &self.config;
        let mut factors = Vec::new();
        let mut add = |name: &'static str, points: u32| {
            if points > 0 {
                factors.push(RiskFactor { name, points });
            }
        };

        add(
            "role",
            match ctx.role {
                PrincipalRole::Admin => c.roles.admin,
                PrincipalRole::Manager => c.roles.manager,
                PrincipalRole::User => c.roles.user,
                PrincipalRole::Guest => c.roles.guest,
            },
        );
        add(
            "sensitivity",
            match ctx.level {
                SensitivityLevel::Public => c.levels.public,
                SensitivityLevel::Internal => c.levels.internal,
                SensitivityLevel::Confidential => c.levels.confidential,
                SensitivityLevel::HighlySensitive => c.levels.highly_sensitive,
            },
        );
        add(
            "action",
            match ctx.action {
                ActionKind::Login => c.actions.login,
                ActionKind::Classify => c.actions.classify,
                ActionKind::Encrypt => c.actions.encrypt,
                ActionKind::Decrypt => c.actions.decrypt,
                ActionKind::ShareCreate => c.actions.share_create,
                ActionKind::ShareConsume => c.actions.share_consume,
            },
        );
        if ctx.new_origin {
            add("new_origin", c.new_origin);
        }
        add(
            "failed_attempts",
            ctx.recent_failures
                .saturating_mul(c.per_failed_attempt)
                .min(c.failed_attempts_cap),
        );

        if let Some(at) = DateTime::<Utc>::from_timestamp_millis(ctx.at_millis) {
            let hour = at.hour();
            if hour < c.business_start_hour || hour >= c.business_end_hour {
                add("off_hours", c.off_hours);
            }
            if matches!(at.weekday(), Weekday::Sat | Weekday::Sun) {
                add("weekend", c.weekend);
            }
        }
        if ctx.recent_requests > c.burst_threshold {
            add("burst", c.burst);
        }

        let total: u32 = factors.iter().map(|f| f.points).fold(0, u32::saturating_add);
        let score = total.min(100) as u8;

        RiskAssessment {
            score,
            band: self.band(score),
            factors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    /// Wednesday 2024-01-10 at `hour`:00 UTC.
    fn weekday_at(hour: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 1, 10, hour, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn ctx(role: PrincipalRole, level: SensitivityLevel, action: ActionKind) -> RiskContext {
        RiskContext {
            role,
            level,
            action,
            new_origin: false,
            recent_failures: 0,
            recent_requests: 1,
            at_millis: weekday_at(11),
        }
    }

    #[test]
    fn test_admin_public_is_low() {
        let a = RiskScorer::default().score(&ctx(
            PrincipalRole::Admin,
            SensitivityLevel::Public,
            ActionKind::Encrypt,
        ));
        assert_eq!(a.score, 10);
        assert_eq!(a.band, RiskBand::Low);
    }

    #[test]
    fn test_guest_consuming_sensitive_is_high() {
        let a = RiskScorer::default().score(&ctx(
            PrincipalRole::Guest,
            SensitivityLevel::HighlySensitive,
            ActionKind::ShareConsume,
        ));
        assert_eq!(a.score, 100);
        assert_eq!(a.band, RiskBand::High);
    }

    #[test]
    fn test_signals_add_up() {
        let mut c = ctx(
            PrincipalRole::User,
            SensitivityLevel::Confidential,
            ActionKind::Decrypt,
        );
        assert_eq!(RiskScorer::default().score(&c).score, 60);
        assert_eq!(RiskScorer::default().score(&c).band, RiskBand::Medium);

        c.new_origin = true;
        let a = RiskScorer::default().score(&c);
        assert_eq!(a.score, 75);
        assert_eq!(a.band, RiskBand::High);
        assert!(a.factors.iter().any(|f| f.name == "new_origin"));
    }

    #[test]
    fn test_failed_attempts_capped() {
        let mut c = ctx(PrincipalRole::Admin, SensitivityLevel::Public, ActionKind::Login);
        c.recent_failures = 2;
        assert_eq!(RiskScorer::default().score(&c).score, 30);
        c.recent_failures = 50;
        assert_eq!(RiskScorer::default().score(&c).score, 40);
    }

    #[test]
    fn test_off_hours_and_weekend() {
        let mut c = ctx(PrincipalRole::Admin, SensitivityLevel::Public, ActionKind::Login);
        c.at_millis = weekday_at(18);
        assert_eq!(RiskScorer::default().score(&c).score, 25);
        c.at_millis = weekday_at(8);
        assert_eq!(RiskScorer::default().score(&c).score, 25);

        // Saturday 2024-01-13 noon.
        c.at_millis = Utc
            .with_ymd_and_hms(2024, 1, 13, 12, 0, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(RiskScorer::default().score(&c).score, 20);
    }

    #[test]
    fn test_burst() {
        let mut c = ctx(PrincipalRole::Admin, SensitivityLevel::Public, ActionKind::Login);
        c.recent_requests = 10;
        assert_eq!(RiskScorer::default().score(&c).score, 10);
        c.recent_requests = 11;
        assert_eq!(RiskScorer::default().score(&c).score, 30);
    }

    #[test]
    fn test_band_thresholds() {
        let s = RiskScorer::default();
        assert_eq!(s.band(30), RiskBand::Low);
        assert_eq!(s.band(31), RiskBand::Medium);
        assert_eq!(s.band(60), RiskBand::Medium);
        assert_eq!(s.band(61), RiskBand::High);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: RiskConfig = serde_json::from_str(r#"{"low_max": 20, "roles": {"guest": 0}}"#).unwrap();
        assert_eq!(config.low_max, 20);
        assert_eq!(config.roles.guest, 0);
        assert_eq!(config.roles.admin, 10);
    }

    proptest! {
        #[test]
        fn prop_score_is_bounded(
            failures in any::<u32>(),
            requests in any::<u32>(),
            at in 0i64..4_102_444_800_000,
            new_origin in any::<bool>(),
        ) {
            let c = RiskContext {
                role: PrincipalRole::Guest,
                level: SensitivityLevel::HighlySensitive,
                action: ActionKind::ShareConsume,
                new_origin,
                recent_failures: failures,
                recent_requests: requests,
                at_millis: at,
            };
            let a = RiskScorer::default().score(&c);
            prop_assert!(a.score <= 100);
        }
    }
}
