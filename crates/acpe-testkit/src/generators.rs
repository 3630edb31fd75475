//! Proptest generators for property-based testing.

use proptest::prelude::*;

use acpe_core::{
    ActionKind, ClassificationResult, KdfParams, Keypair, PrincipalRole, RiskContext,
    SensitivityLevel,
};

/// Generate a sensitivity level.
pub fn sensitivity_level() -> impl Strategy<Value = SensitivityLevel> {
    prop::sample::select(SensitivityLevel::ALL.to_vec())
}

/// Generate a confidence in `[0, 1]`.
pub fn confidence() -> impl Strategy<Value = f64> {
    0.0f64..=1.0
}

/// Generate a classification result with arbitrary level and confidence.
pub fn classification() -> impl Strategy<Value = ClassificationResult> {
    (sensitivity_level(), confidence())
        .prop_map(|(level, confidence)| ClassificationResult::new(level, confidence))
}

/// Generate plaintext bytes of specified max length.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a non-empty password.
pub fn password() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=32)
}

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Cheap but valid Argon2id parameters.
pub fn kdf_params() -> impl Strategy<Value = KdfParams> {
    (8u32..=64, 1u32..=2).prop_map(|(memory_kib, iterations)| KdfParams {
        memory_kib,
        iterations,
        parallelism: 1,
    })
}

/// Generate a principal role.
pub fn principal_role() -> impl Strategy<Value = PrincipalRole> {
    prop_oneof![
        Just(PrincipalRole::Admin),
        Just(PrincipalRole::Manager),
        Just(PrincipalRole::User),
        Just(PrincipalRole::Guest),
    ]
}

/// Generate an action kind.
pub fn action_kind() -> impl Strategy<Value = ActionKind> {
    prop_oneof![
        Just(ActionKind::Login),
        Just(ActionKind::Classify),
        Just(ActionKind::Encrypt),
        Just(ActionKind::Decrypt),
        Just(ActionKind::ShareCreate),
        Just(ActionKind::ShareConsume),
    ]
}

/// Generate a risk context anywhere in 2020..2030.
pub fn risk_context() -> impl Strategy<Value = RiskContext> {
    (
        principal_role(),
        sensitivity_level(),
        action_kind(),
        any::<bool>(),
        0u32..20,
        0u32..50,
        1_577_836_800_000i64..1_893_456_000_000i64,
    )
        .prop_map(
            |(role, level, action, new_origin, recent_failures, recent_requests, at_millis)| {
                RiskContext {
                    role,
                    level,
                    action,
                    new_origin,
                    recent_failures,
                    recent_requests,
                    at_millis,
                }
            },
        )
}
