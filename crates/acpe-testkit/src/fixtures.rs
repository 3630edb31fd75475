//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use acpe_core::{
    ClassificationResult, CryptoService, DataItem, DataItemId, Ed25519PublicKey, EncryptedPayload,
    KdfParams, Keypair, LocalKeyWrapper, PolicyRegistry, SensitivityLevel,
};
use acpe_store::MemoryStore;

use crate::clock::ManualClock;

/// Monday 2024-01-15 10:00:00 UTC. Inside business hours, so risk tests
/// start from a quiet baseline.
pub const BUSINESS_HOURS_START: i64 = 1_705_312_800_000;

/// Argon2id parameters cheap enough for unit tests.
///
/// Never use these outside tests.
pub fn fast_kdf() -> KdfParams {
    KdfParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

/// A test fixture with deterministic keys, a memory store and a manual clock.
pub struct TestFixture {
    pub keypair: Keypair,
    pub wrapper: Arc<LocalKeyWrapper>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub registry: PolicyRegistry,
}

impl TestFixture {
    /// Create a new test fixture with random keys.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            wrapper: Arc::new(LocalKeyWrapper::generate()),
            store: Arc::new(MemoryStore::new()),
            clock: Arc::new(ManualClock::new(BUSINESS_HOURS_START)),
            registry: PolicyRegistry::default(),
        }
    }

    /// Create with deterministic keys derived from a seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let mut master = seed;
        master[31] ^= 0xff;
        Self {
            keypair: Keypair::from_seed(&seed),
            wrapper: Arc::new(LocalKeyWrapper::new("fixture", master)),
            ..Self::new()
        }
    }

    /// Get the signing public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// A crypto service over the fixture's keys with fast KDF parameters.
    pub fn crypto(&self) -> CryptoService {
        CryptoService::new(self.keypair.clone(), self.wrapper.clone(), fast_kdf())
    }

    /// Encrypt under the registered policy for `level`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        level: SensitivityLevel,
        password: Option<&[u8]>,
    ) -> EncryptedPayload {
        self.crypto()
            .encrypt(plaintext, self.registry.get(level), level, password)
            .expect("fixture encryption")
    }

    /// Build a stored item for `owner` at the fixture's current time.
    pub fn data_item(&self, owner: &str, plaintext: &[u8], level: SensitivityLevel) -> DataItem {
        use acpe_core::Clock;
        DataItem {
            id: DataItemId::generate(),
            owner: owner.to_string(),
            payload: self.encrypt(plaintext, level, None),
            sensitivity_level: level,
            confidence_score: 1.0,
            created_at: self.clock.now_millis(),
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A classification with no detected patterns.
pub fn classified(level: SensitivityLevel, confidence: f64) -> ClassificationResult {
    ClassificationResult::new(level, confidence)
}
