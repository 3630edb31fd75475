//! Shared setup for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use acpe::core::{ClassificationResult, SensitivityLevel};
use acpe::share::ShareOptions;
use acpe::store::MemoryStore;
use acpe::{Classifier, ClassifierUnavailable, Engine, EngineBuilder, EngineConfig, ShareRequest};
use acpe_testkit::{fast_kdf, TestFixture};
use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("acpe=debug,acpe_share=debug,acpe_core=info"))
        .with_test_writer()
        .try_init();
}

pub fn config() -> EngineConfig {
    EngineConfig {
        kdf: fast_kdf(),
        ..Default::default()
    }
}

/// Builder over the fixture's store, keys and clock.
pub fn builder(fixture: &TestFixture) -> EngineBuilder<MemoryStore> {
    init_tracing();
    Engine::builder_shared(fixture.store.clone())
        .config(config())
        .clock(fixture.clock.clone())
        .signer(fixture.keypair.clone())
        .key_wrapper(fixture.wrapper.clone())
}

pub fn engine(fixture: &TestFixture) -> Engine<MemoryStore> {
    builder(fixture).build().unwrap()
}

/// Always returns the same result.
pub struct FixedClassifier(pub ClassificationResult);

impl FixedClassifier {
    pub fn new(level: SensitivityLevel, confidence: f64) -> Arc<Self> {
        Arc::new(Self(ClassificationResult::new(level, confidence)))
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> Result<ClassificationResult, ClassifierUnavailable> {
        Ok(self.0.clone())
    }
}

/// Classifier whose backend is down.
pub struct DownClassifier;

#[async_trait]
impl Classifier for DownClassifier {
    async fn classify(&self, _text: &str) -> Result<ClassificationResult, ClassifierUnavailable> {
        Err(ClassifierUnavailable("model server unreachable".into()))
    }
}

pub fn text_share(content: &str, options: ShareOptions) -> ShareRequest {
    ShareRequest {
        content: content.as_bytes().to_vec(),
        filename: Some("note.txt".into()),
        content_type: "text/plain".into(),
        options,
    }
}
