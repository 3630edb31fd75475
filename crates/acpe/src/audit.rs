//! Audit trail.
//!
//! Audit writes never fail the operation they describe. A failed write is
//! logged and published to subscribers as an [`AuditFailure`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::error;

use acpe_core::AuditEntry;
use acpe_store::Store;

/// The sink could not record an entry.
#[derive(Debug, Clone, Error)]
#[error("audit sink failed: {0}")]
pub struct AuditSinkError(pub String);

/// Append-only destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditSinkError>;
}

/// Writes audit entries to the engine's store.
pub struct StoreAuditSink<S: Store> {
    store: Arc<S>,
}

impl<S: Store> StoreAuditSink<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store> AuditSink for StoreAuditSink<S> {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditSinkError> {
        self.store
            .append_audit(entry)
            .await
            .map_err(|e| AuditSinkError(e.to_string()))
    }
}

/// An entry that could not be recorded.
#[derive(Debug, Clone)]
pub struct AuditFailure {
    pub entry: AuditEntry,
    pub error: AuditSinkError,
}

/// Buffered failure events per subscriber before the oldest are dropped.
const FAILURE_CHANNEL_CAPACITY: usize = 256;

/// Sink plus the failure broadcast.
pub(crate) struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    failures: broadcast::Sender<AuditFailure>,
}

impl AuditRecorder {
    pub(crate) fn new(sink: Arc<dyn AuditSink>) -> Self {
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        Self { sink, failures }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<AuditFailure> {
        self.failures.subscribe()
    }

    /// Record `entry`. Never fails.
    pub(crate) async fn record(&self, entry: AuditEntry) {
        if let Err(error) = self.sink.append(&entry).await {
            error!(
                action = %entry.action,
                actor = %entry.actor,
                %error,
                "audit write failed"
            );
            // No subscribers is fine.
            let _ = self.failures.send(AuditFailure { entry, error });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acpe_core::AuditAction;
    use acpe_store::MemoryStore;

    struct BrokenSink;

    #[async_trait]
    impl AuditSink for BrokenSink {
        async fn append(&self, _entry: &AuditEntry) -> Result<(), AuditSinkError> {
            Err(AuditSinkError("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_store_sink_appends() {
        let store = Arc::new(MemoryStore::new());
        let recorder = AuditRecorder::new(Arc::new(StoreAuditSink::new(store.clone())));
        recorder
            .record(AuditEntry::new(1, "alice", AuditAction::Encrypt))
            .await;
        assert_eq!(store.audit_len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_broadcast() {
        let recorder = AuditRecorder::new(Arc::new(BrokenSink));
        let mut failures = recorder.subscribe();

        recorder
            .record(AuditEntry::new(1, "alice", AuditAction::Decrypt))
            .await;

        let failure = failures.recv().await.unwrap();
        assert_eq!(failure.entry.actor, "alice");
        assert_eq!(failure.error.0, "disk full");
    }

    #[tokio::test]
    async fn test_failure_without_subscribers_is_silent() {
        let recorder = AuditRecorder::new(Arc::new(BrokenSink));
        recorder
            .record(AuditEntry::new(1, "alice", AuditAction::Delete))
            .await;
    }
}
