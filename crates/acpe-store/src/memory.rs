//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use acpe_core::{AuditEntry, DataItem, DataItemId, ShareArtifact, ShareState, ShareToken};

use crate::error::{Result, StoreError};
use crate::traits::{CasResult, InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Data items indexed by id, with an insertion sequence for ordering.
    items: HashMap<DataItemId, (u64, DataItem)>,

    /// Shares indexed by token string.
    shares: HashMap<String, ShareArtifact>,

    /// Audit log, in append order.
    audit: Vec<AuditEntry>,

    /// Origins seen per principal.
    origins: HashMap<String, HashSet<String>>,

    next_seq: u64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    /// Number of stored shares.
    pub fn share_count(&self) -> Result<usize> {
        Ok(self.read()?.shares.len())
    }

    /// Number of audit entries.
    pub fn audit_len(&self) -> Result<usize> {
        Ok(self.read()?.audit.len())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_data_item(&self, item: &DataItem) -> Result<InsertResult> {
        let mut inner = self.write()?;
        if inner.items.contains_key(&item.id) {
            return Ok(InsertResult::AlreadyExists);
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.items.insert(item.id, (seq, item.clone()));
        Ok(InsertResult::Inserted)
    }

    async fn get_data_item(&self, id: &DataItemId) -> Result<Option<DataItem>> {
        let inner = self.read()?;
        Ok(inner.items.get(id).map(|(_, item)| item.clone()))
    }

    async fn delete_data_item(&self, id: &DataItemId, owner: &str) -> Result<bool> {
        let mut inner = self.write()?;
        let owned = inner
            .items
            .get(id)
            .is_some_and(|(_, item)| item.owner == owner);
        if owned {
            inner.items.remove(id);
        }
        Ok(owned)
    }

    async fn list_data_items(&self, owner: &str) -> Result<Vec<DataItem>> {
        let inner = self.read()?;
        let ordered: BTreeMap<u64, &DataItem> = inner
            .items
            .values()
            .filter(|(_, item)| item.owner == owner)
            .map(|(seq, item)| (*seq, item))
            .collect();
        Ok(ordered.into_values().cloned().collect())
    }

    async fn insert_share(&self, share: &ShareArtifact) -> Result<InsertResult> {
        let mut inner = self.write()?;
        let key = share.token.as_str().to_string();
        if inner.shares.contains_key(&key) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.shares.insert(key, share.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get_share(&self, token: &ShareToken) -> Result<Option<ShareArtifact>> {
        let inner = self.read()?;
        Ok(inner.shares.get(token.as_str()).cloned())
    }

    async fn compare_and_swap_share(
        &self,
        share: &ShareArtifact,
        expected_version: u64,
    ) -> Result<CasResult> {
        let mut inner = self.write()?;
        let Some(stored) = inner.shares.get_mut(share.token.as_str()) else {
            return Ok(CasResult::Missing);
        };
        if stored.version != expected_version {
            return Ok(CasResult::VersionMismatch {
                current: stored.version,
            });
        }
        stored.download_count = share.download_count;
        stored.failed_attempts = share.failed_attempts;
        stored.last_accessed_at = share.last_accessed_at;
        stored.version = expected_version + 1;
        Ok(CasResult::Swapped)
    }

    async fn purge_shares(&self, now: i64) -> Result<usize> {
        let mut inner = self.write()?;
        let before = inner.shares.len();
        inner
            .shares
            .retain(|_, share| share.state(now) == ShareState::Active);
        Ok(before - inner.shares.len())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.write()?.audit.push(entry.clone());
        Ok(())
    }

    async fn audit_since(&self, actor: &str, since: i64) -> Result<Vec<AuditEntry>> {
        let inner = self.read()?;
        Ok(inner
            .audit
            .iter()
            .filter(|e| e.actor == actor && e.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn record_origin(&self, principal: &str, origin: &str, _at: i64) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner
            .origins
            .entry(principal.to_string())
            .or_default()
            .insert(origin.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{data_item, share};

    #[tokio::test]
    async fn test_data_item_lifecycle() {
        let store = MemoryStore::new();
        let item = data_item("alice");

        assert_eq!(
            store.insert_data_item(&item).await.unwrap(),
            InsertResult::Inserted
        );
        assert_eq!(
            store.insert_data_item(&item).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(store.get_data_item(&item.id).await.unwrap(), Some(item.clone()));

        // Only the owner can delete.
        assert!(!store.delete_data_item(&item.id, "mallory").await.unwrap());
        assert!(store.delete_data_item(&item.id, "alice").await.unwrap());
        assert!(store.get_data_item(&item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_per_owner_and_ordered() {
        let store = MemoryStore::new();
        let a1 = data_item("alice");
        let b1 = data_item("bob");
        let a2 = data_item("alice");
        for item in [&a1, &b1, &a2] {
            store.insert_data_item(item).await.unwrap();
        }
        let ids: Vec<_> = store
            .list_data_items("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![a1.id, a2.id]);
    }

    #[tokio::test]
    async fn test_share_cas() {
        let store = MemoryStore::new();
        let mut s = share(Some(2), None);
        store.insert_share(&s).await.unwrap();

        s.download_count = 1;
        assert_eq!(
            store.compare_and_swap_share(&s, 0).await.unwrap(),
            CasResult::Swapped
        );
        assert_eq!(
            store.compare_and_swap_share(&s, 0).await.unwrap(),
            CasResult::VersionMismatch { current: 1 }
        );

        let stored = store.get_share(&s.token).await.unwrap().unwrap();
        assert_eq!(stored.download_count, 1);
        assert_eq!(stored.version, 1);

        let other = share(None, None);
        assert_eq!(
            store.compare_and_swap_share(&other, 0).await.unwrap(),
            CasResult::Missing
        );
    }

    #[tokio::test]
    async fn test_purge() {
        let store = MemoryStore::new();
        let live = share(Some(3), Some(10_000));
        let expired = share(None, Some(10));
        let mut exhausted = share(Some(1), None);
        exhausted.download_count = 1;
        for s in [&live, &expired, &exhausted] {
            store.insert_share(s).await.unwrap();
        }

        assert_eq!(store.purge_shares(100).await.unwrap(), 2);
        assert_eq!(store.share_count().unwrap(), 1);
        assert!(store.get_share(&live.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_audit_and_origins() {
        let store = MemoryStore::new();
        store
            .append_audit(&AuditEntry::new(10, "alice", acpe_core::AuditAction::Encrypt))
            .await
            .unwrap();
        store
            .append_audit(&AuditEntry::new(20, "bob", acpe_core::AuditAction::Encrypt))
            .await
            .unwrap();
        assert_eq!(store.audit_since("alice", 0).await.unwrap().len(), 1);
        assert!(store.audit_since("alice", 11).await.unwrap().is_empty());

        assert!(store.record_origin("alice", "10.0.0.1", 1).await.unwrap());
        assert!(!store.record_origin("alice", "10.0.0.1", 2).await.unwrap());
        assert!(store.record_origin("bob", "10.0.0.1", 3).await.unwrap());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            /// Purge removes exactly the shares whose derived state is terminal.
            #[test]
            fn purge_agrees_with_state(
                specs in prop::collection::vec(
                    (prop::option::of(0u32..4), 0u32..5, prop::option::of(0i64..200)),
                    0..6,
                ),
                now in 0i64..200,
            ) {
                let rt = tokio::runtime::Runtime::new().unwrap();
                rt.block_on(async {
                    let store = MemoryStore::new();
                    let mut terminal = 0;
                    for (max, count, expires) in specs {
                        let mut s = share(max, expires);
                        s.download_count = count;
                        if s.state(now) != ShareState::Active {
                            terminal += 1;
                        }
                        store.insert_share(&s).await.unwrap();
                    }
                    let before = store.share_count().unwrap();
                    let removed = store.purge_shares(now).await.unwrap();
                    prop_assert_eq!(removed, terminal);
                    prop_assert_eq!(store.share_count().unwrap(), before - terminal);
                    Ok(())
                })?;
            }
        }
    }
}
