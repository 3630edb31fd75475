//! Per-token serialization.
//!
//! Every operation that mutates a share holds that token's lock. Entries are
//! dropped from the table once nobody holds or waits on them, so the table
//! only grows with the number of tokens in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{Result, ShareError};

type Slot = Arc<AsyncMutex<()>>;

/// Table of per-token async mutexes.
#[derive(Debug)]
pub struct TokenLocks {
    slots: Mutex<HashMap<String, Slot>>,
    timeout: Duration,
}

/// Held while a token's share is being read and written.
#[derive(Debug)]
pub struct TokenGuard<'a> {
    locks: &'a TokenLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TokenLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Wait for `key`'s lock. Gives up with `ConcurrentModification` after the timeout.
    pub async fn acquire(&self, key: &str) -> Result<TokenGuard<'_>> {
        let slot = {
            // The map only holds Arcs, so a poisoned lock leaves nothing half-written.
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key.to_string()).or_default().clone()
        };

        match tokio::time::timeout(self.timeout, slot.lock_owned()).await {
            Ok(guard) => Ok(TokenGuard {
                locks: self,
                key: key.to_string(),
                guard: Some(guard),
            }),
            Err(_) => {
                self.release(key);
                Err(ShareError::ConcurrentModification)
            }
        }
    }

    /// Number of tokens with a live lock entry.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(key);
        }
    }
}

impl Drop for TokenGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the strong count only counts waiters.
        self.guard.take();
        self.locks.release(&self.key);
    }
}
