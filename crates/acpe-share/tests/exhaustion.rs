//! Concurrent consumers racing for a limited download budget.

use std::sync::Arc;

use acpe_core::{SensitivityLevel, ShareState};
use acpe_share::{ShareConfig, ShareError, ShareManager, ShareMetadata, ShareOptions};
use acpe_store::{MemoryStore, SqliteStore, Store};
use acpe_testkit::TestFixture;

async fn race<S: Store + 'static>(store: Arc<S>, budget: u32, consumers: usize) {
    let fixture = TestFixture::new();
    let manager = Arc::new(ShareManager::new(
        store.clone(),
        fixture.crypto(),
        fixture.clock.clone(),
        ShareConfig {
            lock_timeout_ms: 30_000,
            ..Default::default()
        },
    ));

    let ticket = manager
        .create(
            b"limited edition".to_vec(),
            fixture.registry.get(SensitivityLevel::Confidential),
            ShareMetadata {
                filename: None,
                content_type: "text/plain".into(),
                sensitivity_level: SensitivityLevel::Confidential,
                confidence_score: 0.95,
            },
            ShareOptions {
                max_downloads: Some(budget),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let handles: Vec<_> = (0..consumers)
        .map(|_| {
            let manager = manager.clone();
            let token = ticket.token.clone();
            tokio::spawn(async move { manager.consume(&token, None).await })
        })
        .collect();

    let mut successes = 0;
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(consumed) => {
                assert_eq!(consumed.content, b"limited edition");
                successes += 1;
            }
            Err(ShareError::Exhausted) => exhausted += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, budget as usize);
    assert_eq!(exhausted, consumers - budget as usize);

    let stored = store.get_share(&ticket.token).await.unwrap().unwrap();
    assert_eq!(stored.download_count, budget);
    assert_eq!(stored.state(0), ShareState::Exhausted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exactly_budget_consumers_succeed_memory() {
    race(Arc::new(MemoryStore::new()), 3, 16).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exactly_budget_consumers_succeed_sqlite() {
    race(Arc::new(SqliteStore::open_memory().unwrap()), 5, 12).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_download_budget() {
    race(Arc::new(MemoryStore::new()), 1, 8).await;
}

/// Two managers over one store model two processes: the per-token locks are
/// independent, so only the store's version check keeps the count honest.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_managers_never_overspend() {
    let fixture = TestFixture::new();
    let store = Arc::new(MemoryStore::new());
    let make = || {
        Arc::new(ShareManager::new(
            store.clone(),
            fixture.crypto(),
            fixture.clock.clone(),
            ShareConfig::default(),
        ))
    };
    let (a, b) = (make(), make());

    let ticket = a
        .create(
            b"contested".to_vec(),
            fixture.registry.get(SensitivityLevel::Internal),
            ShareMetadata {
                filename: None,
                content_type: "text/plain".into(),
                sensitivity_level: SensitivityLevel::Internal,
                confidence_score: 0.9,
            },
            ShareOptions {
                max_downloads: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let manager = if i % 2 == 0 { a.clone() } else { b.clone() };
            let token = ticket.token.clone();
            tokio::spawn(async move { manager.consume(&token, None).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(ShareError::Exhausted) | Err(ShareError::ConcurrentModification) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let stored = store.get_share(&ticket.token).await.unwrap().unwrap();
    assert!(successes <= 2);
    assert_eq!(stored.download_count as usize, successes);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_managers_see_exhausted_not_conflict() {
    let fixture = TestFixture::new();
    let store = Arc::new(MemoryStore::new());
    let make = || {
        Arc::new(ShareManager::new(
            store.clone(),
            fixture.crypto(),
            fixture.clock.clone(),
            ShareConfig::default(),
        ))
    };
    let managers = [make(), make(), make()];

    let ticket = managers[0]
        .create(
            b"one shot".to_vec(),
            fixture.registry.get(SensitivityLevel::Confidential),
            ShareMetadata {
                filename: None,
                content_type: "text/plain".into(),
                sensitivity_level: SensitivityLevel::Confidential,
                confidence_score: 0.9,
            },
            ShareOptions {
                max_downloads: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let manager = managers[i % managers.len()].clone();
            let token = ticket.token.clone();
            tokio::spawn(async move { manager.consume(&token, None).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(ShareError::Exhausted) => {}
            Err(other) => panic!("a one-shot share should only report exhaustion: {other}"),
        }
    }
    assert_eq!(successes, 1);
}
