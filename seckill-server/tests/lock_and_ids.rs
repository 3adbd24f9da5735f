use seckill_server::{DistributedLock, DynStore, IdWorker, MemoryStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_only_one_contender_holds_the_lock() {
    let store: DynStore = Arc::new(MemoryStore::new());

    let mut handles = Vec::new();
    for _ in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let lock = DistributedLock::new(store, "order:1");
            lock.try_lock(Duration::from_secs(10)).await.unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_released_lock_can_be_taken_again() {
    let store: DynStore = Arc::new(MemoryStore::new());
    let first = DistributedLock::new(store.clone(), "order:2");
    let second = DistributedLock::new(store.clone(), "order:2");

    assert!(first.try_lock(Duration::from_secs(10)).await.unwrap());
    assert!(!second.try_lock(Duration::from_secs(10)).await.unwrap());
    // Releasing someone else's lock is a no-op
    assert!(!second.unlock().await.unwrap());

    assert!(first.unlock().await.unwrap());
    assert!(second.try_lock(Duration::from_secs(10)).await.unwrap());
    assert_ne!(first.holder_id(), second.holder_id());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ids_are_unique_and_increasing_per_caller() {
    let store: DynStore = Arc::new(MemoryStore::new());
    let ids = IdWorker::new(store);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ids = ids.clone();
        handles.push(tokio::spawn(async move {
            let mut issued = Vec::with_capacity(100);
            for _ in 0..100 {
                issued.push(ids.next_id("order").await.unwrap());
            }
            issued
        }));
    }

    let mut all = HashSet::new();
    for handle in handles {
        let issued = handle.await.unwrap();
        assert!(issued.windows(2).all(|w| w[0] < w[1]));
        for id in issued {
            assert!(id > 0);
            assert!(all.insert(id), "duplicate id {id}");
        }
    }
    assert_eq!(all.len(), 800);
}

#[tokio::test]
async fn test_namespaces_count_independently() {
    let store: DynStore = Arc::new(MemoryStore::new());
    let ids = IdWorker::new(store);

    let order = ids.next_id("order").await.unwrap();
    let shop = ids.next_id("shop").await.unwrap();
    // Both are the first of their day, so only the timestamp half can differ
    assert_eq!(order & 0xFFFF_FFFF, 1);
    assert_eq!(shop & 0xFFFF_FFFF, 1);
}
