//! The same store contract checked against the in-memory store and, when
//! `REDIS_URL` is set, against Redis running the real Lua scripts.
//!
//! Redis cases are ignored by default: `REDIS_URL=redis://127.0.0.1:6379
//! cargo test --test store_conformance -- --ignored`

use seckill_server::store::{ReadMode, gate_code, keys};
use seckill_server::{DistributedLock, DynStore, MemoryStore, RedisStore, SharedStore};
use std::sync::Arc;
use std::time::Duration;

const GROUP: &str = "g1";
const BLOCK: Duration = Duration::from_millis(50);

fn memory() -> DynStore {
    Arc::new(MemoryStore::new())
}

async fn redis() -> Option<DynStore> {
    let Ok(url) = std::env::var("REDIS_URL") else {
        eprintln!("REDIS_URL not set, skipping");
        return None;
    };
    let store = RedisStore::connect(&url).await.unwrap();
    Some(Arc::new(store))
}

/// Keys unique to one test run, so runs against a shared Redis never collide
fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn unique_voucher_id() -> i64 {
    (uuid::Uuid::new_v4().as_u128() % 1_000_000_000) as i64 + 1_000_000_000
}

async fn gate_codes_and_in_script_append(store: DynStore) {
    let voucher_id = unique_voucher_id();
    let stream = format!("test.orders.{}", unique_suffix());
    store.ensure_group(&stream, GROUP).await.unwrap();

    assert_eq!(
        store.stock_gate(voucher_id, 1, 1001, &stream).await.unwrap(),
        gate_code::UNKNOWN_VOUCHER
    );

    store.seed_stock(voucher_id, 1).await.unwrap();
    store.reset_admissions(voucher_id).await.unwrap();
    assert_eq!(
        store.stock_gate(voucher_id, 1, 1001, &stream).await.unwrap(),
        gate_code::ADMITTED
    );
    // Repeat buyer is told "already admitted", not "sold out"
    assert_eq!(
        store.stock_gate(voucher_id, 1, 1002, &stream).await.unwrap(),
        gate_code::ALREADY_ADMITTED
    );
    assert_eq!(
        store.stock_gate(voucher_id, 2, 1003, &stream).await.unwrap(),
        gate_code::OUT_OF_STOCK
    );
    assert_eq!(
        store.get(&keys::stock_key(voucher_id)).await.unwrap().as_deref(),
        Some("0")
    );

    // Exactly one entry, written by the admitting call
    let entries = store
        .read_group(&stream, GROUP, "c1", ReadMode::New { block: BLOCK }, 10)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    let fields = &entries[0].fields;
    assert_eq!(fields["userId"], "1");
    assert_eq!(fields["voucherId"], voucher_id.to_string());
    assert_eq!(fields["id"], "1001");

    for key in [
        keys::stock_key(voucher_id),
        keys::admission_key(voucher_id),
        stream,
    ] {
        store.delete(&key).await.unwrap();
    }
}

async fn compare_and_delete_spares_foreign_holder(store: DynStore) {
    let resource = format!("test:{}", unique_suffix());
    let ours = DistributedLock::new(store.clone(), &resource);
    let theirs = DistributedLock::new(store.clone(), &resource);

    assert!(ours.try_lock(Duration::from_secs(10)).await.unwrap());
    assert!(!theirs.try_lock(Duration::from_secs(10)).await.unwrap());

    assert!(!theirs.unlock().await.unwrap());
    assert_eq!(
        store.get(ours.key()).await.unwrap().as_deref(),
        Some(ours.holder_id())
    );

    assert!(ours.unlock().await.unwrap());
    assert_eq!(store.get(ours.key()).await.unwrap(), None);
    assert!(theirs.try_lock(Duration::from_secs(10)).await.unwrap());
    assert!(theirs.unlock().await.unwrap());
}

async fn pending_entries_are_redelivered_to_their_consumer(store: DynStore) {
    let stream = format!("test.orders.{}", unique_suffix());
    store.ensure_group(&stream, GROUP).await.unwrap();
    // Creating an existing group is not an error
    store.ensure_group(&stream, GROUP).await.unwrap();

    let first = store
        .append(&stream, &[("id", "1".to_string())])
        .await
        .unwrap();
    store
        .append(&stream, &[("id", "2".to_string())])
        .await
        .unwrap();

    let read = |consumer: &'static str, mode: ReadMode| {
        let store = store.clone();
        let stream = stream.clone();
        async move {
            store
                .read_group(&stream, GROUP, consumer, mode, 1)
                .await
                .unwrap()
        }
    };
    let new = ReadMode::New { block: BLOCK };

    let delivered = read("c1", new).await;
    assert_eq!(delivered[0].id, first);

    // Only the consumer that read it sees it as pending
    let pending = read("c1", ReadMode::Pending).await;
    assert_eq!(pending, delivered);
    assert!(read("c2", ReadMode::Pending).await.is_empty());
    assert_eq!(store.pending_count(&stream, GROUP).await.unwrap(), 1);

    assert_eq!(store.ack(&stream, GROUP, &[first.clone()]).await.unwrap(), 1);
    assert_eq!(store.ack(&stream, GROUP, &[first]).await.unwrap(), 0);
    assert!(read("c1", ReadMode::Pending).await.is_empty());

    let next = read("c1", new).await;
    assert_eq!(next[0].fields["id"], "2");
    assert!(read("c1", new).await.is_empty());

    store.delete(&stream).await.unwrap();
}

#[tokio::test]
async fn test_memory_gate_codes_and_append() {
    gate_codes_and_in_script_append(memory()).await;
}

#[tokio::test]
async fn test_memory_compare_and_delete() {
    compare_and_delete_spares_foreign_holder(memory()).await;
}

#[tokio::test]
async fn test_memory_pending_redelivery() {
    pending_entries_are_redelivered_to_their_consumer(memory()).await;
}

#[tokio::test]
#[ignore = "needs REDIS_URL"]
async fn test_redis_gate_codes_and_append() {
    if let Some(store) = redis().await {
        gate_codes_and_in_script_append(store).await;
    }
}

#[tokio::test]
#[ignore = "needs REDIS_URL"]
async fn test_redis_compare_and_delete() {
    if let Some(store) = redis().await {
        compare_and_delete_spares_foreign_holder(store).await;
    }
}

#[tokio::test]
#[ignore = "needs REDIS_URL"]
async fn test_redis_pending_redelivery() {
    if let Some(store) = redis().await {
        pending_entries_are_redelivered_to_their_consumer(store).await;
    }
}
