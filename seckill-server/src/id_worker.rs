//! Globally unique, time-ordered 64-bit ids
//!
//! ```text
//! | 1 sign (0) | 31 seconds since 2022-01-01T00:00:00Z | 32 per-day sequence |
//! ```
//!
//! The sequence comes from an atomic store counter keyed by namespace and
//! UTC day (`icr:<namespace>:<yyyy:MM:dd>`), so any number of processes can
//! issue ids without coordinating with each other.

use crate::store::{DynStore, StoreError, StoreResult, keys};
use chrono::{DateTime, Utc};

/// 2022-01-01T00:00:00Z
pub const BEGIN_TIMESTAMP: i64 = 1_640_995_200;
const COUNT_BITS: u32 = 32;

#[derive(Clone)]
pub struct IdWorker {
    store: DynStore,
}

impl IdWorker {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn next_id(&self, namespace: &str) -> StoreResult<i64> {
        self.next_id_at(namespace, Utc::now()).await
    }

    async fn next_id_at(&self, namespace: &str, now: DateTime<Utc>) -> StoreResult<i64> {
        let timestamp = now.timestamp() - BEGIN_TIMESTAMP;
        let key = format!(
            "{}{}:{}",
            keys::ID_COUNTER_KEY,
            namespace,
            now.format("%Y:%m:%d")
        );
        let count = self.store.increment(&key).await?;
        compose(timestamp, count)
    }
}

fn compose(timestamp: i64, count: i64) -> StoreResult<i64> {
    if !(0..(1 << COUNT_BITS)).contains(&count) {
        return Err(StoreError::UnexpectedReply(format!(
            "id sequence {count} does not fit in {COUNT_BITS} bits"
        )));
    }
    Ok((timestamp << COUNT_BITS) | count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SharedStore};
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn test_compose_layout() {
        let id = compose(5, 3).unwrap();
        assert_eq!(id >> 32, 5);
        assert_eq!(id & 0xFFFF_FFFF, 3);
        assert!(compose(5, 1 << 32).is_err());
    }

    #[tokio::test]
    async fn test_day_key_and_sequence() {
        let store = Arc::new(MemoryStore::new());
        let worker = IdWorker::new(store.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();

        let first = worker.next_id_at("order", now).await.unwrap();
        let second = worker.next_id_at("order", now).await.unwrap();
        assert_eq!(second, first + 1);
        assert_eq!(first >> 32, now.timestamp() - BEGIN_TIMESTAMP);
        assert_eq!(
            store.get("icr:order:2024:03:09").await.unwrap().as_deref(),
            Some("2")
        );
    }

    #[tokio::test]
    async fn test_namespaces_count_independently() {
        let store = Arc::new(MemoryStore::new());
        let worker = IdWorker::new(store);
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();

        let order = worker.next_id_at("order", now).await.unwrap();
        let shop = worker.next_id_at("shop", now).await.unwrap();
        assert_eq!(order & 0xFFFF_FFFF, 1);
        assert_eq!(shop & 0xFFFF_FFFF, 1);
    }
}
