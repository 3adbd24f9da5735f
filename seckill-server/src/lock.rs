//! Distributed lease lock
//!
//! A lease is a store key `lock:<resource>` holding the holder id, with a
//! native TTL. Acquisition is one atomic set-if-absent and never waits;
//! release is one atomic compare-and-delete, so a holder whose lease already
//! expired can never remove a lease someone else has since taken.
//!
//! ```rust,ignore
//! let lock = DistributedLock::new(store.clone(), format!("order:{user_id}"));
//! if lock.try_lock(Duration::from_secs(10)).await? {
//!     // critical section
//!     lock.unlock().await?;
//! }
//! ```

use crate::store::{DynStore, StoreResult, keys};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Random per-process prefix; together with the counter below it makes
/// holder ids unique across every server instance sharing the store
static PROCESS_ID: LazyLock<String> = LazyLock::new(|| uuid::Uuid::new_v4().simple().to_string());
static NEXT_HOLDER: AtomicU64 = AtomicU64::new(1);

pub struct DistributedLock {
    store: DynStore,
    key: String,
    holder_id: String,
}

impl DistributedLock {
    /// Lock handle for `resource` (e.g. `order:42`); acquires nothing yet
    pub fn new(store: DynStore, resource: impl AsRef<str>) -> Self {
        let seq = NEXT_HOLDER.fetch_add(1, Ordering::Relaxed);
        Self {
            store,
            key: keys::lock_key(resource.as_ref()),
            holder_id: format!("{}-{}", *PROCESS_ID, seq),
        }
    }

    /// Try to take the lease for `lease`; false if somebody holds it
    pub async fn try_lock(&self, lease: Duration) -> StoreResult<bool> {
        self.store
            .set_if_absent(&self.key, &self.holder_id, lease)
            .await
    }

    /// Release the lease if this handle still owns it.
    ///
    /// Returns false when the lease had already expired (and possibly been
    /// taken by another holder, which stays untouched).
    pub async fn unlock(&self) -> StoreResult<bool> {
        let released = self
            .store
            .compare_and_delete(&self.key, &self.holder_id)
            .await?;
        if !released {
            tracing::warn!(
                lock = %self.key,
                holder = %self.holder_id,
                "Lease was no longer held at unlock"
            );
        }
        Ok(released)
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SharedStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_holder_ids_are_unique() {
        let store: DynStore = Arc::new(MemoryStore::new());
        let a = DistributedLock::new(store.clone(), "order:1");
        let b = DistributedLock::new(store, "order:1");
        assert_ne!(a.holder_id(), b.holder_id());
        assert_eq!(a.key(), "lock:order:1");
    }

    #[tokio::test]
    async fn test_second_holder_is_refused() {
        let store: DynStore = Arc::new(MemoryStore::new());
        let a = DistributedLock::new(store.clone(), "order:1");
        let b = DistributedLock::new(store.clone(), "order:1");

        assert!(a.try_lock(Duration::from_secs(10)).await.unwrap());
        assert!(!b.try_lock(Duration::from_secs(10)).await.unwrap());
        // b cannot release a's lease
        assert!(!b.unlock().await.unwrap());
        assert!(a.unlock().await.unwrap());
        assert!(b.try_lock(Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_holder_cannot_release_successor() {
        let store: DynStore = Arc::new(MemoryStore::new());
        let a = DistributedLock::new(store.clone(), "order:7");
        let b = DistributedLock::new(store.clone(), "order:7");

        assert!(a.try_lock(Duration::from_millis(100)).await.unwrap());
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(b.try_lock(Duration::from_secs(10)).await.unwrap());

        assert!(!a.unlock().await.unwrap());
        assert_eq!(
            store.get("lock:order:7").await.unwrap().as_deref(),
            Some(b.holder_id())
        );
    }
}
