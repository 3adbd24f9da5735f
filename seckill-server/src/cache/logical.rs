use super::{EntityLoader, Envelope, RebuildPool};
use crate::error::ServiceError;
use crate::lock::DistributedLock;
use crate::store::{DynStore, keys};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::util::now_millis;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

struct Inner<T> {
    store: DynStore,
    loader: Arc<dyn EntityLoader<T>>,
    /// e.g. `cache:shop:`
    key_prefix: String,
    /// e.g. `shop:` (lease key `lock:shop:<id>`)
    lock_resource: String,
    logical_ttl: Duration,
    lock_lease: Duration,
    _entity: PhantomData<fn() -> T>,
}

/// Cache whose entries expire logically: readers always get an answer
/// immediately, and at most one caller system-wide refreshes an expired
/// entry at a time.
pub struct LogicalExpireCache<T> {
    inner: Arc<Inner<T>>,
    pool: RebuildPool,
}

impl<T> Clone for LogicalExpireCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<T> LogicalExpireCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        store: DynStore,
        loader: Arc<dyn EntityLoader<T>>,
        pool: RebuildPool,
        entity: &str,
        logical_ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                loader,
                key_prefix: format!("cache:{entity}:"),
                lock_resource: format!("{entity}:"),
                logical_ttl,
                lock_lease: keys::REBUILD_LOCK_TTL,
                _entity: PhantomData,
            }),
            pool,
        }
    }

    pub fn key(&self, id: i64) -> String {
        format!("{}{}", self.inner.key_prefix, id)
    }

    /// Cached entity, `None` if it does not exist.
    ///
    /// Fresh entries are returned as-is. Expired entries are returned as-is
    /// too, after scheduling a background refresh if this caller wins the
    /// rebuild lock. Only a true miss reads the source synchronously.
    pub async fn get(&self, id: i64) -> Result<Option<T>, ServiceError> {
        let key = self.key(id);
        let Some(raw) = self.inner.store.get(&key).await? else {
            return self.inner.load_and_store(id).await;
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Unreadable cache entry, reloading");
                return self.inner.load_and_store(id).await;
            }
        };

        let fresh = envelope.is_fresh(now_millis());
        // Cached absence
        let Some(data) = envelope.data else {
            return Ok(None);
        };
        if fresh {
            return Ok(Some(data));
        }

        self.try_schedule_rebuild(id).await;
        Ok(Some(data))
    }

    async fn try_schedule_rebuild(&self, id: i64) {
        let lock = DistributedLock::new(
            self.inner.store.clone(),
            format!("{}{}", self.inner.lock_resource, id),
        );
        match lock.try_lock(self.inner.lock_lease).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                tracing::warn!(id, error = %e, "Rebuild lock unavailable, serving stale entry");
                return;
            }
        }

        let inner = self.inner.clone();
        let scheduled = self.pool.spawn(async move {
            if let Err(e) = inner.rebuild(id).await {
                tracing::warn!(id, error = %e, "Cache rebuild failed");
            }
            if let Err(e) = lock.unlock().await {
                tracing::warn!(id, error = %e, "Failed to release rebuild lock");
            }
        });
        if !scheduled {
            tracing::debug!(id, "Rebuild not scheduled, lease left to expire");
        }
    }

    /// Pre-load an entry ahead of traffic; returns whether the entity exists
    pub async fn warm(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.inner.load_and_store(id).await?.is_some())
    }

    /// Drop the entry so the next read goes to the source
    pub async fn invalidate(&self, id: i64) -> Result<(), ServiceError> {
        self.inner.store.delete(&self.key(id)).await?;
        Ok(())
    }
}

impl<T> Inner<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load_and_store(&self, id: i64) -> Result<Option<T>, ServiceError> {
        let data = self.loader.load(id).await?;
        self.store_envelope(id, data.as_ref()).await?;
        Ok(data)
    }

    async fn store_envelope(&self, id: i64, data: Option<&T>) -> Result<(), ServiceError> {
        let key = format!("{}{}", self.key_prefix, id);
        let (expire_time, native_ttl) = match data {
            Some(_) => (now_millis() + self.logical_ttl.as_millis() as i64, None),
            None => (
                now_millis() + keys::CACHE_NULL_TTL.as_millis() as i64,
                Some(keys::CACHE_NULL_TTL),
            ),
        };
        let raw = serde_json::to_string(&Envelope { data, expire_time })?;
        self.store.set(&key, &raw, native_ttl).await?;
        Ok(())
    }

    /// Background refresh, run while holding the rebuild lock
    async fn rebuild(&self, id: i64) -> Result<(), ServiceError> {
        // Another holder may have refreshed the entry between our stale read
        // and acquiring the lock
        let key = format!("{}{}", self.key_prefix, id);
        if let Some(raw) = self.store.get(&key).await?
            && let Ok(current) = serde_json::from_str::<Envelope<T>>(&raw)
            && current.is_fresh(now_millis())
        {
            return Ok(());
        }

        let data = self.loader.load(id).await?;
        self.store_envelope(id, data.as_ref()).await?;
        tracing::debug!(key = %key, "Cache entry rebuilt");
        Ok(())
    }
}
