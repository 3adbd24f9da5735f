use super::{EntityLoader, Envelope};
use crate::error::ServiceError;
use crate::lock::DistributedLock;
use crate::store::{DynStore, keys};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;

const MUTEX_RETRY_DELAY: Duration = Duration::from_millis(50);
const MUTEX_MAX_ATTEMPTS: usize = 20;

/// Lookup result read straight from the store
enum Cached<T> {
    Hit(Option<T>),
    Miss,
}

/// Classic cache-aside with a native TTL on every entry
pub struct PassThroughCache<T> {
    store: DynStore,
    loader: Arc<dyn EntityLoader<T>>,
    key_prefix: String,
    lock_resource: String,
    ttl: Duration,
}

impl<T> Clone for PassThroughCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            loader: self.loader.clone(),
            key_prefix: self.key_prefix.clone(),
            lock_resource: self.lock_resource.clone(),
            ttl: self.ttl,
        }
    }
}

impl<T> PassThroughCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(store: DynStore, loader: Arc<dyn EntityLoader<T>>, entity: &str, ttl: Duration) -> Self {
        Self {
            store,
            loader,
            key_prefix: format!("cache:{entity}:"),
            lock_resource: format!("{entity}:"),
            ttl,
        }
    }

    fn key(&self, id: i64) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    async fn lookup(&self, id: i64) -> Result<Cached<T>, ServiceError> {
        let key = self.key(id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(Cached::Miss);
        };
        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(envelope) => Ok(Cached::Hit(envelope.data)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Unreadable cache entry, treating as miss");
                Ok(Cached::Miss)
            }
        }
    }

    async fn load_and_store(&self, id: i64) -> Result<Option<T>, ServiceError> {
        let data = self.loader.load(id).await?;
        let ttl = if data.is_some() {
            self.ttl
        } else {
            keys::CACHE_NULL_TTL
        };
        let raw = serde_json::to_string(&Envelope {
            data: data.as_ref(),
            expire_time: now_millis() + ttl.as_millis() as i64,
        })?;
        self.store.set(&self.key(id), &raw, Some(ttl)).await?;
        Ok(data)
    }

    /// Cached entity; on a miss every caller reads the source itself
    pub async fn get(&self, id: i64) -> Result<Option<T>, ServiceError> {
        match self.lookup(id).await? {
            Cached::Hit(data) => Ok(data),
            Cached::Miss => self.load_and_store(id).await,
        }
    }

    /// Cached entity; on a miss only the rebuild-lock holder reads the
    /// source while the others back off and re-check the cache
    pub async fn get_with_mutex(&self, id: i64) -> Result<Option<T>, ServiceError> {
        for _ in 0..MUTEX_MAX_ATTEMPTS {
            if let Cached::Hit(data) = self.lookup(id).await? {
                return Ok(data);
            }

            let lock = DistributedLock::new(
                self.store.clone(),
                format!("{}{}", self.lock_resource, id),
            );
            if !lock.try_lock(keys::REBUILD_LOCK_TTL).await? {
                tokio::time::sleep(MUTEX_RETRY_DELAY).await;
                continue;
            }

            // Whoever held the lock before us may have filled the entry
            let result = match self.lookup(id).await {
                Ok(Cached::Hit(data)) => Ok(data),
                Ok(Cached::Miss) => self.load_and_store(id).await,
                Err(e) => Err(e),
            };
            lock.unlock().await?;
            return result;
        }

        tracing::warn!(id, "Rebuild lock contended too long, reading source directly");
        self.loader.load(id).await
    }

    pub async fn invalidate(&self, id: i64) -> Result<(), ServiceError> {
        self.store.delete(&self.key(id)).await?;
        Ok(())
    }
}
