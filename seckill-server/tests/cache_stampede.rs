use async_trait::async_trait;
use seckill_server::cache::{EntityLoader, Envelope, LogicalExpireCache, PassThroughCache, RebuildPool};
use seckill_server::{DynStore, MemoryStore, ServiceError, SharedStore};
use shared::util::now_millis;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

struct SlowLoader {
    loads: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl EntityLoader<String> for SlowLoader {
    async fn load(&self, id: i64) -> Result<Option<String>, ServiceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Some(format!("shop-{id}-v2")))
    }
}

fn slow_loader(delay: Duration) -> Arc<SlowLoader> {
    Arc::new(SlowLoader {
        loads: AtomicUsize::new(0),
        delay,
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_expired_entry_is_rebuilt_once_under_load() {
    let store: DynStore = Arc::new(MemoryStore::new());
    let loader = slow_loader(Duration::from_millis(300));
    let pool = RebuildPool::new(4);
    let source: Arc<dyn EntityLoader<String>> = loader.clone();
    let cache = LogicalExpireCache::new(
        store.clone(),
        source,
        pool.clone(),
        "shop",
        Duration::from_secs(60),
    );

    let stale = Envelope {
        data: Some("shop-1-v1".to_string()),
        expire_time: now_millis() - 1,
    };
    store
        .set("cache:shop:1", &serde_json::to_string(&stale).unwrap(), None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let started = Instant::now();
            let value = cache.get(1).await.unwrap();
            (value, started.elapsed())
        }));
    }
    for handle in handles {
        let (value, elapsed) = handle.await.unwrap();
        // Everyone is served the stale value without waiting for the reload
        assert_eq!(value.as_deref(), Some("shop-1-v1"));
        assert!(elapsed < Duration::from_millis(250), "reader waited {elapsed:?}");
    }

    pool.close();
    pool.wait().await;
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get(1).await.unwrap().as_deref(), Some("shop-1-v2"));
    // Rebuild lease released
    assert!(store.get("lock:shop:1").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mutex_pass_through_loads_once_under_load() {
    let store: DynStore = Arc::new(MemoryStore::new());
    let loader = slow_loader(Duration::from_millis(200));
    let source: Arc<dyn EntityLoader<String>> = loader.clone();
    let cache = PassThroughCache::new(store.clone(), source, "shop", Duration::from_secs(60));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.get_with_mutex(2).await.unwrap() }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().as_deref(), Some("shop-2-v2"));
    }
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}
