//! Application state shared by HTTP handlers and background workers

use super::config::{Config, StoreBackend};
use crate::cache::RebuildPool;
use crate::db::DbService;
use crate::id_worker::IdWorker;
use crate::seckill::{OrderMaterializer, OrderQueue, QueueSettings, SeckillService, StockGate};
use crate::shop::ShopService;
use crate::store::{DynStore, MemoryStore, RedisStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: DynStore,
    pub db: DbService,
    pub seckill: SeckillService,
    pub shops: ShopService,
    pub queue: OrderQueue,
    pub materializer: Arc<OrderMaterializer>,
    pub rebuild_pool: RebuildPool,
}

impl AppState {
    /// Connect the configured store and database, then wire every service
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store: DynStore = match config.store_backend {
            StoreBackend::Redis => Arc::new(RedisStore::connect(&config.redis_url).await?),
            StoreBackend::Memory => {
                tracing::warn!("Using in-process store; do not run more than one instance");
                Arc::new(MemoryStore::new())
            }
        };
        let db = DbService::new(&config.database_path).await?;
        Ok(Self::from_parts(config, store, db))
    }

    /// Wire services over an existing store and database
    pub fn from_parts(config: Config, store: DynStore, db: DbService) -> Self {
        let queue = OrderQueue::new(
            store.clone(),
            QueueSettings {
                stream: config.order_stream.clone(),
                group: config.order_group.clone(),
                consumer: config.order_consumer.clone(),
                block: config.consume_block,
            },
        );
        let gate = StockGate::new(store.clone(), config.order_stream.clone());
        let ids = IdWorker::new(store.clone());
        let seckill = SeckillService::new(store.clone(), db.pool.clone(), gate, ids);

        let rebuild_pool = RebuildPool::new(config.rebuild_concurrency);
        let shops = ShopService::new(
            store.clone(),
            db.pool.clone(),
            rebuild_pool.clone(),
            config.shop_cache_mode,
            config.cache_logical_ttl,
        );
        let materializer = Arc::new(OrderMaterializer::new(
            store.clone(),
            db.pool.clone(),
            config.order_lock_lease,
        ));

        Self {
            config,
            store,
            db,
            seckill,
            shops,
            queue,
            materializer,
            rebuild_pool,
        }
    }
}
