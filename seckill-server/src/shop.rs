//! Shop reads (through the cache) and writes (database first, then invalidate)

use crate::cache::{EntityLoader, LogicalExpireCache, PassThroughCache, RebuildPool};
use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{DynStore, keys};
use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{Shop, ShopUpdate};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

fn shop_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::ShopNotFound).with_detail("shopId", id)
}

/// Loads shops from `tb_shop`
pub struct ShopLoader {
    pool: SqlitePool,
}

impl ShopLoader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityLoader<Shop> for ShopLoader {
    async fn load(&self, id: i64) -> Result<Option<Shop>, ServiceError> {
        Ok(db::shop::find(&self.pool, id).await?)
    }
}

/// Which cache strategy serves `GET /shop/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShopCacheMode {
    #[default]
    LogicalExpire,
    PassThrough,
    Mutex,
}

impl FromStr for ShopCacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "logical" | "logical_expire" => Ok(ShopCacheMode::LogicalExpire),
            "passthrough" | "pass_through" => Ok(ShopCacheMode::PassThrough),
            "mutex" => Ok(ShopCacheMode::Mutex),
            other => Err(format!("unknown shop cache mode: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct ShopService {
    pool: SqlitePool,
    mode: ShopCacheMode,
    logical: LogicalExpireCache<Shop>,
    pass_through: PassThroughCache<Shop>,
}

impl ShopService {
    pub fn new(
        store: DynStore,
        pool: SqlitePool,
        rebuild_pool: RebuildPool,
        mode: ShopCacheMode,
        logical_ttl: Duration,
    ) -> Self {
        let loader: Arc<dyn EntityLoader<Shop>> = Arc::new(ShopLoader::new(pool.clone()));
        Self {
            logical: LogicalExpireCache::new(
                store.clone(),
                loader.clone(),
                rebuild_pool,
                "shop",
                logical_ttl,
            ),
            pass_through: PassThroughCache::new(store, loader, "shop", keys::CACHE_SHOP_TTL),
            pool,
            mode,
        }
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Shop> {
        let shop = match self.mode {
            ShopCacheMode::LogicalExpire => self.logical.get(id).await?,
            ShopCacheMode::PassThrough => self.pass_through.get(id).await?,
            ShopCacheMode::Mutex => self.pass_through.get_with_mutex(id).await?,
        };
        shop.ok_or_else(|| shop_not_found(id).into())
    }

    /// Update the row, then drop the cached copy
    pub async fn update(&self, data: ShopUpdate) -> ServiceResult<()> {
        let Some(id) = data.id else {
            return Err(AppError::validation("shop id is required").into());
        };
        if !db::shop::update(&self.pool, id, &data, shared::util::now_millis()).await? {
            return Err(shop_not_found(id).into());
        }
        self.logical.invalidate(id).await?;
        Ok(())
    }

    /// Pre-load hot shops into the logical cache
    pub async fn warm(&self, ids: &[i64]) {
        for &id in ids {
            match self.logical.warm(id).await {
                Ok(true) => tracing::info!(shop_id = id, "Shop cache warmed"),
                Ok(false) => tracing::warn!(shop_id = id, "Warm-up skipped, shop not found"),
                Err(e) => tracing::warn!(shop_id = id, error = %e, "Shop warm-up failed"),
            }
        }
    }
}
