//! Cache-aside layer for hot, read-mostly entities
//!
//! # Strategies
//!
//! - [`LogicalExpireCache`] - entries carry their own expiry and never vanish
//!   from the store; an expired entry is still served while one caller
//!   refreshes it in the background ([`RebuildPool`])
//! - [`PassThroughCache`] - classic cache-aside with native TTL, plus a
//!   mutex-guarded variant that lets a single caller reload a missing entry
//!
//! Both store the same JSON envelope (`{"data": ..., "expireTime": ...}`),
//! so switching strategies never leaves unreadable entries behind. Absent
//! entities are cached as `data: null` with a short native TTL so lookups
//! of nonexistent ids do not keep reaching the database.

mod logical;
mod pass_through;
mod pool;

pub use logical::LogicalExpireCache;
pub use pass_through::PassThroughCache;
pub use pool::RebuildPool;

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of truth behind a cache
#[async_trait]
pub trait EntityLoader<T>: Send + Sync {
    /// Load the entity; `Ok(None)` when it does not exist
    async fn load(&self, id: i64) -> Result<Option<T>, ServiceError>;
}

/// Stored cache value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub data: Option<T>,
    /// Logical expiry (Unix millis)
    pub expire_time: i64,
}

impl<T> Envelope<T> {
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expire_time > now
    }
}
