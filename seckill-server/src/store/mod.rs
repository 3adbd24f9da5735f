//! Shared store seam
//!
//! Every cross-request coordination primitive the flash-sale core relies on
//! goes through [`SharedStore`]. There is no in-process lock standing in for
//! these: the store executes each operation (or script) as one indivisible
//! step.
//!
//! # Primitives
//!
//! | Operation | Redis | Used by |
//! |-----------|-------|---------|
//! | `set_if_absent` | `SET NX PX` | lease acquisition |
//! | `compare_and_delete` | unlock script | lease release |
//! | `stock_gate` | seckill script (+ `XADD`) | purchase admission |
//! | `increment` | `INCR` | id worker |
//! | `append` / `read_group` / `ack` | `XADD` / `XREADGROUP` / `XACK` | order queue |
//! | `get` / `set` / `delete` / `expire` | plain strings | cache, sessions |
//!
//! # Backends
//!
//! - [`RedisStore`]: production backend
//! - [`MemoryStore`]: single-process emulation with the same atomicity,
//!   used by tests and `STORE_BACKEND=memory` development runs

pub mod keys;
mod memory;
mod redis_store;
mod scripts;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Store errors
///
/// Every variant is a transient infrastructure failure from the caller's
/// point of view: the purchase path surfaces it as "retry later", the queue
/// consumer falls back to pending-list draining.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected store reply: {0}")]
    UnexpectedReply(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle used throughout the server
pub type DynStore = Arc<dyn SharedStore>;

/// Raw outcome codes of the stock gate script
pub mod gate_code {
    /// Admitted: stock decremented, user recorded, entry appended
    pub const ADMITTED: i64 = 0;
    /// Stock exhausted, nothing mutated
    pub const OUT_OF_STOCK: i64 = 1;
    /// User already admitted for this voucher, nothing mutated
    pub const ALREADY_ADMITTED: i64 = 2;
    /// No stock counter exists for the voucher
    pub const UNKNOWN_VOUCHER: i64 = 3;
}

/// One delivered stream entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Store-assigned entry id (`<millis>-<seq>`)
    pub id: String,
    pub fields: HashMap<String, String>,
}

/// How a consumer-group read selects entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Entries never delivered to the group, blocking up to `block`
    New { block: Duration },
    /// This consumer's own delivered-but-unacknowledged entries (never blocks)
    Pending,
}

#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Liveness probe
    async fn ping(&self) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Plain write; `ttl: None` keeps the key until deleted
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Reset the native TTL of an existing key; false if the key is absent
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Atomic set-if-absent with TTL
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Atomic compare-and-delete: removes `key` only while it still holds `expected`
    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<bool>;

    /// Atomic increment; a missing key counts from zero
    async fn increment(&self, key: &str) -> StoreResult<i64>;

    /// Atomic check-and-decrement for one purchase attempt.
    ///
    /// Returns one of [`gate_code`]. On `ADMITTED` the queue entry
    /// `{id: order_id, userId, voucherId}` is appended to `stream` inside the
    /// same atomic step.
    async fn stock_gate(
        &self,
        voucher_id: i64,
        user_id: i64,
        order_id: i64,
        stream: &str,
    ) -> StoreResult<i64>;

    /// Write a voucher's stock counter (publishing a voucher)
    async fn seed_stock(&self, voucher_id: i64, stock: i64) -> StoreResult<()>;

    /// Forget every admitted user of a voucher
    async fn reset_admissions(&self, voucher_id: i64) -> StoreResult<()>;

    /// Create the consumer group (and stream) if missing
    async fn ensure_group(&self, stream: &str, group: &str) -> StoreResult<()>;

    /// Append an entry; returns the assigned entry id
    async fn append(&self, stream: &str, fields: &[(&str, String)]) -> StoreResult<String>;

    async fn read_group(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        mode: ReadMode,
        count: usize,
    ) -> StoreResult<Vec<StreamEntry>>;

    /// Acknowledge entries; returns how many left the pending list
    async fn ack(&self, stream: &str, group: &str, ids: &[String]) -> StoreResult<usize>;

    /// Total pending entries across the group
    async fn pending_count(&self, stream: &str, group: &str) -> StoreResult<usize>;
}
