//! Order materialization
//!
//! Turns one admitted queue entry into a persistent order. The per-buyer
//! lease (`lock:order:<userId>`) serializes materialization for a buyer
//! across every worker; inside it the existing-order check, the guarded stock
//! decrement and the insert run in one SQL transaction.
//!
//! A busy lease is reported as [`Materialized::LockBusy`] and the caller
//! decides: the worker drops a first delivery, and leaves a redelivered entry
//! pending until the lease frees.

use super::queue::OrderEntry;
use crate::db;
use crate::error::QueueError;
use crate::lock::DistributedLock;
use crate::store::{DynStore, keys};
use shared::models::VoucherOrder;
use sqlx::SqlitePool;
use std::time::Duration;

/// How an entry was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    Created,
    /// Buyer already owns an order for this voucher
    Duplicate,
    /// Relational stock already exhausted
    OutOfStock,
    /// Buyer lease held elsewhere; nothing written
    LockBusy,
}

pub struct OrderMaterializer {
    store: DynStore,
    pool: SqlitePool,
    lease: Duration,
}

impl OrderMaterializer {
    pub fn new(store: DynStore, pool: SqlitePool, lease: Duration) -> Self {
        Self { store, pool, lease }
    }

    pub async fn materialize(&self, entry: &OrderEntry) -> Result<Materialized, QueueError> {
        let lock = DistributedLock::new(
            self.store.clone(),
            format!("{}{}", keys::LOCK_ORDER_RESOURCE, entry.user_id),
        );
        if !lock.try_lock(self.lease).await? {
            tracing::warn!(
                order_id = entry.order_id,
                user_id = entry.user_id,
                voucher_id = entry.voucher_id,
                "Buyer lease busy"
            );
            return Ok(Materialized::LockBusy);
        }

        let result = self.persist(entry).await;

        if let Err(e) = lock.unlock().await {
            tracing::warn!(user_id = entry.user_id, error = %e, "Failed to release buyer lease");
        }
        result
    }

    async fn persist(&self, entry: &OrderEntry) -> Result<Materialized, QueueError> {
        let now = shared::util::now_millis();
        let mut tx = self.pool.begin().await?;

        if db::order::exists_for_user(&mut *tx, entry.user_id, entry.voucher_id).await? {
            return Ok(Materialized::Duplicate);
        }

        if !db::voucher::decrement_stock(&mut *tx, entry.voucher_id, now).await? {
            return Ok(Materialized::OutOfStock);
        }

        let order = VoucherOrder {
            id: entry.order_id,
            user_id: entry.user_id,
            voucher_id: entry.voucher_id,
            created_at: now,
        };
        match db::order::insert(&mut *tx, &order).await {
            Ok(()) => {}
            // Dropping `tx` rolls the stock decrement back
            Err(e) if db::is_unique_violation(&e) => return Ok(Materialized::Duplicate),
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(Materialized::Created)
    }
}
