//! Purchase and voucher publishing
//!
//! The purchase path never touches the database for stock: it checks the
//! sale window, takes an order id and asks the stock gate. Everything after
//! admission happens asynchronously in the order worker.

use super::gate::{GateOutcome, StockGate};
use crate::db;
use crate::error::{ServiceError, ServiceResult};
use crate::id_worker::IdWorker;
use crate::store::{DynStore, keys};
use shared::error::{AppError, ErrorCode};
use shared::models::{PurchaseReceipt, SaleWindow, SeckillVoucher, SeckillVoucherCreate};
use shared::util::now_millis;
use sqlx::SqlitePool;

pub const ORDER_ID_NAMESPACE: &str = "order";

#[derive(Clone)]
pub struct SeckillService {
    store: DynStore,
    pool: SqlitePool,
    gate: StockGate,
    ids: IdWorker,
}

impl SeckillService {
    pub fn new(store: DynStore, pool: SqlitePool, gate: StockGate, ids: IdWorker) -> Self {
        Self {
            store,
            pool,
            gate,
            ids,
        }
    }

    /// Attempt to buy one unit of `voucher_id` for `user_id`
    pub async fn purchase(&self, voucher_id: i64, user_id: i64) -> ServiceResult<PurchaseReceipt> {
        let window = self.sale_window(voucher_id).await?;
        let now = now_millis();
        if window.not_started(now) {
            return Err(AppError::new(ErrorCode::SeckillNotStarted).into());
        }
        if window.ended(now) {
            return Err(AppError::new(ErrorCode::SeckillEnded).into());
        }

        let order_id = self.ids.next_id(ORDER_ID_NAMESPACE).await?;
        match self.gate.admit(voucher_id, user_id, order_id).await? {
            GateOutcome::Admitted => {
                tracing::debug!(order_id, user_id, voucher_id, "Purchase admitted");
                Ok(PurchaseReceipt { order_id })
            }
            GateOutcome::OutOfStock => Err(AppError::new(ErrorCode::VoucherOutOfStock).into()),
            GateOutcome::AlreadyAdmitted => Err(AppError::new(ErrorCode::DuplicatePurchase).into()),
            GateOutcome::UnknownVoucher => Err(AppError::new(ErrorCode::VoucherNotFound).into()),
        }
    }

    /// Sale window from the store, falling back to (and re-mirroring) the
    /// voucher row when the store has none
    async fn sale_window(&self, voucher_id: i64) -> ServiceResult<SaleWindow> {
        if let Some(raw) = self.store.get(&keys::window_key(voucher_id)).await? {
            match serde_json::from_str::<SaleWindow>(&raw) {
                Ok(window) => return Ok(window),
                Err(e) => {
                    tracing::warn!(voucher_id, error = %e, "Unreadable sale window, reloading");
                }
            }
        }

        let voucher = db::voucher::find(&self.pool, voucher_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::VoucherNotFound))?;
        let window = SaleWindow {
            begin_time: voucher.begin_time,
            end_time: voucher.end_time,
        };
        self.store
            .set(&keys::window_key(voucher_id), &serde_json::to_string(&window)?, None)
            .await?;
        Ok(window)
    }

    /// Create a flash-sale voucher and open its stock in the store
    pub async fn publish_voucher(&self, data: SeckillVoucherCreate) -> ServiceResult<SeckillVoucher> {
        if data.stock < 0 {
            return Err(AppError::validation("stock must not be negative")
                .with_detail("stock", data.stock)
                .into());
        }
        if data.end_time <= data.begin_time {
            return Err(AppError::validation("end_time must be after begin_time").into());
        }

        let voucher = match db::voucher::insert(&self.pool, &data, now_millis()).await {
            Ok(voucher) => voucher,
            Err(e) if db::is_unique_violation(&e) => {
                return Err(AppError::with_message(
                    ErrorCode::AlreadyExists,
                    format!("Voucher {} already published", data.voucher_id),
                )
                .with_detail("voucherId", data.voucher_id)
                .into());
            }
            Err(e) => return Err(ServiceError::from(e)),
        };

        let window = SaleWindow {
            begin_time: voucher.begin_time,
            end_time: voucher.end_time,
        };
        self.store
            .set(&keys::window_key(voucher.voucher_id), &serde_json::to_string(&window)?, None)
            .await?;
        self.gate.publish(voucher.voucher_id, voucher.stock).await?;

        tracing::info!(voucher_id = voucher.voucher_id, stock = voucher.stock, "Voucher published");
        Ok(voucher)
    }
}
