//! Atomic stock gate
//!
//! One store round trip decides a purchase attempt: voucher known, buyer not
//! yet admitted, stock left. On admission the stock is decremented, the buyer
//! recorded and the order entry appended to the queue in the same step, so
//! an admitted buyer can never be lost between the gate and the queue.

use crate::store::{DynStore, StoreError, StoreResult, gate_code};

/// Purchase attempt outcome; contention results are values, not errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Admitted,
    OutOfStock,
    AlreadyAdmitted,
    UnknownVoucher,
}

impl GateOutcome {
    pub fn from_code(code: i64) -> StoreResult<Self> {
        match code {
            gate_code::ADMITTED => Ok(GateOutcome::Admitted),
            gate_code::OUT_OF_STOCK => Ok(GateOutcome::OutOfStock),
            gate_code::ALREADY_ADMITTED => Ok(GateOutcome::AlreadyAdmitted),
            gate_code::UNKNOWN_VOUCHER => Ok(GateOutcome::UnknownVoucher),
            other => Err(StoreError::UnexpectedReply(format!(
                "stock gate returned {other}"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct StockGate {
    store: DynStore,
    stream: String,
}

impl StockGate {
    /// `stream` is where admitted orders are appended
    pub fn new(store: DynStore, stream: impl Into<String>) -> Self {
        Self {
            store,
            stream: stream.into(),
        }
    }

    pub async fn admit(
        &self,
        voucher_id: i64,
        user_id: i64,
        order_id: i64,
    ) -> StoreResult<GateOutcome> {
        let code = self
            .store
            .stock_gate(voucher_id, user_id, order_id, &self.stream)
            .await?;
        GateOutcome::from_code(code)
    }

    /// Open a voucher for sale: set its counter and forget past buyers
    pub async fn publish(&self, voucher_id: i64, stock: i64) -> StoreResult<()> {
        self.store.reset_admissions(voucher_id).await?;
        self.store.seed_stock(voucher_id, stock).await
    }
}
