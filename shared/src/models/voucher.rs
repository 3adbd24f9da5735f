//! Flash-sale Voucher Model

use serde::{Deserialize, Serialize};

/// Flash-sale voucher row (relational source of truth for stock)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SeckillVoucher {
    pub voucher_id: i64,
    /// Remaining units; never negative
    pub stock: i64,
    /// Sale window start (Unix millis)
    pub begin_time: i64,
    /// Sale window end (Unix millis)
    pub end_time: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Publish voucher payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeckillVoucherCreate {
    pub voucher_id: i64,
    pub stock: i64,
    pub begin_time: i64,
    pub end_time: i64,
}

/// Sale window mirrored into the shared store so the purchase path can
/// validate timing without a database round trip
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaleWindow {
    pub begin_time: i64,
    pub end_time: i64,
}

impl SaleWindow {
    /// Whether `now` (Unix millis) is before the window opens
    pub fn not_started(&self, now: i64) -> bool {
        now < self.begin_time
    }

    /// Whether `now` (Unix millis) is after the window closes
    pub fn ended(&self, now: i64) -> bool {
        now > self.end_time
    }
}
