//! Flash-sale API
//!
//! - `POST /voucher-order/seckill/{voucher_id}` - buy one unit
//! - `POST /voucher/seckill` - publish a flash-sale voucher

use axum::Json;
use axum::extract::{Path, State};
use shared::ApiResponse;
use shared::models::{PurchaseReceipt, SeckillVoucher, SeckillVoucherCreate};

use super::auth::CurrentUser;
use crate::core::AppState;
use crate::error::ServiceResult;

pub async fn purchase(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(voucher_id): Path<i64>,
) -> ServiceResult<ApiResponse<PurchaseReceipt>> {
    let receipt = state.seckill.purchase(voucher_id, user.id()).await?;
    Ok(ApiResponse::success(receipt))
}

pub async fn publish(
    State(state): State<AppState>,
    Json(payload): Json<SeckillVoucherCreate>,
) -> ServiceResult<ApiResponse<SeckillVoucher>> {
    let voucher = state.seckill.publish_voucher(payload).await?;
    Ok(ApiResponse::success(voucher))
}
