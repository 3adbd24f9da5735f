//! Shop API

use axum::Json;
use axum::extract::{Path, State};
use shared::ApiResponse;
use shared::models::{Shop, ShopUpdate};

use crate::core::AppState;
use crate::error::ServiceResult;

/// GET /shop/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServiceResult<ApiResponse<Shop>> {
    let shop = state.shops.get(id).await?;
    Ok(ApiResponse::success(shop))
}

/// PUT /shop
pub async fn update(
    State(state): State<AppState>,
    Json(payload): Json<ShopUpdate>,
) -> ServiceResult<ApiResponse<()>> {
    state.shops.update(payload).await?;
    Ok(ApiResponse::ok())
}
