//! Health check endpoint

use axum::Json;
use axum::extract::State;
use http::StatusCode;

use crate::core::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let (status, store) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };
    let pending = state.queue.pending_count().await.ok();

    (
        status,
        Json(serde_json::json!({
            "status": if status == StatusCode::OK { "ok" } else { "degraded" },
            "service": "seckill-server",
            "version": env!("CARGO_PKG_VERSION"),
            "store": store,
            "pendingOrders": pending,
        })),
    )
}
