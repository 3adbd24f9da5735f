//! Error value and response envelope shared by the server and its clients

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Extra context attached to an error, rendered in key order
pub type Details = BTreeMap<String, Value>;

/// Seconds a client should wait before retrying a retryable failure
const RETRY_AFTER_SECS: &str = "1";

/// A business or system failure with a stable client-facing code
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Details,
}

impl AppError {
    /// Error carrying the canonical message of `code`
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Details::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// The same request may succeed once the shared store recovers
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }
}

/// JSON envelope for every HTTP reply
///
/// `code` is 0 on success. Failures carry the [`ErrorCode`] value, its
/// message and any details; `data` is only present on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: Details,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::ok_with(Some(data))
    }

    fn ok_with(data: Option<T>) -> Self {
        Self {
            code: 0,
            message: "OK".to_string(),
            data,
            details: Details::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    fn status(&self) -> StatusCode {
        if self.is_success() {
            return StatusCode::OK;
        }
        ErrorCode::try_from(self.code)
            .map(|c| c.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl ApiResponse<()> {
    /// Success with no payload, e.g. after a shop update
    pub fn ok() -> Self {
        Self::ok_with(None)
    }

    pub fn error(err: &AppError) -> Self {
        err.clone().into()
    }
}

impl<T> From<AppError> for ApiResponse<T> {
    fn from(err: AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message,
            data: None,
            details: err.details,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self.code.category() {
            ErrorCategory::System => {
                tracing::error!(code = %self.code, message = %self.message, "Request failed");
            }
            // Sold-out and duplicate rejections are the normal outcome under load
            ErrorCategory::Order => {
                tracing::debug!(code = %self.code, "Purchase rejected");
            }
            _ => {}
        }

        let status = self.http_status();
        let retry = self.is_retryable();
        let mut response = (status, axum::Json(ApiResponse::<()>::from(self))).into_response();
        if retry {
            response.headers_mut().insert(
                http::header::RETRY_AFTER,
                http::HeaderValue::from_static(RETRY_AFTER_SECS),
            );
        }
        response
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        (self.status(), axum::Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn sold_out_uses_canonical_message() {
        let err = AppError::new(ErrorCode::VoucherOutOfStock);
        assert_eq!(err.to_string(), "Voucher is out of stock");
        assert!(err.details.is_empty());
        assert!(!err.is_retryable());
    }

    #[test]
    fn details_accumulate_in_key_order() {
        let err = AppError::validation("bad voucher id")
            .with_detail("voucher_id", -1)
            .with_detail("field", "voucher_id");

        let keys: Vec<_> = err.details.keys().cloned().collect();
        assert_eq!(keys, ["field", "voucher_id"]);
        assert_eq!(err.details["voucher_id"], -1);
    }

    #[test]
    fn missing_shop_maps_to_404() {
        let err = AppError::new(ErrorCode::ShopNotFound).with_detail("shopId", 7);
        assert_eq!(err.details["shopId"], 7);
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn receipt_envelope_omits_empty_fields() {
        let json = serde_json::to_value(ApiResponse::success(42_i64)).unwrap();
        assert_eq!(json, serde_json::json!({"code": 0, "message": "OK", "data": 42}));

        let json = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert!(json.get("data").is_none());
    }

    #[test]
    fn duplicate_purchase_envelope() {
        let response: ApiResponse<i64> = AppError::new(ErrorCode::DuplicatePurchase).into();
        assert_eq!(response.code, 4102);
        assert!(!response.is_success());
        assert!(response.data.is_none());
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn envelope_parses_without_details() {
        let json = r#"{"code":0,"message":"OK","data":{"orderId":9}}"#;
        let response: ApiResponse<Value> = serde_json::from_str(json).unwrap();
        assert!(response.is_success());
        assert_eq!(response.data.unwrap()["orderId"], 9);
    }

    #[test]
    fn store_outage_asks_client_to_retry() {
        let response = AppError::new(ErrorCode::StoreUnavailable).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[http::header::RETRY_AFTER], "1");

        let response = AppError::new(ErrorCode::VoucherOutOfStock).into_response();
        assert!(response.headers().get(http::header::RETRY_AFTER).is_none());
    }
}
