//! Errors raised by the purchase path, the order worker and the shop cache
//!
//! Handlers and services return [`ServiceError`] and use `?` throughout;
//! conversion to the client-facing [`AppError`] logs infrastructure failures
//! once, at the edge.

use crate::store::StoreError;
use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Shared store unreachable; the client sees 503 and may retry
    #[error("store: {0}")]
    Store(#[from] StoreError),
    /// SQLite or payload decoding failure
    #[error("database: {0}")]
    Db(BoxError),
    /// Business outcome such as sold out or duplicate purchase
    #[error("{}: {}", .0.code, .0.message)]
    App(#[from] AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Store(store_err) => {
                tracing::error!(error = %store_err, "Shared store unavailable");
                AppError::new(ErrorCode::StoreUnavailable)
            }
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Database failure");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Order queue consumer errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Entry is missing a field or carries an unparsable value; retrying
    /// will never succeed
    #[error("Corrupt queue entry {entry_id}: {reason}")]
    CorruptEntry { entry_id: String, reason: String },

    /// Buyer lease held elsewhere while redelivering; retried later
    #[error("Buyer lease for user {user_id} is busy")]
    LeaseBusy { user_id: i64 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl QueueError {
    pub fn corrupt(entry_id: impl Into<String>, reason: impl Into<String>) -> Self {
        QueueError::CorruptEntry {
            entry_id: entry_id.into(),
            reason: reason.into(),
        }
    }
}
