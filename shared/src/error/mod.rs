//! Unified error system for the seckill workspace
//!
//! - [`ErrorCode`]: Standardized, stable numeric codes surfaced to clients
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with code, message, and details
//! - [`ApiResponse`]: Unified API response envelope
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 4xxx: Order / flash-sale errors
//! - 6xxx: Shop errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::VoucherOutOfStock);
//! assert_eq!(err.code.code(), 4101);
//!
//! let err = AppError::validation("voucher id must be positive")
//!     .with_detail("field", "voucher_id");
//!
//! let response = ApiResponse::<()>::error(&err);
//! assert_eq!(response.code, 2);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, Details};
