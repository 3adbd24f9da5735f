//! Shared types for the seckill workspace
//!
//! Error codes, the unified API response envelope, and the domain models
//! (vouchers, orders, shops, users) exchanged between the server and its
//! clients.

pub mod error;
pub mod models;
pub mod util;

pub use error::{ApiResponse, AppError, ErrorCode};
