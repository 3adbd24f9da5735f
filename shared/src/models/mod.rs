//! Data models
//!
//! Shared between the seckill server and its clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY); order ids come from the
//! store-backed id worker and are transported as `i64` as well.

pub mod order;
pub mod shop;
pub mod user;
pub mod voucher;

// Re-exports
pub use order::*;
pub use shop::*;
pub use user::*;
pub use voucher::*;
