//! Shared-store key layout

use std::time::Duration;

pub const SECKILL_STOCK_KEY: &str = "seckill:stock:";
pub const SECKILL_ORDER_KEY: &str = "seckill:order:";
pub const SECKILL_WINDOW_KEY: &str = "seckill:voucher:";

pub const LOCK_KEY_PREFIX: &str = "lock:";
pub const LOCK_ORDER_RESOURCE: &str = "order:";

pub const LOGIN_USER_KEY: &str = "login:token:";
pub const LOGIN_USER_TTL: Duration = Duration::from_secs(30 * 60);

pub const ID_COUNTER_KEY: &str = "icr:";

pub const CACHE_SHOP_TTL: Duration = Duration::from_secs(30 * 60);
pub const CACHE_NULL_TTL: Duration = Duration::from_secs(2 * 60);
pub const REBUILD_LOCK_TTL: Duration = Duration::from_secs(10);

pub fn stock_key(voucher_id: i64) -> String {
    format!("{SECKILL_STOCK_KEY}{voucher_id}")
}

pub fn admission_key(voucher_id: i64) -> String {
    format!("{SECKILL_ORDER_KEY}{voucher_id}")
}

pub fn window_key(voucher_id: i64) -> String {
    format!("{SECKILL_WINDOW_KEY}{voucher_id}")
}

pub fn lock_key(resource: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{resource}")
}

pub fn login_key(token: &str) -> String {
    format!("{LOGIN_USER_KEY}{token}")
}
