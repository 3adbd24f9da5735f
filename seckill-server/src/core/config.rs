use crate::shop::ShopCacheMode;
use std::str::FromStr;
use std::time::Duration;

/// Shared store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    /// In-process store; single instance only
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | ENVIRONMENT | development | Runtime environment |
/// | HTTP_PORT | 8081 | HTTP API port |
/// | DATABASE_PATH | seckill.db | SQLite file |
/// | REDIS_URL | redis://127.0.0.1:6379 | Shared store address |
/// | STORE_BACKEND | redis | `redis` or `memory` |
/// | LOG_LEVEL | info | Default log filter |
/// | LOG_JSON | true in production | JSON log lines |
/// | LOG_DIR | (unset) | Daily-rotated log files when set |
/// | ORDER_STREAM | stream.orders | Order queue stream |
/// | ORDER_GROUP | g1 | Consumer group |
/// | ORDER_CONSUMER | c1 | Consumer name of this instance |
/// | CONSUME_BLOCK_MS | 2000 | Blocking read timeout, at least 1 |
/// | ORDER_LOCK_LEASE_MS | 30000 | Per-buyer lease |
/// | CACHE_LOGICAL_TTL_SECS | 1800 | Logical expiry of cached shops |
/// | SHOP_CACHE_MODE | logical | `logical`, `passthrough` or `mutex` |
/// | REBUILD_CONCURRENCY | 10 | Concurrent cache rebuilds |
/// | WARMUP_SHOP_IDS | (empty) | Comma-separated shop ids loaded at startup |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | Grace period for background tasks |
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub http_port: u16,
    pub database_path: String,
    pub redis_url: String,
    pub store_backend: StoreBackend,

    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,

    pub order_stream: String,
    pub order_group: String,
    pub order_consumer: String,
    pub consume_block: Duration,
    pub order_lock_lease: Duration,

    pub cache_logical_ttl: Duration,
    pub shop_cache_mode: ShopCacheMode,
    pub rebuild_concurrency: usize,
    pub warmup_shop_ids: Vec<i64>,

    pub shutdown_timeout: Duration,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

impl Config {
    /// Load configuration from environment variables, using defaults for
    /// anything unset or unparsable
    pub fn from_env() -> Self {
        let environment = env_string("ENVIRONMENT", "development");
        let production = environment == "production";

        Self {
            http_port: env_or("HTTP_PORT", 8081),
            database_path: env_string("DATABASE_PATH", "seckill.db"),
            redis_url: env_string("REDIS_URL", "redis://127.0.0.1:6379"),
            store_backend: env_or("STORE_BACKEND", StoreBackend::Redis),

            log_level: env_string("LOG_LEVEL", "info"),
            log_json: env_or("LOG_JSON", production),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),

            order_stream: env_string("ORDER_STREAM", "stream.orders"),
            order_group: env_string("ORDER_GROUP", "g1"),
            order_consumer: env_string("ORDER_CONSUMER", "c1"),
            consume_block: consume_block(env_or("CONSUME_BLOCK_MS", 2_000)),
            order_lock_lease: Duration::from_millis(env_or("ORDER_LOCK_LEASE_MS", 30_000)),

            cache_logical_ttl: Duration::from_secs(env_or("CACHE_LOGICAL_TTL_SECS", 1_800)),
            shop_cache_mode: env_or("SHOP_CACHE_MODE", ShopCacheMode::LogicalExpire),
            rebuild_concurrency: env_or("REBUILD_CONCURRENCY", 10),
            warmup_shop_ids: std::env::var("WARMUP_SHOP_IDS")
                .map(|v| parse_id_list(&v))
                .unwrap_or_default(),

            shutdown_timeout: Duration::from_millis(env_or("SHUTDOWN_TIMEOUT_MS", 10_000)),
            environment,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// A zero block would make a stream read wait forever
fn consume_block(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match s.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(value = %s, "Ignoring invalid id in WARMUP_SHOP_IDS");
                    None
                }
            }
        })
        .collect()
}
