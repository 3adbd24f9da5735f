#![allow(dead_code)]

use seckill_server::db::DbService;
use seckill_server::store::keys;
use seckill_server::{AppState, Config, MemoryStore, SharedStore};
use shared::models::{SeckillVoucherCreate, Shop, UserDto};
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub fn test_config() -> Config {
    let mut config = Config::from_env();
    config.order_stream = "stream.orders".into();
    config.order_group = "g1".into();
    config.order_consumer = "c1".into();
    config.consume_block = Duration::from_millis(100);
    config.order_lock_lease = Duration::from_secs(10);
    config.cache_logical_ttl = Duration::from_secs(30);
    config.shop_cache_mode = Default::default();
    config
}

pub async fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let db = DbService::in_memory().await.expect("in-memory database");
    let state = AppState::from_parts(test_config(), store.clone(), db);
    TestApp { state, store }
}

impl TestApp {
    /// Publish a voucher whose sale window is open right now
    pub async fn publish_open_voucher(&self, voucher_id: i64, stock: i64) {
        let now = now_millis();
        self.state
            .seckill
            .publish_voucher(SeckillVoucherCreate {
                voucher_id,
                stock,
                begin_time: now - 60_000,
                end_time: now + 3_600_000,
            })
            .await
            .expect("publish voucher");
    }

    /// Store a login session and return its token
    pub async fn login(&self, user_id: i64) -> String {
        let token = format!("token-{user_id}");
        let user = UserDto {
            id: user_id,
            nick_name: format!("user{user_id}"),
            icon: None,
        };
        self.store
            .set(
                &keys::login_key(&token),
                &serde_json::to_string(&user).unwrap(),
                Some(keys::LOGIN_USER_TTL),
            )
            .await
            .unwrap();
        token
    }

    pub async fn insert_shop(&self, id: i64, name: &str) {
        seckill_server::db::shop::insert(
            &self.state.db.pool,
            &Shop {
                id,
                name: name.to_string(),
                type_id: 1,
                area: Some("Downtown".into()),
                address: "1 Main St".into(),
                x: 120.1,
                y: 30.2,
                avg_price: Some(80),
                score: 45,
                open_hours: Some("10:00-22:00".into()),
                updated_at: now_millis(),
            },
        )
        .await
        .unwrap();
    }

    /// Poll until `check` holds or `timeout` passes
    pub async fn wait_until<F, Fut>(&self, timeout: Duration, mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if check().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        check().await
    }
}
