mod common;

use axum::Router;
use axum::body::Body;
use common::{TestApp, test_app};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use seckill_server::SharedStore;
use seckill_server::api::build_app;
use serde_json::Value;
use tower::ServiceExt;

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let router: Router = build_app(app.state.clone());
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn purchase_request(voucher_id: i64, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(format!("/voucher-order/seckill/{voucher_id}"));
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_purchase_requires_session() {
    let app = test_app().await;
    app.publish_open_voucher(1, 5).await;

    let (status, body) = send(&app, purchase_request(1, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);

    let (status, _) = send(&app, purchase_request(1, Some("no-such-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_purchase_returns_order_id_then_duplicate() {
    let app = test_app().await;
    app.publish_open_voucher(2, 5).await;
    let token = app.login(42).await;

    let (status, body) = send(&app, purchase_request(2, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["orderId"].as_i64().unwrap() > 0);

    let (status, body) = send(&app, purchase_request(2, Some(&token))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4102);
}

#[tokio::test]
async fn test_session_ttl_slides_on_use() {
    let app = test_app().await;
    app.publish_open_voucher(3, 5).await;
    let token = app.login(43).await;

    app.store
        .expire(&format!("login:token:{token}"), std::time::Duration::from_secs(5))
        .await
        .unwrap();
    send(&app, purchase_request(3, Some(&token))).await;

    let ttl = app.store.ttl(&format!("login:token:{token}")).unwrap();
    assert!(ttl > std::time::Duration::from_secs(60));
}

#[tokio::test]
async fn test_store_outage_returns_503() {
    let app = test_app().await;
    app.publish_open_voucher(4, 5).await;
    let token = app.login(44).await;
    app.store.set_unavailable(true);

    let (status, body) = send(&app, purchase_request(4, Some(&token))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 9501);

    let health = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, health).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_publish_voucher_over_http() {
    let app = test_app().await;
    let now = shared::util::now_millis();
    let payload = serde_json::json!({
        "voucherId": 5,
        "stock": 3,
        "beginTime": now - 1000,
        "endTime": now + 60_000,
    });
    let request = Request::post("/voucher/seckill")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 3);

    let token = app.login(45).await;
    let (status, _) = send(&app, purchase_request(5, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_shop_lookup_and_update_invalidate_cache() {
    let app = test_app().await;
    app.insert_shop(1, "Old Name").await;

    let get = || Request::get("/shop/1").body(Body::empty()).unwrap();
    let (status, body) = send(&app, get()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Old Name");

    let update = Request::put("/shop")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"id":1,"name":"New Name"}"#))
        .unwrap();
    let (status, _) = send(&app, update).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get()).await;
    assert_eq!(body["data"]["name"], "New Name");

    let missing = Request::get("/shop/404").body(Body::empty()).unwrap();
    let (status, body) = send(&app, missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 6001);
}

#[tokio::test]
async fn test_health_reports_ok() {
    let app = test_app().await;
    let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "ok");
}
