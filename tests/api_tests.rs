use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;

use otc_desk::{api::router, state::AppState};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tempfile::tempdir;
use tower::ServiceExt;
use urlencoding::encode;
use uuid::Uuid;

fn test_app() -> (Router, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let state = AppState::new(dir.path()).unwrap();
    (router(state), dir)
}

async fn body_json(res: Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn plain_order(symbol: &str, side: &str, price: &str, quantity: u64) -> Value {
    json!({
        "account_id": Uuid::new_v4(),
        "symbol": symbol,
        "side": side,
        "quantity": quantity,
        "kind": { "Plain": { "price": price } }
    })
}

async fn create_order(app: &Router, body: Value) -> Uuid {
    let res = post_json(app, "/orders", body).await;
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    v["order_id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn create_order_rejects_zero_qty() {
    let (app, _tmp) = test_app();

    let res = post_json(&app, "/orders", plain_order("600000", "Buy", "10", 0)).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert_eq!(v["error"], "quantity must be > 0");
}

#[tokio::test]
async fn create_order_rejects_malformed_symbol() {
    let (app, _tmp) = test_app();

    let res = post_json(&app, "/orders", plain_order("60000X", "Buy", "10", 1)).await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let v = body_json(res).await;
    assert!(v["error"].as_str().unwrap().contains("invalid instrument symbol"));
}

#[tokio::test]
async fn test_effective_limit_on_order_listing() {
    let (app, _tmp) = test_app();

    let res = get(&app, "/orders/600000?limit=5000").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-effective-limit").unwrap(), "1000");
}

#[tokio::test]
async fn order_listing_rejects_bad_cursor() {
    let (app, _tmp) = test_app();

    let res = get(&app, "/orders/600000?after=%21%21%21notbase64").await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let v = body_json(res).await;
    assert_eq!(v["error"], "Invalid cursor");
}

#[tokio::test]
async fn matching_pass_proposes_midpoint_candidate() {
    let (app, _tmp) = test_app();

    let buy_id = create_order(&app, plain_order("600000", "Buy", "10.0", 100)).await;
    let sell_id = create_order(&app, plain_order("600000", "Sell", "9.5", 50)).await;

    let res = post_json(&app, "/matches/600000", json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;

    let candidates = v.as_array().unwrap();
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c["matched"], true);
    assert_eq!(c["buy_order_id"].as_str().unwrap(), buy_id.to_string());
    assert_eq!(c["sell_order_id"].as_str().unwrap(), sell_id.to_string());
    let price: Decimal = c["price"].as_str().unwrap().parse().unwrap();
    assert_eq!(price, Decimal::new(975, 2));
    assert_eq!(c["quantity"].as_u64(), Some(50));
}

#[tokio::test]
async fn matching_pass_skips_non_crossing_pairs() {
    let (app, _tmp) = test_app();

    create_order(&app, plain_order("600000", "Buy", "9.0", 100)).await;
    create_order(&app, plain_order("600000", "Sell", "9.5", 100)).await;

    let res = post_json(&app, "/matches/600000", json!({})).await;
    let v = body_json(res).await;
    assert!(v.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn confirm_completes_both_orders_once() {
    let (app, _tmp) = test_app();

    let buy_id = create_order(&app, plain_order("600000", "Buy", "10.0", 100)).await;
    let sell_id = create_order(&app, plain_order("600000", "Sell", "9.5", 50)).await;

    let confirm = json!({
        "buy_id": buy_id,
        "sell_id": sell_id,
        "approver_id": "ops-wang",
        "buyer_balance": "10000"
    });
    let res = post_json(&app, "/confirmations", confirm.clone()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert_eq!(v["buy"]["status"], "Completed");
    assert_eq!(v["sell"]["status"], "Completed");
    assert_eq!(v["buy"]["approved_by"], "ops-wang");

    // both orders are now terminal: the pass proposes nothing further
    let res = post_json(&app, "/matches/600000", json!({})).await;
    let v = body_json(res).await;
    assert!(v.as_array().unwrap().is_empty());

    // and a second confirmation of the same pair is a conflict
    let res = post_json(&app, "/confirmations", confirm).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn confirm_rejects_underfunded_buyer() {
    let (app, _tmp) = test_app();

    let buy_id = create_order(&app, plain_order("600000", "Buy", "10.0", 100)).await;
    let sell_id = create_order(&app, plain_order("600000", "Sell", "9.5", 50)).await;

    let res = post_json(
        &app,
        "/confirmations",
        json!({
            "buy_id": buy_id,
            "sell_id": sell_id,
            "approver_id": "ops-wang",
            "buyer_balance": "500"
        }),
    )
    .await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let v = body_json(res).await;
    assert_eq!(v["error"], "insufficient account balance");
}

#[tokio::test]
async fn eligibility_check_reports_balance_verdict() {
    let (app, _tmp) = test_app();

    let id = create_order(&app, plain_order("600000", "Buy", "10", 100)).await;

    let res = post_json(
        &app,
        &format!("/orders/{}/check", id),
        json!({ "available_balance": "500" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert_eq!(v["allowed"], false);
    assert_eq!(v["reason"], "insufficient account balance");

    let res = post_json(
        &app,
        &format!("/orders/{}/check", id),
        json!({ "available_balance": "2000" }),
    )
    .await;
    let v = body_json(res).await;
    assert_eq!(v["allowed"], true);
    assert!(v["reason"].is_null());
}

#[tokio::test]
async fn eligibility_check_unknown_order_is_404() {
    let (app, _tmp) = test_app();

    let res = post_json(
        &app,
        &format!("/orders/{}/check", Uuid::new_v4()),
        json!({ "available_balance": "100" }),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forced_execution_completes_and_then_conflicts() {
    let (app, _tmp) = test_app();

    let id = create_order(&app, plain_order("600000", "Sell", "9.5", 50)).await;

    let res = post_json(
        &app,
        &format!("/orders/{}/force", id),
        json!({ "approver_id": "ops-li" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let v = body_json(res).await;
    assert_eq!(v["status"], "Completed");
    assert_eq!(v["approved_by"], "ops-li");
    assert!(!v["approved_at"].is_null());

    let res = post_json(
        &app,
        &format!("/orders/{}/force", id),
        json!({ "approver_id": "ops-li" }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let v = body_json(res).await;
    assert_eq!(v["error"], "order already completed");
}

#[tokio::test]
async fn audit_log_paginates_forward() {
    let (app, _tmp) = test_app();

    create_order(&app, plain_order("600000", "Buy", "10", 1)).await;
    create_order(&app, plain_order("600000", "Sell", "9", 1)).await;

    let res = get(&app, "/audit?limit=1").await;
    assert_eq!(res.status(), StatusCode::OK);
    let page1 = body_json(res).await;
    assert_eq!(page1["items"].as_array().unwrap().len(), 1);
    assert_eq!(page1["items"][0]["action"], "OrderCreated");
    let next = page1["next"].as_str().unwrap().to_string();

    let res = get(&app, &format!("/audit?limit=1&after={}", encode(&next))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let page2 = body_json(res).await;
    assert_eq!(page2["items"].as_array().unwrap().len(), 1);
}
