//! Buy/sell endpoints called directly (no HTTP server): request-body
//! validation envelopes and the success envelopes with the wallet block.
//!
//! Run with: cargo test --test trade_handlers_test -- --ignored

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use mudra_api::handlers::paper_trading::{buy_bond, sell_bond};

mod test_helpers;
use test_helpers::*;

#[tokio::test]
#[ignore] // requires test DB: cargo test -- --ignored
async fn malformed_trade_bodies_get_the_400_envelope() {
    let pool = setup_test_db().await;
    let state = test_state(&pool);
    let user_id = create_test_user(&pool, "validator@test.local", 100_000.0).await;
    let bond_id = create_test_bond(&pool, "Validated Bond", 10_000.0, 100).await;

    // Missing bondId.
    let err = buy_bond(
        State(state.clone()),
        Extension(auth_user(user_id, "validator@test.local")),
        Json(serde_json::json!({ "quantity": 1 })),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
    assert_eq!(err.1 .0["success"], false);
    assert_eq!(err.1 .0["message"], "Please provide bondId and quantity");

    // Fractional quantity.
    let err = buy_bond(
        State(state.clone()),
        Extension(auth_user(user_id, "validator@test.local")),
        Json(serde_json::json!({ "bondId": bond_id.to_string(), "quantity": 1.5 })),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
    assert_eq!(err.1 .0["message"], "Please provide bondId and quantity");

    // Sell validates the same way.
    let err = sell_bond(
        State(state.clone()),
        Extension(auth_user(user_id, "validator@test.local")),
        Json(serde_json::json!({})),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
    assert_eq!(err.1 .0["message"], "Please provide bondId and quantity");

    // No state moved for any of the rejected bodies.
    assert_eq!(wallet_balance(&pool, user_id).await, 100_000.0);
    assert_eq!(available_units(&pool, bond_id).await, 100);
    assert_eq!(transaction_count(&pool, user_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn buy_and_sell_return_the_receipt_and_wallet_envelopes() {
    let pool = setup_test_db().await;
    let state = test_state(&pool);
    let user_id = create_test_user(&pool, "roundtrip@test.local", 100_000.0).await;
    let bond_id = create_test_bond(&pool, "Roundtrip Bond", 10_000.0, 100).await;

    let (status, response) = buy_bond(
        State(state.clone()),
        Extension(auth_user(user_id, "roundtrip@test.local")),
        Json(serde_json::json!({ "bondId": bond_id.to_string(), "quantity": 2 })),
    )
    .await
    .expect("buy");

    assert_eq!(status, StatusCode::CREATED);
    let body = response.0;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully purchased 2 unit(s) of Roundtrip Bond");
    assert_eq!(body["data"]["transaction"]["type"], "BUY");
    assert_eq!(body["data"]["transaction"]["totalAmount"], 20_000.0);
    assert_eq!(body["data"]["wallet"]["balance"], 80_000.0);
    assert_eq!(body["data"]["wallet"]["currency"], "INR");

    let response = sell_bond(
        State(state),
        Extension(auth_user(user_id, "roundtrip@test.local")),
        Json(serde_json::json!({ "bondId": bond_id.to_string(), "quantity": 2 })),
    )
    .await
    .expect("sell");

    let body = response.0;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully sold 2 unit(s) of Roundtrip Bond");
    assert_eq!(body["data"]["wallet"]["balance"], 100_000.0);
}
