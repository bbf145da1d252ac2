//! Transaction history endpoints: pagination envelope, type filter, lifetime
//! summary independence, and the snapshot fallback for retired bonds.
//!
//! Run with: cargo test --test transaction_handlers_test -- --ignored

use axum::extract::{Extension, Path, Query, State};
use mudra_api::handlers::transactions::{get_transaction, get_transactions, TransactionsQuery};
use mudra_api::services::ledger::{execute_buy, execute_sell};
use uuid::Uuid;

mod test_helpers;
use test_helpers::*;

fn query(page: Option<i64>, limit: Option<i64>, side: Option<&str>) -> Query<TransactionsQuery> {
    Query(TransactionsQuery {
        page,
        limit,
        side: side.map(|s| s.to_string()),
        sort_order: None,
    })
}

#[tokio::test]
#[ignore] // requires test DB: cargo test -- --ignored
async fn paginates_and_summarizes_independently_of_the_filter() {
    let pool = setup_test_db().await;
    let state = test_state(&pool);
    let user_id = create_test_user(&pool, "history@test.local", 500_000.0).await;
    let bond_id = create_test_bond(&pool, "History Bond", 1_000.0, 1_000).await;

    // 6 buys and 2 sells.
    for _ in 0..6 {
        execute_buy(&pool, user_id, bond_id, 1).await.expect("buy");
    }
    execute_sell(&pool, user_id, bond_id, 1).await.expect("sell");
    execute_sell(&pool, user_id, bond_id, 2).await.expect("sell");

    let response = get_transactions(
        query(Some(1), Some(5), None),
        State(state.clone()),
        Extension(auth_user(user_id, "history@test.local")),
    )
    .await
    .expect("page 1");

    let data = &response.0["data"];
    assert_eq!(data["transactions"].as_array().unwrap().len(), 5);
    assert_eq!(data["pagination"]["currentPage"], 1);
    assert_eq!(data["pagination"]["totalPages"], 2);
    assert_eq!(data["pagination"]["totalCount"], 8);
    assert_eq!(data["pagination"]["hasNextPage"], true);
    assert_eq!(data["pagination"]["hasPrevPage"], false);

    // Filtered view: only sells, but the summary still covers everything.
    let response = get_transactions(
        query(Some(1), Some(10), Some("sell")),
        State(state),
        Extension(auth_user(user_id, "history@test.local")),
    )
    .await
    .expect("filtered");

    let data = &response.0["data"];
    let transactions = data["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert!(transactions.iter().all(|t| t["type"] == "SELL"));
    assert_eq!(data["pagination"]["totalCount"], 2);

    let summary = &data["summary"];
    assert_eq!(summary["totalTransactions"], 8);
    assert_eq!(summary["buyCount"], 6);
    assert_eq!(summary["sellCount"], 2);
    assert_eq!(summary["totalBuyAmount"], 6_000.0);
    assert_eq!(summary["totalSellAmount"], 3_000.0);
    assert_eq!(summary["netFlow"], 3_000.0);
}

#[tokio::test]
#[ignore]
async fn single_transaction_detail_is_scoped_to_the_owner() {
    let pool = setup_test_db().await;
    let state = test_state(&pool);
    let user_id = create_test_user(&pool, "owner@test.local", 100_000.0).await;
    let other_id = create_test_user(&pool, "other@test.local", 100_000.0).await;
    let bond_id = create_test_bond(&pool, "Detail Bond", 10_000.0, 100).await;

    let receipt = execute_buy(&pool, user_id, bond_id, 1).await.expect("buy");

    let response = get_transaction(
        Path(receipt.transaction_id.to_string()),
        State(state.clone()),
        Extension(auth_user(user_id, "owner@test.local")),
    )
    .await
    .expect("detail");
    assert_eq!(response.0["data"]["transaction"]["quantity"], 1);
    assert_eq!(response.0["data"]["transaction"]["bond"]["name"], "Detail Bond");
    assert_eq!(response.0["data"]["transaction"]["bond"]["sector"], "Transportation");

    // Another user cannot see it.
    let err = get_transaction(
        Path(receipt.transaction_id.to_string()),
        State(state.clone()),
        Extension(auth_user(other_id, "other@test.local")),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, axum::http::StatusCode::NOT_FOUND);

    // Unknown id is a 404 too.
    let err = get_transaction(
        Path(Uuid::new_v4().to_string()),
        State(state),
        Extension(auth_user(user_id, "owner@test.local")),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn snapshot_describes_the_bond_after_it_is_retired() {
    let pool = setup_test_db().await;
    let state = test_state(&pool);
    let user_id = create_test_user(&pool, "snapshot@test.local", 100_000.0).await;
    let bond_id = create_test_bond_full(&pool, "Vanishing Bond", 10_000.0, 100, true, 9.5).await;

    let receipt = execute_buy(&pool, user_id, bond_id, 1).await.expect("buy");

    sqlx::query("DELETE FROM bonds WHERE id = $1")
        .bind(bond_id)
        .execute(&pool)
        .await
        .expect("delete bond");

    let response = get_transaction(
        Path(receipt.transaction_id.to_string()),
        State(state),
        Extension(auth_user(user_id, "snapshot@test.local")),
    )
    .await
    .expect("detail");

    // History stays meaningful from the execution-time snapshot.
    let bond = &response.0["data"]["transaction"]["bond"];
    assert_eq!(bond["name"], "Vanishing Bond");
    assert_eq!(bond["issuer"], "Test Issuer");
    assert_eq!(bond["returnRate"], 9.5);
    assert_eq!(bond["riskLevel"], "Low");
}
