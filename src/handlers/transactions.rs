use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use sqlx::Row;
use uuid::Uuid;

use crate::handlers::paper_trading::format_trade_row;
use crate::handlers::{db_error, error_response, ApiError};
use crate::middleware::auth::AuthUser;
use crate::models::{PageParams, Pagination, TradeSide};
use crate::services::valuation;
use crate::AppState;

#[derive(Deserialize)]
pub struct TransactionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub side: Option<String>,
    pub sort_order: Option<String>,
}

/// Paginated, filterable history plus lifetime summary stats. The summary is
/// computed over the full unfiltered history, independent of the page and
/// type filter being viewed.
pub async fn get_transactions(
    Query(query): Query<TransactionsQuery>,
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (page, limit) = PageParams { page: query.page, limit: query.limit }.page_and_limit();
    let offset = PageParams::offset(page, limit);
    let side_filter = query.side.as_deref().and_then(TradeSide::from_str);
    let ascending = query.sort_order.as_deref() == Some("asc");

    let total_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE user_id = $1 AND ($2::TEXT IS NULL OR type = $2)",
    )
    .bind(auth_user.user_id)
    .bind(side_filter.map(|s| s.as_str()))
    .fetch_one(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error counting transactions", e))?;

    let order = if ascending { "ASC" } else { "DESC" };
    let sql = format!(
        r#"
        SELECT t.id, t.type, t.quantity, t.price_per_unit, t.total_amount, t.status,
               t.bond_snapshot, t.created_at,
               b.id AS live_bond_id, b.name, b.issuer, b.price, b.return_rate, b.risk_level, b.sector
        FROM transactions t
        LEFT JOIN bonds b ON b.id = t.bond_id
        WHERE t.user_id = $1 AND ($2::TEXT IS NULL OR t.type = $2)
        ORDER BY t.created_at {order}
        LIMIT $3 OFFSET $4
        "#
    );

    let rows = sqlx::query(&sql)
        .bind(auth_user.user_id)
        .bind(side_filter.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&*state.db_pool)
        .await
        .map_err(|e| db_error("Error fetching transactions", e))?;

    let transactions: Vec<serde_json::Value> = rows
        .iter()
        .map(format_trade_row)
        .collect::<Result<_, _>>()
        .map_err(|e| db_error("Error reading transaction row", e))?;

    let all_rows = sqlx::query(
        "SELECT type, total_amount FROM transactions WHERE user_id = $1",
    )
    .bind(auth_user.user_id)
    .fetch_all(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching transaction summary", e))?;

    let sides_and_amounts = all_rows
        .iter()
        .map(|row| -> Result<(String, f64), sqlx::Error> {
            Ok((row.try_get("type")?, row.try_get("total_amount")?))
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| db_error("Error reading transaction row", e))?;

    let summary = valuation::summarize_transactions(&sides_and_amounts);

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "transactions": transactions,
            "pagination": Pagination::new(page, limit, total_count),
            "summary": summary
        }
    })))
}

/// Single transaction detail, scoped to the requesting user. Falls back to
/// the embedded bond snapshot when the catalog entry no longer exists.
pub async fn get_transaction(
    Path(transaction_id): Path<String>,
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transaction_uuid = Uuid::parse_str(&transaction_id)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid transaction id"))?;

    let row = sqlx::query(
        r#"
        SELECT t.id, t.type, t.quantity, t.price_per_unit, t.total_amount, t.status,
               t.bond_snapshot, t.created_at,
               b.id AS live_bond_id, b.name, b.issuer, b.price, b.return_rate, b.risk_level, b.sector
        FROM transactions t
        LEFT JOIN bonds b ON b.id = t.bond_id
        WHERE t.id = $1 AND t.user_id = $2
        "#,
    )
    .bind(transaction_uuid)
    .bind(auth_user.user_id)
    .fetch_optional(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching transaction", e))?
    .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Transaction not found"))?;

    let transaction = format_trade_row(&row)
        .map_err(|e| db_error("Error reading transaction row", e))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "transaction": transaction }
    })))
}
