use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use sqlx::Row;
use uuid::Uuid;

use crate::handlers::{db_error, error_response, ledger_error_response, ApiError};
use crate::middleware::auth::AuthUser;
use crate::models::{PageParams, Pagination, TradeSide};
use crate::services::ledger;
use crate::AppState;

/// Pull `bondId` and `quantity` out of a raw request body. Validated by hand
/// rather than a typed extractor so a missing or mistyped field yields the
/// standard 400 envelope instead of axum's plain-text 422.
pub fn parse_trade_request(payload: &serde_json::Value) -> Result<(Uuid, i64), ApiError> {
    let bond_id = payload.get("bondId").and_then(|v| v.as_str());
    let quantity = payload.get("quantity").and_then(|v| v.as_i64());

    let (Some(bond_id), Some(quantity)) = (bond_id, quantity) else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Please provide bondId and quantity",
        ));
    };

    let bond_id = Uuid::parse_str(bond_id)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid bond id"))?;

    Ok((bond_id, quantity))
}

pub async fn buy_bond(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let (bond_id, quantity) = parse_trade_request(&payload)?;

    let receipt = ledger::execute_buy(&state.db_pool, auth_user.user_id, bond_id, quantity)
        .await
        .map_err(ledger_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": format!(
                "Successfully purchased {} unit(s) of {}",
                receipt.quantity, receipt.bond_name
            ),
            "data": {
                "transaction": receipt,
                "wallet": {
                    "balance": receipt.wallet_balance,
                    "currency": receipt.wallet_currency
                }
            }
        })),
    ))
}

pub async fn sell_bond(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (bond_id, quantity) = parse_trade_request(&payload)?;

    let receipt = ledger::execute_sell(&state.db_pool, auth_user.user_id, bond_id, quantity)
        .await
        .map_err(ledger_error_response)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!(
            "Successfully sold {} unit(s) of {}",
            receipt.quantity, receipt.bond_name
        ),
        "data": {
            "transaction": receipt,
            "wallet": {
                "balance": receipt.wallet_balance,
                "currency": receipt.wallet_currency
            }
        }
    })))
}

// page/limit stay inline: serde_urlencoded cannot deserialize numbers
// through #[serde(flatten)].
#[derive(Deserialize)]
pub struct TradeHistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub side: Option<String>,
}

/// Paginated trade history, newest first, optionally filtered by side.
pub async fn get_paper_trading_transactions(
    Query(query): Query<TradeHistoryQuery>,
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (page, limit) = PageParams { page: query.page, limit: query.limit }.page_and_limit();
    let offset = PageParams::offset(page, limit);
    let side_filter = query.side.as_deref().and_then(TradeSide::from_str);

    let total_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE user_id = $1 AND ($2::TEXT IS NULL OR type = $2)",
    )
    .bind(auth_user.user_id)
    .bind(side_filter.map(|s| s.as_str()))
    .fetch_one(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error counting transactions", e))?;

    let rows = sqlx::query(
        r#"
        SELECT t.id, t.type, t.quantity, t.price_per_unit, t.total_amount, t.status,
               t.bond_snapshot, t.created_at,
               b.id AS live_bond_id, b.name, b.issuer, b.price, b.return_rate, b.risk_level, b.sector
        FROM transactions t
        LEFT JOIN bonds b ON b.id = t.bond_id
        WHERE t.user_id = $1 AND ($2::TEXT IS NULL OR t.type = $2)
        ORDER BY t.created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(auth_user.user_id)
    .bind(side_filter.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching transactions", e))?;

    let transactions: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| format_trade_row(row))
        .collect::<Result<_, _>>()
        .map_err(|e| db_error("Error reading transaction row", e))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "transactions": transactions,
            "pagination": Pagination::new(page, limit, total_count)
        }
    })))
}

/// Render one joined transaction row. The live catalog row wins; when the
/// bond is gone the embedded snapshot describes it instead.
pub fn format_trade_row(row: &sqlx::postgres::PgRow) -> Result<serde_json::Value, sqlx::Error> {
    let bond = match row.try_get::<Option<Uuid>, _>("live_bond_id")? {
        Some(bond_id) => serde_json::json!({
            "id": bond_id.to_string(),
            "name": row.try_get::<String, _>("name")?,
            "issuer": row.try_get::<String, _>("issuer")?,
            "currentPrice": row.try_get::<f64, _>("price")?,
            "returnRate": row.try_get::<f64, _>("return_rate")?,
            "riskLevel": row.try_get::<String, _>("risk_level")?,
            "sector": row.try_get::<String, _>("sector")?,
        }),
        None => row.try_get::<serde_json::Value, _>("bond_snapshot")?,
    };

    Ok(serde_json::json!({
        "id": row.try_get::<Uuid, _>("id")?.to_string(),
        "type": row.try_get::<String, _>("type")?,
        "quantity": row.try_get::<i64, _>("quantity")?,
        "pricePerUnit": row.try_get::<f64, _>("price_per_unit")?,
        "totalAmount": row.try_get::<f64, _>("total_amount")?,
        "status": row.try_get::<String, _>("status")?,
        "createdAt": row.try_get::<chrono::DateTime<chrono::Utc>, _>("created_at")?,
        "bond": bond,
    }))
}
