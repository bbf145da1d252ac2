use axum::{
    extract::{Extension, Query, State},
    response::Json,
};
use serde::Deserialize;
use sqlx::Row;
use uuid::Uuid;

use crate::handlers::paper_trading::format_trade_row;
use crate::handlers::{db_error, ApiError};
use crate::middleware::auth::AuthUser;
use crate::services::valuation::{self, BondRef, HoldingRow};
use crate::AppState;

/// Load the user's holdings joined with their live catalog rows. Retired
/// bonds come back with `bond: None` and drop out of valuation.
async fn load_holdings(
    state: &AppState,
    user_id: Uuid,
) -> Result<Option<Vec<HoldingRow>>, ApiError> {
    let portfolio_id: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM portfolios WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&*state.db_pool)
            .await
            .map_err(|e| db_error("Error fetching portfolio", e))?;

    let Some(portfolio_id) = portfolio_id else {
        return Ok(None);
    };

    let rows = sqlx::query(
        r#"
        SELECT h.id AS holding_id, h.quantity, h.average_buy_price, h.total_invested,
               h.first_purchase_date, h.last_transaction_date,
               b.id AS bond_id, b.name, b.issuer, b.price, b.return_rate,
               b.risk_level, b.sector, b.maturity_years, b.is_active
        FROM holdings h
        LEFT JOIN bonds b ON b.id = h.bond_id
        WHERE h.portfolio_id = $1
        "#,
    )
    .bind(portfolio_id)
    .fetch_all(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching holdings", e))?;

    let holdings = rows
        .iter()
        .map(|row| -> Result<HoldingRow, sqlx::Error> {
            let bond = match row.try_get::<Option<Uuid>, _>("bond_id")? {
                Some(id) => Some(BondRef {
                    id,
                    name: row.try_get("name")?,
                    issuer: row.try_get("issuer")?,
                    current_price: row.try_get("price")?,
                    return_rate: row.try_get("return_rate")?,
                    risk_level: row.try_get("risk_level")?,
                    sector: row.try_get("sector")?,
                    maturity_years: row.try_get("maturity_years")?,
                    is_active: row.try_get("is_active")?,
                }),
                None => None,
            };
            Ok(HoldingRow {
                holding_id: row.try_get("holding_id")?,
                quantity: row.try_get("quantity")?,
                average_buy_price: row.try_get("average_buy_price")?,
                total_invested: row.try_get("total_invested")?,
                first_purchase_date: row.try_get("first_purchase_date")?,
                last_transaction_date: row.try_get("last_transaction_date")?,
                bond,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| db_error("Error reading holding row", e))?;

    Ok(Some(holdings))
}

/// Full valuation view: every active holding priced at the current catalog
/// price, plus portfolio-level totals.
pub async fn get_portfolio(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(holdings) = load_holdings(&state, auth_user.user_id).await? else {
        return Ok(Json(serde_json::json!({
            "success": true,
            "data": {
                "portfolio": {
                    "holdings": [],
                    "totalInvested": 0,
                    "totalBondsOwned": 0,
                    "currentValue": 0,
                    "totalReturns": 0,
                    "percentageReturn": 0
                }
            }
        })));
    };

    let valued = valuation::value_holdings(holdings);
    let totals = valuation::portfolio_totals(&valued);

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "portfolio": {
                "holdings": valued,
                "totalInvested": totals.total_invested,
                "totalBondsOwned": totals.total_bonds_owned,
                "currentValue": totals.current_value,
                "totalReturns": totals.total_returns,
                "percentageReturn": totals.percentage_return,
                "expectedAnnualReturns": totals.expected_annual_returns
            }
        }
    })))
}

/// Compact valuation for dashboard cards.
pub async fn get_portfolio_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(holdings) = load_holdings(&state, auth_user.user_id).await? else {
        return Ok(Json(serde_json::json!({
            "success": true,
            "data": {
                "totalInvested": 0,
                "currentValue": 0,
                "totalBondsOwned": 0,
                "expectedAnnualReturns": 0
            }
        })));
    };

    let valued = valuation::value_holdings(holdings);
    let totals = valuation::portfolio_totals(&valued);

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "totalInvested": totals.total_invested,
            "currentValue": totals.current_value,
            "totalBondsOwned": totals.total_bonds_owned,
            "expectedAnnualReturns": totals.expected_annual_returns,
            "totalReturns": totals.total_returns,
            "percentageReturn": totals.percentage_return
        }
    })))
}

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// Most recent transactions for the portfolio page sidebar.
pub async fn get_recent_transactions(
    Query(query): Query<RecentQuery>,
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let rows = sqlx::query(
        r#"
        SELECT t.id, t.type, t.quantity, t.price_per_unit, t.total_amount, t.status,
               t.bond_snapshot, t.created_at,
               b.id AS live_bond_id, b.name, b.issuer, b.price, b.return_rate, b.risk_level, b.sector
        FROM transactions t
        LEFT JOIN bonds b ON b.id = t.bond_id
        WHERE t.user_id = $1
        ORDER BY t.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(auth_user.user_id)
    .bind(limit)
    .fetch_all(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching transactions", e))?;

    let transactions: Vec<serde_json::Value> = rows
        .iter()
        .map(format_trade_row)
        .collect::<Result<_, _>>()
        .map_err(|e| db_error("Error reading transaction row", e))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "transactions": transactions }
    })))
}
