use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use sqlx::Row;
use uuid::Uuid;

use crate::handlers::{db_error, ApiError};
use crate::models::{PageParams, Pagination};
use crate::services::valuation::{self, TraderRow};
use crate::AppState;

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Public ranking of traders by percentage return. Holdings whose bond has
/// been retired contribute nothing to current value, mirroring portfolio
/// valuation; users who never invested are excluded entirely.
pub async fn get_leaderboard(
    Query(query): Query<LeaderboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (page, limit) = PageParams { page: query.page, limit: query.limit }.clamped(50);
    let offset = PageParams::offset(page, limit) as usize;

    let rows = sqlx::query(
        r#"
        SELECT u.id AS user_id, u.name AS user_name, u.created_at AS member_since,
               COALESCE(SUM(h.total_invested) FILTER (WHERE h.quantity > 0), 0) AS total_invested,
               COALESCE(SUM(b.price * h.quantity) FILTER (WHERE h.quantity > 0 AND b.id IS NOT NULL), 0) AS current_value,
               COUNT(h.id) FILTER (WHERE h.quantity > 0) AS bonds_owned
        FROM portfolios p
        JOIN users u ON u.id = p.user_id
        LEFT JOIN holdings h ON h.portfolio_id = p.id
        LEFT JOIN bonds b ON b.id = h.bond_id
        GROUP BY u.id, u.name, u.created_at
        "#,
    )
    .fetch_all(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching leaderboard", e))?;

    let traders = rows
        .iter()
        .map(|row| -> Result<TraderRow, sqlx::Error> {
            Ok(TraderRow {
                user_id: row.try_get::<Uuid, _>("user_id")?,
                user_name: row.try_get("user_name")?,
                total_invested: row.try_get("total_invested")?,
                current_value: row.try_get("current_value")?,
                bonds_owned: row.try_get("bonds_owned")?,
                member_since: row.try_get("member_since")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| db_error("Error reading leaderboard row", e))?;

    let (ranked, stats) = valuation::rank_leaderboard(traders);

    let total_count = ranked.len() as i64;
    let paginated: Vec<_> = ranked
        .into_iter()
        .skip(offset)
        .take(limit as usize)
        .collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "leaderboard": paginated,
            "pagination": Pagination::new(page, limit, total_count),
            "stats": stats
        }
    })))
}
