use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::handlers::{db_error, error_response, ApiError};
use crate::models::Bond;
use crate::AppState;

/// Public catalog listing. Inactive bonds stay visible so existing holders
/// can still see (and sell) them; the ledger refuses new buys.
pub async fn get_bonds(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let bonds = sqlx::query_as::<_, Bond>(
        r#"
        SELECT id, name, issuer, return_rate, risk_level, price, maturity_years,
               description, sector, total_value, available_units, is_active,
               launch_date, created_at
        FROM bonds
        ORDER BY launch_date ASC
        "#,
    )
    .fetch_all(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching bonds", e))?;

    let count = bonds.len();
    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "bonds": bonds,
            "count": count
        }
    })))
}

pub async fn get_bond(
    Path(bond_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bond_uuid = Uuid::parse_str(&bond_id)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid bond id"))?;

    let bond = sqlx::query_as::<_, Bond>(
        r#"
        SELECT id, name, issuer, return_rate, risk_level, price, maturity_years,
               description, sector, total_value, available_units, is_active,
               launch_date, created_at
        FROM bonds WHERE id = $1
        "#,
    )
    .bind(bond_uuid)
    .fetch_optional(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching bond", e))?
    .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Bond not found"))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "bond": bond }
    })))
}
