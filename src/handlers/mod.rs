pub mod auth;
pub mod bonds;
pub mod leaderboard;
pub mod paper_trading;
pub mod portfolio;
pub mod transactions;

use axum::http::StatusCode;
use axum::response::Json;

use crate::services::LedgerError;

pub use auth::{login, me, register, AuthResponse, LoginRequest, RegisterRequest};
pub use bonds::{get_bond, get_bonds};
pub use leaderboard::get_leaderboard;
pub use paper_trading::{buy_bond, get_paper_trading_transactions, sell_bond};
pub use portfolio::{get_portfolio, get_portfolio_summary, get_recent_transactions};
pub use transactions::{get_transaction, get_transactions};

pub type ApiError = (StatusCode, Json<serde_json::Value>);

/// Standard failure envelope: `{success: false, message}`.
pub fn error_response(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "message": message
        })),
    )
}

pub fn db_error(context: &str, e: sqlx::Error) -> ApiError {
    tracing::error!("{}: {:?}", context, e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
}

/// Map a ledger failure onto the HTTP taxonomy: missing entities are 404,
/// business-rule violations are 400, persistence failures are 500. The
/// insufficient-funds case carries the shortfall in a `data` block.
pub fn ledger_error_response(e: LedgerError) -> ApiError {
    let status = match &e {
        LedgerError::UserNotFound | LedgerError::BondNotFound => StatusCode::NOT_FOUND,
        LedgerError::Database(err) => {
            tracing::error!("Ledger database error: {:?}", err);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error processing trade");
        }
        _ => StatusCode::BAD_REQUEST,
    };

    if let LedgerError::InsufficientFunds { required, available } = &e {
        return (
            status,
            Json(serde_json::json!({
                "success": false,
                "message": e.to_string(),
                "data": {
                    "required": required,
                    "available": available
                }
            })),
        );
    }

    error_response(status, &e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_http_status_codes() {
        let (status, _) = ledger_error_response(LedgerError::UserNotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = ledger_error_response(LedgerError::BondNotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = ledger_error_response(LedgerError::InvalidQuantity);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = ledger_error_response(LedgerError::InsufficientInventory { available: 5 });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = ledger_error_response(LedgerError::NoPortfolio);
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn insufficient_funds_carries_shortfall_data() {
        let (status, Json(body)) = ledger_error_response(LedgerError::InsufficientFunds {
            required: 20000.0,
            available: 15000.0,
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["required"], 20000.0);
        assert_eq!(body["data"]["available"], 15000.0);
    }
}
