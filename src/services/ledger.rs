//! Ledger transition engine.
//!
//! `execute_buy` and `execute_sell` are the only code paths that move money
//! between a wallet, a bond's unit inventory, and a portfolio's holdings.
//! Each runs inside a single Postgres transaction: every precondition is
//! checked against rows locked with `SELECT ... FOR UPDATE` (user first,
//! then bond, so concurrent trades on the same user or bond serialize
//! without deadlocking), and the full effect set commits together or not at
//! all. A failed precondition returns a typed [`LedgerError`] before any
//! write; a failed write drops the transaction and rolls everything back.
//!
//! # Invariants
//!
//! - Wallet balance and holding quantity never go negative.
//! - `holding.total_invested == holding.quantity * holding.average_buy_price`
//!   after every buy (weighted-average cost basis).
//! - A holding sold down to zero quantity is deleted, never kept as a zero row.
//! - Portfolio aggregates are recomputed from live holdings after every
//!   mutation, never patched incrementally.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Row, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{BondSnapshot, TradeSide, TransactionStatus};

/// Failure modes of a buy/sell attempt. Conversion to HTTP status codes and
/// response envelopes happens at the handler layer.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Quantity missing, zero, or negative
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("User not found")]
    UserNotFound,

    #[error("Bond not found")]
    BondNotFound,

    /// Bond exists but is closed for trading
    #[error("This bond is not available for purchase")]
    BondInactive,

    /// Buy exceeds the remaining unit inventory
    #[error("Only {available} units available")]
    InsufficientInventory { available: i64 },

    /// Wallet cannot cover the purchase
    #[error("Insufficient wallet balance")]
    InsufficientFunds { required: f64, available: f64 },

    /// Sell attempted before the user ever bought anything
    #[error("No portfolio found")]
    NoPortfolio,

    /// Sell exceeds the held quantity
    #[error("Insufficient holdings to sell")]
    InsufficientHoldings { held: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Receipt returned to the caller after a committed trade.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub transaction_id: Uuid,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub bond_id: Uuid,
    pub bond_name: String,
    pub issuer: String,
    pub quantity: i64,
    pub price_per_unit: f64,
    pub total_amount: f64,
    pub wallet_balance: f64,
    pub wallet_currency: String,
    pub executed_at: DateTime<Utc>,
}

struct LockedUser {
    wallet_balance: f64,
    wallet_currency: String,
}

struct LockedBond {
    name: String,
    issuer: String,
    return_rate: f64,
    risk_level: String,
    price: f64,
    available_units: i64,
    is_active: bool,
}

/// Lock the user row. Lock order is always user before bond.
async fn lock_user(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<LockedUser, LedgerError> {
    let row = sqlx::query(
        "SELECT wallet_balance, wallet_currency FROM users WHERE id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(LedgerError::UserNotFound)?;

    Ok(LockedUser {
        wallet_balance: row.try_get("wallet_balance")?,
        wallet_currency: row.try_get("wallet_currency")?,
    })
}

async fn lock_bond(
    tx: &mut Transaction<'_, Postgres>,
    bond_id: Uuid,
) -> Result<LockedBond, LedgerError> {
    let row = sqlx::query(
        r#"
        SELECT name, issuer, return_rate, risk_level, price, available_units, is_active
        FROM bonds
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(bond_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(LedgerError::BondNotFound)?;

    Ok(LockedBond {
        name: row.try_get("name")?,
        issuer: row.try_get("issuer")?,
        return_rate: row.try_get("return_rate")?,
        risk_level: row.try_get("risk_level")?,
        price: row.try_get("price")?,
        available_units: row.try_get("available_units")?,
        is_active: row.try_get("is_active")?,
    })
}

async fn append_transaction(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    bond_id: Uuid,
    side: TradeSide,
    quantity: i64,
    price_per_unit: f64,
    total_amount: f64,
    snapshot: &BondSnapshot,
    now: DateTime<Utc>,
) -> Result<Uuid, LedgerError> {
    let transaction_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO transactions
            (id, user_id, bond_id, type, quantity, price_per_unit, total_amount, status, bond_snapshot, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(transaction_id)
    .bind(user_id)
    .bind(bond_id)
    .bind(side.as_str())
    .bind(quantity)
    .bind(price_per_unit)
    .bind(total_amount)
    .bind(TransactionStatus::Completed.as_str())
    .bind(sqlx::types::Json(snapshot))
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(transaction_id)
}

/// Recompute portfolio aggregate caches from the live holdings set.
/// Zero-quantity rows never exist here (sells delete them), but the filter
/// mirrors the aggregate's definition: sum/count over holdings with units.
async fn recalculate_portfolio_totals(
    tx: &mut Transaction<'_, Postgres>,
    portfolio_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        UPDATE portfolios SET
            total_invested = COALESCE(
                (SELECT SUM(total_invested) FROM holdings
                 WHERE portfolio_id = $1 AND quantity > 0), 0),
            total_bonds_owned = (
                SELECT COUNT(*) FROM holdings
                WHERE portfolio_id = $1 AND quantity > 0),
            updated_at = $2
        WHERE id = $1
        "#,
    )
    .bind(portfolio_id)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Execute a BUY: debit the wallet, take units from the bond's inventory,
/// append the transaction record, and fold the purchase into the holding at
/// weighted-average cost.
pub async fn execute_buy(
    pool: &PgPool,
    user_id: Uuid,
    bond_id: Uuid,
    quantity: i64,
) -> Result<TradeReceipt, LedgerError> {
    if quantity < 1 {
        return Err(LedgerError::InvalidQuantity);
    }

    let mut tx = pool.begin().await?;

    let user = lock_user(&mut tx, user_id).await?;
    let bond = lock_bond(&mut tx, bond_id).await?;

    if !bond.is_active {
        return Err(LedgerError::BondInactive);
    }
    if bond.available_units < quantity {
        return Err(LedgerError::InsufficientInventory {
            available: bond.available_units,
        });
    }

    let total_cost = bond.price * quantity as f64;
    if user.wallet_balance < total_cost {
        return Err(LedgerError::InsufficientFunds {
            required: total_cost,
            available: user.wallet_balance,
        });
    }

    let now = Utc::now();

    sqlx::query("UPDATE users SET wallet_balance = wallet_balance - $1 WHERE id = $2")
        .bind(total_cost)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE bonds SET available_units = available_units - $1 WHERE id = $2")
        .bind(quantity)
        .bind(bond_id)
        .execute(&mut *tx)
        .await?;

    let snapshot = BondSnapshot {
        name: bond.name.clone(),
        issuer: bond.issuer.clone(),
        return_rate: bond.return_rate,
        risk_level: bond.risk_level.clone(),
    };
    let transaction_id = append_transaction(
        &mut tx,
        user_id,
        bond_id,
        TradeSide::Buy,
        quantity,
        bond.price,
        total_cost,
        &snapshot,
        now,
    )
    .await?;

    // Portfolio is created lazily on first buy.
    let portfolio_id: Uuid = match sqlx::query_scalar(
        "SELECT id FROM portfolios WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO portfolios (id, user_id, created_at, updated_at) VALUES ($1, $2, $3, $3)",
            )
            .bind(id)
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            id
        }
    };

    let existing = sqlx::query(
        "SELECT id, quantity, total_invested FROM holdings WHERE portfolio_id = $1 AND bond_id = $2",
    )
    .bind(portfolio_id)
    .bind(bond_id)
    .fetch_optional(&mut *tx)
    .await?;

    match existing {
        Some(row) => {
            let holding_id: Uuid = row.try_get("id")?;
            let old_quantity: i64 = row.try_get("quantity")?;
            let old_invested: f64 = row.try_get("total_invested")?;

            // Weighted-average cost basis: average is recomputed from
            // cumulative invested capital, not averaged over trade prices.
            let new_quantity = old_quantity + quantity;
            let new_invested = old_invested + total_cost;
            let average_buy_price = new_invested / new_quantity as f64;

            sqlx::query(
                r#"
                UPDATE holdings SET
                    quantity = $1,
                    total_invested = $2,
                    average_buy_price = $3,
                    last_transaction_date = $4
                WHERE id = $5
                "#,
            )
            .bind(new_quantity)
            .bind(new_invested)
            .bind(average_buy_price)
            .bind(now)
            .bind(holding_id)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO holdings
                    (id, portfolio_id, bond_id, quantity, average_buy_price, total_invested,
                     first_purchase_date, last_transaction_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(portfolio_id)
            .bind(bond_id)
            .bind(quantity)
            .bind(bond.price)
            .bind(total_cost)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
    }

    recalculate_portfolio_totals(&mut tx, portfolio_id, now).await?;

    tx.commit().await?;

    Ok(TradeReceipt {
        transaction_id,
        side: TradeSide::Buy,
        bond_id,
        bond_name: bond.name,
        issuer: bond.issuer,
        quantity,
        price_per_unit: bond.price,
        total_amount: total_cost,
        wallet_balance: user.wallet_balance - total_cost,
        wallet_currency: user.wallet_currency,
        executed_at: now,
    })
}

/// Execute a SELL: credit the wallet at the *current* catalog price, return
/// units to the inventory pool, append the transaction record, and strip the
/// sold lot's cost basis at the existing average price. The average price
/// itself is unchanged by a sell; a holding reaching zero is removed.
pub async fn execute_sell(
    pool: &PgPool,
    user_id: Uuid,
    bond_id: Uuid,
    quantity: i64,
) -> Result<TradeReceipt, LedgerError> {
    if quantity < 1 {
        return Err(LedgerError::InvalidQuantity);
    }

    let mut tx = pool.begin().await?;

    let user = lock_user(&mut tx, user_id).await?;
    let bond = lock_bond(&mut tx, bond_id).await?;

    let portfolio_id: Uuid = sqlx::query_scalar(
        "SELECT id FROM portfolios WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(LedgerError::NoPortfolio)?;

    let holding = sqlx::query(
        "SELECT id, quantity, average_buy_price FROM holdings WHERE portfolio_id = $1 AND bond_id = $2",
    )
    .bind(portfolio_id)
    .bind(bond_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (holding_id, held_quantity, average_buy_price): (Uuid, i64, f64) = match holding {
        Some(row) => (
            row.try_get("id")?,
            row.try_get("quantity")?,
            row.try_get("average_buy_price")?,
        ),
        None => return Err(LedgerError::InsufficientHoldings { held: 0 }),
    };

    if held_quantity < quantity {
        return Err(LedgerError::InsufficientHoldings { held: held_quantity });
    }

    let total_amount = bond.price * quantity as f64;
    let now = Utc::now();

    sqlx::query("UPDATE users SET wallet_balance = wallet_balance + $1 WHERE id = $2")
        .bind(total_amount)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE bonds SET available_units = available_units + $1 WHERE id = $2")
        .bind(quantity)
        .bind(bond_id)
        .execute(&mut *tx)
        .await?;

    let snapshot = BondSnapshot {
        name: bond.name.clone(),
        issuer: bond.issuer.clone(),
        return_rate: bond.return_rate,
        risk_level: bond.risk_level.clone(),
    };
    let transaction_id = append_transaction(
        &mut tx,
        user_id,
        bond_id,
        TradeSide::Sell,
        quantity,
        bond.price,
        total_amount,
        &snapshot,
        now,
    )
    .await?;

    let remaining = held_quantity - quantity;
    if remaining == 0 {
        sqlx::query("DELETE FROM holdings WHERE id = $1")
            .bind(holding_id)
            .execute(&mut *tx)
            .await?;
    } else {
        // Cost basis of the sold lot leaves at the existing average price.
        sqlx::query(
            r#"
            UPDATE holdings SET
                quantity = $1,
                total_invested = GREATEST(total_invested - $2, 0),
                last_transaction_date = $3
            WHERE id = $4
            "#,
        )
        .bind(remaining)
        .bind(average_buy_price * quantity as f64)
        .bind(now)
        .bind(holding_id)
        .execute(&mut *tx)
        .await?;
    }

    recalculate_portfolio_totals(&mut tx, portfolio_id, now).await?;

    tx.commit().await?;

    Ok(TradeReceipt {
        transaction_id,
        side: TradeSide::Sell,
        bond_id,
        bond_name: bond.name,
        issuer: bond.issuer,
        quantity,
        price_per_unit: bond.price,
        total_amount,
        wallet_balance: user.wallet_balance + total_amount,
        wallet_currency: user.wallet_currency,
        executed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::LedgerError;

    #[test]
    fn error_messages_name_the_shortfall() {
        assert_eq!(
            LedgerError::InsufficientInventory { available: 42 }.to_string(),
            "Only 42 units available"
        );
        assert_eq!(
            LedgerError::InsufficientHoldings { held: 3 }.to_string(),
            "Insufficient holdings to sell"
        );
        assert_eq!(LedgerError::InvalidQuantity.to_string(), "Quantity must be at least 1");
        assert_eq!(LedgerError::BondInactive.to_string(), "This bond is not available for purchase");
    }
}
