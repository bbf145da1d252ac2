//! Read-side projections: portfolio valuation, leaderboard ranking, and
//! lifetime transaction summaries. Pure functions over plain row structs so
//! the math is testable without a database; handlers feed them SQL reads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Round to 2 decimals, the precision the API reports percentages at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One holding joined with its live catalog entry. `bond` is `None` when the
/// catalog entry has been retired; such holdings are excluded from valuation
/// rather than treated as an error.
#[derive(Clone, Debug)]
pub struct HoldingRow {
    pub holding_id: Uuid,
    pub quantity: i64,
    pub average_buy_price: f64,
    pub total_invested: f64,
    pub first_purchase_date: DateTime<Utc>,
    pub last_transaction_date: DateTime<Utc>,
    pub bond: Option<BondRef>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BondRef {
    pub id: Uuid,
    pub name: String,
    pub issuer: String,
    pub current_price: f64,
    pub return_rate: f64,
    pub risk_level: String,
    pub sector: String,
    pub maturity_years: i32,
    pub is_active: bool,
}

/// Valuation of a single active holding.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuedHolding {
    pub id: Uuid,
    pub bond: BondRef,
    pub quantity: i64,
    pub average_buy_price: f64,
    pub total_invested: f64,
    pub current_value: f64,
    pub profit_loss: f64,
    pub percentage_return: f64,
    pub first_purchase_date: DateTime<Utc>,
    pub last_transaction_date: DateTime<Utc>,
}

/// Aggregate totals over a set of valued holdings.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    pub total_invested: f64,
    pub current_value: f64,
    pub total_returns: f64,
    pub percentage_return: f64,
    pub expected_annual_returns: f64,
    pub total_bonds_owned: i64,
}

/// Value each holding at the current catalog price. Holdings with no live
/// bond or zero quantity drop out of the view.
pub fn value_holdings(rows: Vec<HoldingRow>) -> Vec<ValuedHolding> {
    rows.into_iter()
        .filter(|h| h.quantity > 0)
        .filter_map(|h| {
            let bond = h.bond?;
            let current_value = bond.current_price * h.quantity as f64;
            let profit_loss = current_value - h.total_invested;
            let percentage_return = if h.total_invested > 0.0 {
                round2(profit_loss / h.total_invested * 100.0)
            } else {
                0.0
            };
            Some(ValuedHolding {
                id: h.holding_id,
                bond,
                quantity: h.quantity,
                average_buy_price: h.average_buy_price,
                total_invested: h.total_invested,
                current_value,
                profit_loss,
                percentage_return,
                first_purchase_date: h.first_purchase_date,
                last_transaction_date: h.last_transaction_date,
            })
        })
        .collect()
}

pub fn portfolio_totals(holdings: &[ValuedHolding]) -> PortfolioTotals {
    let total_invested: f64 = holdings.iter().map(|h| h.total_invested).sum();
    let current_value: f64 = holdings.iter().map(|h| h.current_value).sum();
    let total_returns = current_value - total_invested;
    let percentage_return = if total_invested > 0.0 {
        round2(total_returns / total_invested * 100.0)
    } else {
        0.0
    };
    // Simple projection from catalog return rates, not compounding.
    let expected_annual_returns: f64 = holdings
        .iter()
        .map(|h| h.current_value * (h.bond.return_rate / 100.0))
        .sum();

    PortfolioTotals {
        total_invested,
        current_value,
        total_returns,
        percentage_return,
        expected_annual_returns,
        total_bonds_owned: holdings.len() as i64,
    }
}

/// One trader's raw numbers before ranking.
#[derive(Clone, Debug)]
pub struct TraderRow {
    pub user_id: Uuid,
    pub user_name: String,
    pub total_invested: f64,
    pub current_value: f64,
    pub bonds_owned: i64,
    pub member_since: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub user_id: Uuid,
    pub user_name: String,
    pub total_invested: f64,
    pub current_value: f64,
    pub total_returns: f64,
    pub percentage_return: f64,
    pub bonds_owned: i64,
    pub member_since: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardStats {
    pub total_traders: i64,
    pub avg_return: f64,
    pub top_return: f64,
}

/// Rank traders by percentage return, descending. Traders who never invested
/// are excluded. Ranks are positional: tied percentages keep their sort
/// iteration order and receive consecutive distinct ranks.
pub fn rank_leaderboard(rows: Vec<TraderRow>) -> (Vec<LeaderboardEntry>, LeaderboardStats) {
    let mut entries: Vec<LeaderboardEntry> = rows
        .into_iter()
        .filter(|r| r.total_invested > 0.0)
        .map(|r| {
            let total_returns = r.current_value - r.total_invested;
            let percentage_return = round2(total_returns / r.total_invested * 100.0);
            LeaderboardEntry {
                rank: 0,
                user_id: r.user_id,
                user_name: r.user_name,
                total_invested: r.total_invested,
                current_value: r.current_value,
                total_returns,
                percentage_return,
                bonds_owned: r.bonds_owned,
                member_since: r.member_since,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.percentage_return
            .partial_cmp(&a.percentage_return)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i as i64 + 1;
    }

    let total_traders = entries.len() as i64;
    let avg_return = if entries.is_empty() {
        0.0
    } else {
        round2(entries.iter().map(|e| e.percentage_return).sum::<f64>() / entries.len() as f64)
    };
    let top_return = entries.first().map(|e| e.percentage_return).unwrap_or(0.0);

    (
        entries,
        LeaderboardStats { total_traders, avg_return, top_return },
    )
}

/// Lifetime buy/sell totals over a user's full, unfiltered history.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_transactions: i64,
    pub buy_count: i64,
    pub sell_count: i64,
    pub total_buy_amount: f64,
    pub total_sell_amount: f64,
    pub net_flow: f64,
}

pub fn summarize_transactions(rows: &[(String, f64)]) -> TransactionSummary {
    let mut summary = TransactionSummary::default();
    for (side, amount) in rows {
        summary.total_transactions += 1;
        match side.as_str() {
            "BUY" => {
                summary.buy_count += 1;
                summary.total_buy_amount += amount;
            }
            "SELL" => {
                summary.sell_count += 1;
                summary.total_sell_amount += amount;
            }
            _ => {}
        }
    }
    summary.net_flow = summary.total_buy_amount - summary.total_sell_amount;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bond_ref(price: f64, rate: f64) -> BondRef {
        BondRef {
            id: Uuid::new_v4(),
            name: "Test Bond".into(),
            issuer: "Test Issuer".into(),
            current_price: price,
            return_rate: rate,
            risk_level: "Low".into(),
            sector: "Transportation".into(),
            maturity_years: 5,
            is_active: true,
        }
    }

    fn holding(quantity: i64, avg: f64, invested: f64, bond: Option<BondRef>) -> HoldingRow {
        HoldingRow {
            holding_id: Uuid::new_v4(),
            quantity,
            average_buy_price: avg,
            total_invested: invested,
            first_purchase_date: Utc::now(),
            last_transaction_date: Utc::now(),
            bond,
        }
    }

    #[test]
    fn values_holdings_at_current_price() {
        let valued = value_holdings(vec![holding(2, 10000.0, 20000.0, Some(bond_ref(11000.0, 7.5)))]);
        assert_eq!(valued.len(), 1);
        assert_eq!(valued[0].current_value, 22000.0);
        assert_eq!(valued[0].profit_loss, 2000.0);
        assert_eq!(valued[0].percentage_return, 10.0);
    }

    #[test]
    fn dangling_bond_is_excluded_not_an_error() {
        let valued = value_holdings(vec![
            holding(2, 10000.0, 20000.0, None),
            holding(1, 5000.0, 5000.0, Some(bond_ref(5000.0, 8.0))),
        ]);
        assert_eq!(valued.len(), 1);
        assert_eq!(valued[0].current_value, 5000.0);
    }

    #[test]
    fn zero_invested_holding_reports_zero_percent() {
        let valued = value_holdings(vec![holding(1, 0.0, 0.0, Some(bond_ref(100.0, 8.0)))]);
        assert_eq!(valued[0].percentage_return, 0.0);
    }

    #[test]
    fn totals_include_expected_annual_returns() {
        let valued = value_holdings(vec![
            holding(2, 10000.0, 20000.0, Some(bond_ref(10000.0, 7.5))),
            holding(1, 15000.0, 15000.0, Some(bond_ref(15000.0, 9.0))),
        ]);
        let totals = portfolio_totals(&valued);
        assert_eq!(totals.total_invested, 35000.0);
        assert_eq!(totals.current_value, 35000.0);
        assert_eq!(totals.total_returns, 0.0);
        assert_eq!(totals.percentage_return, 0.0);
        assert_eq!(totals.total_bonds_owned, 2);
        // 20000 * 7.5% + 15000 * 9% = 1500 + 1350
        assert!((totals.expected_annual_returns - 2850.0).abs() < 1e-9);
    }

    fn trader(name: &str, invested: f64, value: f64) -> TraderRow {
        TraderRow {
            user_id: Uuid::new_v4(),
            user_name: name.into(),
            total_invested: invested,
            current_value: value,
            bonds_owned: 1,
            member_since: Utc::now(),
        }
    }

    #[test]
    fn leaderboard_excludes_zero_invested_and_sorts_descending() {
        let (entries, stats) = rank_leaderboard(vec![
            trader("flat", 10000.0, 10000.0),
            trader("idle", 0.0, 0.0),
            trader("up", 10000.0, 12000.0),
            trader("down", 10000.0, 9000.0),
        ]);

        let names: Vec<&str> = entries.iter().map(|e| e.user_name.as_str()).collect();
        assert_eq!(names, vec!["up", "flat", "down"]);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[2].rank, 3);
        assert_eq!(stats.total_traders, 3);
        assert_eq!(stats.top_return, 20.0);
        assert_eq!(stats.avg_return, round2((20.0 + 0.0 - 10.0) / 3.0));
    }

    #[test]
    fn tied_returns_get_consecutive_distinct_ranks() {
        let (entries, _) = rank_leaderboard(vec![
            trader("a", 1000.0, 1100.0),
            trader("b", 2000.0, 2200.0),
        ]);
        assert_eq!(entries[0].percentage_return, entries[1].percentage_return);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].rank, 2);
    }

    #[test]
    fn summary_counts_both_sides_and_net_flow() {
        let rows = vec![
            ("BUY".to_string(), 20000.0),
            ("BUY".to_string(), 10000.0),
            ("SELL".to_string(), 12000.0),
        ];
        let summary = summarize_transactions(&rows);
        assert_eq!(summary.total_transactions, 3);
        assert_eq!(summary.buy_count, 2);
        assert_eq!(summary.sell_count, 1);
        assert_eq!(summary.total_buy_amount, 30000.0);
        assert_eq!(summary.total_sell_amount, 12000.0);
        assert_eq!(summary.net_flow, 18000.0);
    }
}
