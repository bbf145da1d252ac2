//! Bond catalog entry. Read-mostly from the ledger's perspective; only
//! `available_units` is mutated by trades.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(RiskLevel::Low),
            "Medium" => Some(RiskLevel::Medium),
            "High" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bond {
    pub id: Uuid,
    pub name: String,
    pub issuer: String,
    pub return_rate: f64,
    pub risk_level: String,
    pub price: f64,
    pub maturity_years: i32,
    pub description: Option<String>,
    pub sector: String,
    pub total_value: f64,
    pub available_units: i64,
    pub is_active: bool,
    pub launch_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::RiskLevel;

    #[test]
    fn risk_level_round_trips_through_str() {
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            assert_eq!(RiskLevel::from_str(level.as_str()), Some(level));
        }
        assert_eq!(RiskLevel::from_str("Extreme"), None);
    }
}
