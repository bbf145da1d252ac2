//! Startup seeding for the fixed infrastructure-bond catalog. Idempotent,
//! runs only against an empty table, so restarts never touch live
//! inventory counts.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::RiskLevel;

pub struct SeedBond {
    pub name: &'static str,
    pub issuer: &'static str,
    pub return_rate: f64,
    pub risk_level: RiskLevel,
    pub price: f64,
    pub maturity_years: i32,
    pub description: &'static str,
    pub sector: &'static str,
    pub total_value: f64,
    pub available_units: i64,
    pub launch_date: &'static str,
}

pub const BOND_CATALOG: &[SeedBond] = &[
    SeedBond {
        name: "National Highway Infrastructure Bond",
        issuer: "NHAI",
        return_rate: 7.5,
        risk_level: RiskLevel::Low,
        price: 10_000.0,
        maturity_years: 5,
        description: "Government-backed infrastructure bond for national highway development across India. Supports the Bharatmala Pariyojana project.",
        sector: "Transportation",
        total_value: 50_000_000_000.0,
        available_units: 2_500_000,
        launch_date: "2025-06-15",
    },
    SeedBond {
        name: "Metro Rail Development Bond",
        issuer: "DMRC",
        return_rate: 8.2,
        risk_level: RiskLevel::Low,
        price: 25_000.0,
        maturity_years: 7,
        description: "Fund expansion of metro rail networks in major cities including Delhi, Mumbai, and Bangalore.",
        sector: "Urban Transit",
        total_value: 75_000_000_000.0,
        available_units: 1_500_000,
        launch_date: "2025-04-01",
    },
    SeedBond {
        name: "Green Energy Infrastructure Bond",
        issuer: "IREDA",
        return_rate: 9.0,
        risk_level: RiskLevel::Medium,
        price: 15_000.0,
        maturity_years: 10,
        description: "Supporting renewable energy infrastructure projects including solar parks and wind farms across India.",
        sector: "Energy",
        total_value: 100_000_000_000.0,
        available_units: 3_000_000,
        launch_date: "2025-08-20",
    },
    SeedBond {
        name: "Smart City Development Bond",
        issuer: "Smart City SPV",
        return_rate: 8.8,
        risk_level: RiskLevel::Medium,
        price: 20_000.0,
        maturity_years: 8,
        description: "Financing smart city initiatives including digital infrastructure, IoT systems, and sustainable urban development.",
        sector: "Urban Development",
        total_value: 60_000_000_000.0,
        available_units: 1_800_000,
        launch_date: "2025-03-10",
    },
    SeedBond {
        name: "Port & Logistics Bond",
        issuer: "Sagarmala SPV",
        return_rate: 9.5,
        risk_level: RiskLevel::High,
        price: 50_000.0,
        maturity_years: 12,
        description: "Investment in port modernization, coastal economic zones, and integrated logistics infrastructure.",
        sector: "Maritime",
        total_value: 120_000_000_000.0,
        available_units: 1_200_000,
        launch_date: "2025-01-25",
    },
    SeedBond {
        name: "Rural Connectivity Bond",
        issuer: "PMGSY",
        return_rate: 7.8,
        risk_level: RiskLevel::Low,
        price: 5_000.0,
        maturity_years: 6,
        description: "Funding rural road connectivity under Pradhan Mantri Gram Sadak Yojana for last-mile infrastructure.",
        sector: "Rural Infrastructure",
        total_value: 40_000_000_000.0,
        available_units: 4_000_000,
        launch_date: "2025-07-01",
    },
    SeedBond {
        name: "Water Infrastructure Bond",
        issuer: "Jal Jeevan Mission",
        return_rate: 8.5,
        risk_level: RiskLevel::Medium,
        price: 10_000.0,
        maturity_years: 8,
        description: "Supporting water supply infrastructure and tap water connections to rural households.",
        sector: "Water & Sanitation",
        total_value: 80_000_000_000.0,
        available_units: 2_000_000,
        launch_date: "2025-05-15",
    },
    SeedBond {
        name: "Airport Modernization Bond",
        issuer: "AAI",
        return_rate: 9.2,
        risk_level: RiskLevel::Medium,
        price: 30_000.0,
        maturity_years: 10,
        description: "Financing airport expansion and modernization projects under UDAN scheme.",
        sector: "Aviation",
        total_value: 90_000_000_000.0,
        available_units: 1_500_000,
        launch_date: "2025-02-28",
    },
    SeedBond {
        name: "Railway Infrastructure Bond",
        issuer: "Indian Railways",
        return_rate: 8.0,
        risk_level: RiskLevel::Low,
        price: 15_000.0,
        maturity_years: 7,
        description: "Supporting railway modernization, new lines, and high-speed rail corridor development.",
        sector: "Railways",
        total_value: 150_000_000_000.0,
        available_units: 5_000_000,
        launch_date: "2025-09-01",
    },
    SeedBond {
        name: "Industrial Corridor Bond",
        issuer: "NICDIT",
        return_rate: 10.0,
        risk_level: RiskLevel::High,
        price: 100_000.0,
        maturity_years: 15,
        description: "Investment in Delhi-Mumbai and other industrial corridors with integrated manufacturing zones.",
        sector: "Industrial",
        total_value: 200_000_000_000.0,
        available_units: 1_000_000,
        launch_date: "2025-11-15",
    },
];

pub async fn insert_catalog(pool: &PgPool) -> anyhow::Result<usize> {
    for bond in BOND_CATALOG {
        let launch_date = NaiveDate::parse_from_str(bond.launch_date, "%Y-%m-%d")?;
        sqlx::query(
            r#"
            INSERT INTO bonds
                (id, name, issuer, return_rate, risk_level, price, maturity_years,
                 description, sector, total_value, available_units, is_active, launch_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE, $12)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bond.name)
        .bind(bond.issuer)
        .bind(bond.return_rate)
        .bind(bond.risk_level.as_str())
        .bind(bond.price)
        .bind(bond.maturity_years)
        .bind(bond.description)
        .bind(bond.sector)
        .bind(bond.total_value)
        .bind(bond.available_units)
        .bind(launch_date)
        .execute(pool)
        .await?;
    }
    Ok(BOND_CATALOG.len())
}

/// Seed the bond catalog on first boot. Existing catalogs are left alone.
pub async fn seed_if_empty(pool: &PgPool) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bonds")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        tracing::info!("Bond catalog already seeded ({} bonds), skipping", count);
        return Ok(());
    }

    let inserted = insert_catalog(pool).await?;
    tracing::info!("Seeded {} bonds into the catalog", inserted);

    Ok(())
}
