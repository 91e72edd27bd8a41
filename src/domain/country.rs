// Country domain model
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::str::FromStr;

/// A persisted country row. `name` is stored lower-cased and is the only
/// natural key exposed externally.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// A country record produced by the transformer, before persistence.
/// The batch timestamp is assigned by the refresh orchestrator, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCountry {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
}

/// Aggregate status: row count plus the maximum batch timestamp across all
/// rows (None for an empty table).
#[derive(Debug, Clone, Serialize)]
pub struct CountryStatus {
    pub total_countries: i64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// Sort direction for GDP-ordered listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GdpSort {
    Ascending,
    Descending,
}

impl FromStr for GdpSort {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gdp_asc" => Ok(GdpSort::Ascending),
            "gdp_desc" => Ok(GdpSort::Descending),
            _ => Err(()),
        }
    }
}
