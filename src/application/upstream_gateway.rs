// Gateway traits for the two upstream APIs
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// One country payload as delivered by the country data API. `population`
/// is optional here only so its absence can be reported as a transform
/// error rather than a blanket deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCountry {
    pub name: String,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub currencies: Vec<RawCurrency>,
    #[serde(default)]
    pub flag: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCurrency {
    pub code: String,
}

#[async_trait]
pub trait CountryDataGateway: Send + Sync {
    /// Fetch the full country snapshot from the upstream API.
    async fn fetch_countries(&self) -> anyhow::Result<Vec<RawCountry>>;
}

#[async_trait]
pub trait ExchangeRateGateway: Send + Sync {
    /// Fetch the currency-code to exchange-rate mapping.
    async fn fetch_rates(&self) -> anyhow::Result<HashMap<String, f64>>;
}
