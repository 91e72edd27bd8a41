// HTTP clients for the two upstream APIs
use crate::application::upstream_gateway::{CountryDataGateway, ExchangeRateGateway, RawCountry};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Client for the country metadata API.
#[derive(Debug, Clone)]
pub struct RestCountriesClient {
    client: reqwest::Client,
    url: String,
}

impl RestCountriesClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl CountryDataGateway for RestCountriesClient {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("failed to reach the country data API")?;

        if !response.status().is_success() {
            anyhow::bail!("country data API returned status {}", response.status());
        }

        response
            .json::<Vec<RawCountry>>()
            .await
            .context("failed to parse the country data payload")
    }
}

#[derive(Debug, Deserialize)]
struct RatesEnvelope {
    rates: HashMap<String, f64>,
}

/// Client for the exchange rate API. The payload nests the mapping under a
/// top-level `rates` key.
#[derive(Debug, Clone)]
pub struct ExchangeRateClient {
    client: reqwest::Client,
    url: String,
}

impl ExchangeRateClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl ExchangeRateGateway for ExchangeRateClient {
    async fn fetch_rates(&self) -> Result<HashMap<String, f64>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("failed to reach the exchange rate API")?;

        if !response.status().is_success() {
            anyhow::bail!("exchange rate API returned status {}", response.status());
        }

        let envelope = response
            .json::<RatesEnvelope>()
            .await
            .context("failed to parse the exchange rate payload")?;

        Ok(envelope.rates)
    }
}
