// Service-level error taxonomy
use thiserror::Error;

/// Errors surfaced by the country use cases. The two upstream variants are
/// distinct so the HTTP layer can tell the caller which dependency failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("could not fetch data from the country data API")]
    CountryData(#[source] anyhow::Error),

    #[error("country data payload is invalid: {0}")]
    InvalidCountryPayload(String),

    #[error("could not fetch data from the exchange rate API")]
    ExchangeRate(#[source] anyhow::Error),

    #[error("summary image could not be generated")]
    ImageGeneration(#[source] anyhow::Error),

    #[error("country not found")]
    NotFound,

    #[error("invalid sort value: must be 'gdp_asc' or 'gdp_desc'")]
    InvalidSort,

    #[error("storage error")]
    Storage(#[source] anyhow::Error),
}
