// Repository trait for country data access
use crate::domain::country::{Country, CountryStatus, GdpSort, NewCountry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait CountryRepository: Send + Sync {
    /// List every persisted country.
    async fn list_all(&self) -> anyhow::Result<Vec<Country>>;

    /// Look up a single country by its lower-cased name.
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Country>>;

    /// Exact match on region.
    async fn find_by_region(&self, region: &str) -> anyhow::Result<Vec<Country>>;

    /// Exact match on currency code.
    async fn find_by_currency(&self, code: &str) -> anyhow::Result<Vec<Country>>;

    /// All countries ordered by estimated GDP.
    async fn list_by_gdp(&self, order: GdpSort) -> anyhow::Result<Vec<Country>>;

    /// Insert a new row stamped with the batch timestamp.
    async fn insert(&self, record: &NewCountry, refreshed_at: DateTime<Utc>)
    -> anyhow::Result<()>;

    /// Overwrite every mutable field of an existing row. `id` and `name`
    /// are preserved.
    async fn update(
        &self,
        id: i64,
        record: &NewCountry,
        refreshed_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Delete by lower-cased name. Returns false when no row matched.
    async fn delete_by_name(&self, name: &str) -> anyhow::Result<bool>;

    async fn count(&self) -> anyhow::Result<i64>;

    /// Row count plus MAX(last_refreshed_at) across all rows.
    async fn status(&self) -> anyhow::Result<CountryStatus>;
}
