// SQLite repository implementation
use crate::application::country_repository::CountryRepository;
use crate::domain::country::{Country, CountryStatus, GdpSort, NewCountry};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

const SELECT_COLUMNS: &str = "SELECT id, name, capital, region, population, currency_code, \
     exchange_rate, estimated_gdp, flag_url, last_refreshed_at FROM countries";

#[derive(Debug, Clone)]
pub struct SqliteCountryRepository {
    pool: SqlitePool,
}

impl SqliteCountryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database behind `database_url`.
    pub async fn connect(database_url: &str) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("invalid database URL")?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("failed to open the countries database")?;

        Ok(pool)
    }

    pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS countries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                capital TEXT,
                region TEXT,
                population INTEGER NOT NULL,
                currency_code TEXT,
                exchange_rate REAL,
                estimated_gdp REAL,
                flag_url TEXT,
                last_refreshed_at TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await
        .context("failed to create the countries table")?;

        Ok(())
    }
}

#[async_trait]
impl CountryRepository for SqliteCountryRepository {
    async fn list_all(&self) -> Result<Vec<Country>> {
        sqlx::query_as::<_, Country>(SELECT_COLUMNS)
            .fetch_all(&self.pool)
            .await
            .context("failed to list countries")
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Country>> {
        let query = format!("{SELECT_COLUMNS} WHERE name = ?");
        sqlx::query_as::<_, Country>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up country by name")
    }

    async fn find_by_region(&self, region: &str) -> Result<Vec<Country>> {
        let query = format!("{SELECT_COLUMNS} WHERE region = ?");
        sqlx::query_as::<_, Country>(&query)
            .bind(region)
            .fetch_all(&self.pool)
            .await
            .context("failed to query countries by region")
    }

    async fn find_by_currency(&self, code: &str) -> Result<Vec<Country>> {
        let query = format!("{SELECT_COLUMNS} WHERE currency_code = ?");
        sqlx::query_as::<_, Country>(&query)
            .bind(code)
            .fetch_all(&self.pool)
            .await
            .context("failed to query countries by currency")
    }

    async fn list_by_gdp(&self, order: GdpSort) -> Result<Vec<Country>> {
        let direction = match order {
            GdpSort::Ascending => "ASC",
            GdpSort::Descending => "DESC",
        };
        let query = format!("{SELECT_COLUMNS} ORDER BY estimated_gdp {direction}");
        sqlx::query_as::<_, Country>(&query)
            .fetch_all(&self.pool)
            .await
            .context("failed to query countries ordered by GDP")
    }

    async fn insert(&self, record: &NewCountry, refreshed_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO countries (name, capital, region, population, currency_code, \
             exchange_rate, estimated_gdp, flag_url, last_refreshed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.name)
        .bind(&record.capital)
        .bind(&record.region)
        .bind(record.population)
        .bind(&record.currency_code)
        .bind(record.exchange_rate)
        .bind(record.estimated_gdp)
        .bind(&record.flag_url)
        .bind(refreshed_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert country '{}'", record.name))?;

        Ok(())
    }

    async fn update(
        &self,
        id: i64,
        record: &NewCountry,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE countries SET capital = ?, region = ?, population = ?, \
             currency_code = ?, exchange_rate = ?, estimated_gdp = ?, flag_url = ?, \
             last_refreshed_at = ? WHERE id = ?",
        )
        .bind(&record.capital)
        .bind(&record.region)
        .bind(record.population)
        .bind(&record.currency_code)
        .bind(record.exchange_rate)
        .bind(record.estimated_gdp)
        .bind(&record.flag_url)
        .bind(refreshed_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update country '{}'", record.name))?;

        Ok(())
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM countries WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .context("failed to delete country")?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM countries")
            .fetch_one(&self.pool)
            .await
            .context("failed to count countries")
    }

    async fn status(&self) -> Result<CountryStatus> {
        // MAX over RFC3339 text: lexicographic order matches chronological
        // order for a fixed UTC offset.
        let (total_countries, last_refreshed_at) =
            sqlx::query_as::<_, (i64, Option<DateTime<Utc>>)>(
                "SELECT COUNT(*), MAX(last_refreshed_at) FROM countries",
            )
            .fetch_one(&self.pool)
            .await
            .context("failed to query country status")?;

        Ok(CountryStatus {
            total_countries,
            last_refreshed_at,
        })
    }
}
