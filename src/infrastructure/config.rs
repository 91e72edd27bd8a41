use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_country_data_api")]
    pub country_data_api: String,
    #[serde(default = "default_exchange_rate_api")]
    pub exchange_rate_api: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    // Embedded file-backed engine when nothing else is configured.
    "sqlite://countries.db".to_string()
}

fn default_country_data_api() -> String {
    "https://restcountries.com/v2/all".to_string()
}

fn default_exchange_rate_api() -> String {
    "https://open.er-api.com/v6/latest/USD".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

/// Load configuration from an optional `config/app` file, overridable by
/// environment variables (`DATABASE_URL`, `COUNTRY_DATA_API`,
/// `EXCHANGE_RATE_API`, ...).
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(config::Environment::default())
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_sources() {
        let settings = config::Config::builder().build().unwrap();
        let config: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.database_url, "sqlite://countries.db");
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.upstream_timeout_secs, 30);
    }
}
