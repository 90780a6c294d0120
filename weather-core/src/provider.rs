use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config,
    error::Result,
    model::{Location, WeatherSnapshot},
    provider::openweather::OpenWeatherProvider,
};

pub mod openweather;

/// Typed client for the remote weather and geocoding service.
///
/// Every call is a plain request/response: success means a 2xx status with a
/// parseable body, anything else is a [`crate::WeatherError`].
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn weather_by_query(&self, query: &str) -> Result<WeatherSnapshot>;

    async fn weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot>;

    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<Location>>;

    async fn reverse_geocode(&self, lat: f64, lon: f64, limit: u32) -> Result<Vec<Location>>;

    async fn zip_lookup(&self, zip: &str) -> Result<Location>;
}

/// Construct the provider described by the config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<OpenWeatherProvider> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured.\n\
                 Hint: run `weather configure` or set OPENWEATHER_API_KEY."
        )
    })?;

    Ok(OpenWeatherProvider::with_base_url(api_key, config.base_url()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        if cfg.api_key().is_some() {
            // OPENWEATHER_API_KEY is set in this environment
            return;
        }
        let err = provider_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
        assert!(err.to_string().contains("Hint: run `weather configure`"));
    }

    #[test]
    fn provider_from_config_uses_configured_base_url() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());
        cfg.base_url = Some("http://localhost:9999/".to_string());

        let provider = provider_from_config(&cfg).expect("provider should build");
        assert_eq!(provider.base_url(), "http://localhost:9999");
    }
}
