use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::{Result, WeatherError},
    model::{Location, WeatherSnapshot},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const WEATHER_PATH: &str = "data/2.5/weather";
const GEOCODE_PATH: &str = "geo/1.0/direct";
const REVERSE_GEOCODE_PATH: &str = "geo/1.0/reverse";
const ZIP_PATH: &str = "geo/1.0/zip";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at another host, e.g. a local mock server.
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "OpenWeather request");

        let res = self
            .http
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Provider {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            WeatherError::Deserialization(format!("OpenWeather {path} response: {e}"))
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn weather_by_query(&self, query: &str) -> Result<WeatherSnapshot> {
        let snapshot: WeatherSnapshot =
            self.get_json(WEATHER_PATH, &[("q", query.to_string())]).await?;
        snapshot.validate()
    }

    async fn weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        let snapshot: WeatherSnapshot = self
            .get_json(WEATHER_PATH, &[("lat", lat.to_string()), ("lon", lon.to_string())])
            .await?;
        snapshot.validate()
    }

    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<Location>> {
        self.get_json(GEOCODE_PATH, &[("q", query.to_string()), ("limit", limit.to_string())])
            .await
    }

    async fn reverse_geocode(&self, lat: f64, lon: f64, limit: u32) -> Result<Vec<Location>> {
        self.get_json(
            REVERSE_GEOCODE_PATH,
            &[("lat", lat.to_string()), ("lon", lon.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn zip_lookup(&self, zip: &str) -> Result<Location> {
        match self.get_json(ZIP_PATH, &[("zip", zip.to_string())]).await {
            Err(WeatherError::Provider { status: 404, .. }) => {
                Err(WeatherError::NotFound(format!("zip code {zip}")))
            }
            other => other,
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
