use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeatherError};
use crate::geo;

/// Cached weather older than this is refreshed in the background.
pub const STALENESS_THRESHOLD_MS: i64 = 30 * 60 * 1000;

/// A named or nameless point on the map.
///
/// Field names follow the provider's geocoding payload so search results
/// deserialize directly into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_names: Option<HashMap<String, String>>,
}

impl Location {
    /// Validated constructor for a nameless location.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        let location = Self::from_coordinates(lat, lon);
        if !location.is_valid() {
            return Err(WeatherError::InvalidCoordinate { lat, lon });
        }
        Ok(location)
    }

    pub fn from_coordinates(lat: f64, lon: f64) -> Self {
        Self { lat, lon, name: None, state: None, country: None, local_names: None }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }

    pub fn same_coordinates(&self, other: &Location) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }

    /// Human-readable label: `name, state, country` with missing parts dropped,
    /// or the raw coordinate when there is no name yet.
    pub fn display_text(&self) -> String {
        let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) else {
            return format!("({}, {})", self.lat, self.lon);
        };

        match (self.state.as_deref(), self.country.as_deref()) {
            (None, None) => name.to_string(),
            (None, Some(country)) => format!("{name}, {country}"),
            (Some(state), None) => format!("{name}, {state}"),
            (Some(state), Some(country)) => format!("{name}, {state}, {country}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// Temperatures are in Kelvin, as the provider reports them by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub humidity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sea_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grnd_level: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deg: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    pub all: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Epoch seconds, UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<i64>,
    /// Epoch seconds, UTC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset: Option<i64>,
}

/// One current-weather report.
///
/// `timestamp` is not part of the provider payload: the cache stamps it with
/// the local fetch time (ms since epoch) and uses it for the staleness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(default)]
    pub timestamp: i64,
    pub coord: Coord,
    pub weather: Vec<Condition>,
    pub main: MainReadings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clouds: Option<Clouds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys: Option<Sys>,
    /// Offset from UTC in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cod: Option<i64>,
}

impl WeatherSnapshot {
    pub fn validate(self) -> Result<Self> {
        if self.weather.is_empty() {
            return Err(WeatherError::Deserialization(
                "weather report has no condition entries".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }

    pub fn is_recent(&self, now_ms: i64) -> bool {
        self.age_ms(now_ms) < STALENESS_THRESHOLD_MS
    }

    pub fn is_near(&self, location: &Location) -> bool {
        geo::is_close_enough(location.lat, location.lon, self.coord.lat, self.coord.lon)
    }
}

pub fn kelvin_to_fahrenheit(kelvin: f64) -> i64 {
    ((kelvin - 273.0) * 1.8 + 32.0).round() as i64
}
