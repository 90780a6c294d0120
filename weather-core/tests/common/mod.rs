//! Scripted in-process provider shared by the integration tests.
#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use weather_core::{
    Location, MemoryStore, WeatherError, WeatherProvider, WeatherSnapshot,
    error::Result,
    store::{LOCATION_KEY, WEATHER_KEY},
};

/// Answers provider calls from canned data and counts them.
///
/// A gate, when set, holds the matching call open until the test releases it.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    pub weather_calls: AtomicUsize,
    pub reverse_calls: AtomicUsize,
    pub geocode_calls: AtomicUsize,
    pub zip_calls: AtomicUsize,

    /// Name put into weather reports; `None` makes weather calls fail.
    weather_name: Mutex<Option<String>>,
    reverse_result: Mutex<Option<Vec<Location>>>,
    geocode_result: Mutex<Option<Vec<Location>>>,
    zip_result: Mutex<Option<Location>>,

    weather_gate: Option<Arc<Notify>>,
    reverse_gate: Option<Arc<Notify>>,
    geocode_gate: Option<Arc<Notify>>,
    pub weather_started: Notify,
    pub reverse_started: Notify,
    pub geocode_started: Notify,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        let provider = Self::default();
        *provider.weather_name.lock() = Some("Fresh".to_string());
        provider
    }

    pub fn failing_weather(self) -> Self {
        *self.weather_name.lock() = None;
        self
    }

    pub fn with_reverse(self, result: Vec<Location>) -> Self {
        *self.reverse_result.lock() = Some(result);
        self
    }

    pub fn with_geocode(self, result: Vec<Location>) -> Self {
        *self.geocode_result.lock() = Some(result);
        self
    }

    pub fn with_zip(self, result: Location) -> Self {
        *self.zip_result.lock() = Some(result);
        self
    }

    pub fn gate_weather(mut self, gate: Arc<Notify>) -> Self {
        self.weather_gate = Some(gate);
        self
    }

    pub fn gate_reverse(mut self, gate: Arc<Notify>) -> Self {
        self.reverse_gate = Some(gate);
        self
    }

    pub fn gate_geocode(mut self, gate: Arc<Notify>) -> Self {
        self.geocode_gate = Some(gate);
        self
    }

    pub fn weather_calls(&self) -> usize {
        self.weather_calls.load(Ordering::SeqCst)
    }

    pub fn reverse_calls(&self) -> usize {
        self.reverse_calls.load(Ordering::SeqCst)
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    pub fn zip_calls(&self) -> usize {
        self.zip_calls.load(Ordering::SeqCst)
    }
}

fn server_error() -> WeatherError {
    WeatherError::Provider { status: 500, body: "scripted failure".to_string() }
}

#[async_trait]
impl WeatherProvider for ScriptedProvider {
    async fn weather_by_query(&self, _query: &str) -> Result<WeatherSnapshot> {
        self.weather_by_coords(0.0, 0.0).await
    }

    async fn weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        self.weather_calls.fetch_add(1, Ordering::SeqCst);
        self.weather_started.notify_one();
        if let Some(gate) = &self.weather_gate {
            gate.notified().await;
        }

        let name = self.weather_name.lock().clone();
        match name {
            Some(name) => Ok(snapshot_at(lat, lon, 0, &name)),
            None => Err(server_error()),
        }
    }

    async fn geocode(&self, _query: &str, limit: u32) -> Result<Vec<Location>> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.geocode_started.notify_one();
        if let Some(gate) = &self.geocode_gate {
            gate.notified().await;
        }

        let result = self.geocode_result.lock().clone();
        result
            .map(|r| r.into_iter().take(limit as usize).collect())
            .ok_or_else(server_error)
    }

    async fn reverse_geocode(&self, _lat: f64, _lon: f64, _limit: u32) -> Result<Vec<Location>> {
        self.reverse_calls.fetch_add(1, Ordering::SeqCst);
        self.reverse_started.notify_one();
        if let Some(gate) = &self.reverse_gate {
            gate.notified().await;
        }

        let result = self.reverse_result.lock().clone();
        result.ok_or_else(server_error)
    }

    async fn zip_lookup(&self, zip: &str) -> Result<Location> {
        self.zip_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.zip_result.lock().clone();
        result.ok_or_else(|| WeatherError::NotFound(zip.to_string()))
    }
}

pub fn snapshot_at(lat: f64, lon: f64, timestamp: i64, name: &str) -> WeatherSnapshot {
    let json = serde_json::json!({
        "timestamp": timestamp,
        "coord": {"lat": lat, "lon": lon},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "main": {
            "temp": 285.75, "feels_like": 284.97, "temp_min": 283.56, "temp_max": 287.27,
            "pressure": 1020, "humidity": 73
        },
        "sys": {"country": "IT", "sunrise": 1695877772, "sunset": 1695920645},
        "timezone": 7200,
        "name": name
    });
    serde_json::from_value(json).expect("sample snapshot is valid")
}

pub fn named(lat: f64, lon: f64, name: &str) -> Location {
    let mut location = Location::from_coordinates(lat, lon);
    location.name = Some(name.to_string());
    location.country = Some("IT".to_string());
    location
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub fn minutes_ago(minutes: i64) -> i64 {
    now_ms() - minutes * 60 * 1000
}

pub fn store_with(location: Option<&Location>, snapshot: Option<&WeatherSnapshot>) -> Arc<MemoryStore> {
    let mut entries = Vec::new();
    if let Some(location) = location {
        entries.push((LOCATION_KEY, serde_json::to_string(location).expect("location serializes")));
    }
    if let Some(snapshot) = snapshot {
        entries.push((WEATHER_KEY, serde_json::to_string(snapshot).expect("snapshot serializes")));
    }
    Arc::new(MemoryStore::with_entries(entries))
}
