//! The current location and the current weather report, with the policy that
//! decides when a cached report can be shown and when it must be refreshed.
//!
//! Policy for [`WeatherCache::get_weather`] without `force_refresh`:
//!
//! | cached report                      | action                                   |
//! |------------------------------------|------------------------------------------|
//! | none                               | fetch, nothing published meanwhile       |
//! | within 250 m, younger than 30 min  | publish it, no network call              |
//! | within 250 m, 30 min or older      | publish it, then fetch                   |
//! | farther than 250 m                 | publish "no weather", then fetch         |
//!
//! Every failure is logged and swallowed: observers only ever see the
//! previous data or no data.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    device::{DeviceLocator, LocationError},
    model::{Location, WeatherSnapshot},
    observable::Observable,
    provider::WeatherProvider,
    resolver::LocationResolver,
    store::{LOCATION_KEY, PersistentStore, WEATHER_KEY},
};

/// How long [`WeatherCache::save_device_location`] waits for a fix.
pub const DEVICE_FIX_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct WeatherCache {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn PersistentStore>,
    resolver: LocationResolver,

    location: Observable<Option<Location>>,
    weather: Observable<Option<WeatherSnapshot>>,
    is_loading: Observable<bool>,

    /// Last known report, possibly for another location than the current one.
    snapshot: Mutex<Option<WeatherSnapshot>>,
    snapshot_loaded: OnceCell<()>,
    /// Keeps publish + persist of a location in one step.
    location_write: tokio::sync::Mutex<()>,
    /// Coordinates with a weather fetch running.
    in_flight: Mutex<Vec<(f64, f64)>>,
    device_timeout: Duration,
}

impl WeatherCache {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: Arc<dyn PersistentStore>) -> Self {
        Self {
            resolver: LocationResolver::new(provider.clone()),
            provider,
            store,
            location: Observable::new(None),
            weather: Observable::new(None),
            is_loading: Observable::new(false),
            snapshot: Mutex::new(None),
            snapshot_loaded: OnceCell::new(),
            location_write: tokio::sync::Mutex::new(()),
            in_flight: Mutex::new(Vec::new()),
            device_timeout: DEVICE_FIX_TIMEOUT,
        }
    }

    pub fn with_device_timeout(mut self, timeout: Duration) -> Self {
        self.device_timeout = timeout;
        self
    }

    pub fn location(&self) -> &Observable<Option<Location>> {
        &self.location
    }

    pub fn weather(&self) -> &Observable<Option<WeatherSnapshot>> {
        &self.weather
    }

    pub fn is_loading(&self) -> &Observable<bool> {
        &self.is_loading
    }

    /// Reads the persisted location. It becomes current only if nothing is
    /// current yet; it is returned either way.
    pub async fn load_location(&self) -> Option<Location> {
        let data = self.read_store().await?;
        let location = decode::<Location>(&data, LOCATION_KEY)?;
        if !location.is_valid() {
            warn!(lat = location.lat, lon = location.lon, "ignoring persisted location out of range");
            return None;
        }

        if self.location.set_if(Option::is_none, Some(location.clone())) {
            info!(location = %location.display_text(), "restored saved location");
        }
        Some(location)
    }

    /// Makes `location` current right away, then tries to attach a name to a
    /// nameless location by reverse geocoding.
    ///
    /// The name is applied only while `location` is still current, and the
    /// named result keeps the original coordinates rather than the
    /// geocoder's. A location with out-of-range coordinates is rejected
    /// without touching any state.
    pub async fn save_location(&self, location: Location) {
        if !location.is_valid() {
            warn!(lat = location.lat, lon = location.lon, "refusing to save location out of range");
            return;
        }

        self.publish_location(location.clone(), |_| true).await;
        info!(location = %location.display_text(), "location saved");

        if location.has_name() {
            return;
        }

        let Some(mut named) = self.resolver.resolve_name(location.lat, location.lon).await else {
            return;
        };
        named.lat = location.lat;
        named.lon = location.lon;

        let applied = self
            .publish_location(named, |current| current.as_ref() == Some(&location))
            .await;
        if applied {
            debug!(lat = location.lat, lon = location.lon, "named location applied");
        } else {
            info!(lat = location.lat, lon = location.lon, "location changed during reverse geocode, dropping name");
        }
    }

    /// Takes a one-shot fix from the device and saves it as a nameless
    /// location. A locator that does not answer within the device timeout
    /// fails with [`LocationError::Timeout`].
    pub async fn save_device_location(
        &self,
        locator: &dyn DeviceLocator,
    ) -> Result<Location, LocationError> {
        let (lat, lon) = tokio::time::timeout(self.device_timeout, locator.current_coordinate())
            .await
            .unwrap_or(Err(LocationError::Timeout))
            .inspect_err(|e| {
                warn!(error = %e, "device location unavailable");
            })?;
        let location =
            Location::new(lat, lon).map_err(|_| LocationError::OutOfRange { lat, lon })?;

        self.save_location(location.clone()).await;
        Ok(location)
    }

    pub async fn get_weather(&self, force_refresh: bool) {
        let Some(location) = self.location.get() else {
            debug!("no current location, skipping weather lookup");
            return;
        };

        if !force_refresh {
            self.ensure_snapshot_loaded().await;

            let cached = self.snapshot.lock().clone();
            if let Some(snapshot) = cached {
                if snapshot.is_near(&location) {
                    let fresh = snapshot.is_recent(now_ms());
                    self.weather.set(Some(snapshot));
                    if fresh {
                        debug!(location = %location.display_text(), "serving cached weather");
                        return;
                    }
                    debug!("cached weather is stale, refreshing");
                } else {
                    debug!("cached weather is for another location, clearing");
                    self.weather.set(None);
                }
            }
        }

        self.refresh(&location).await;
    }

    async fn refresh(&self, location: &Location) {
        let Some(_flight) = InFlight::begin(self, location) else {
            debug!(lat = location.lat, lon = location.lon, "refresh already running for this location");
            return;
        };

        let mut snapshot = match self.provider.weather_by_coords(location.lat, location.lon).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "weather refresh failed, keeping previous data");
                return;
            }
        };
        snapshot.timestamp = now_ms();

        let superseded = self
            .location
            .get()
            .is_none_or(|current| !current.same_coordinates(location));
        if superseded {
            info!(lat = location.lat, lon = location.lon, "location changed during refresh, discarding result");
            return;
        }

        *self.snapshot.lock() = Some(snapshot.clone());
        self.weather.set(Some(snapshot.clone()));
        self.persist(WEATHER_KEY, &snapshot).await;
        info!(location = %location.display_text(), "weather refreshed");
    }

    async fn ensure_snapshot_loaded(&self) {
        self.snapshot_loaded
            .get_or_init(|| async {
                let loaded = self
                    .read_store()
                    .await
                    .and_then(|data| decode::<WeatherSnapshot>(&data, WEATHER_KEY))
                    .and_then(|snapshot| match snapshot.validate() {
                        Ok(snapshot) => Some(snapshot),
                        Err(e) => {
                            warn!(error = %e, "ignoring persisted weather");
                            None
                        }
                    });

                let mut slot = self.snapshot.lock();
                // a refresh may already have filled it
                if slot.is_none() {
                    *slot = loaded;
                }
            })
            .await;
    }

    async fn publish_location(
        &self,
        location: Location,
        pred: impl FnOnce(&Option<Location>) -> bool,
    ) -> bool {
        let _guard = self.location_write.lock().await;
        if !self.location.set_if(pred, Some(location.clone())) {
            return false;
        }
        self.persist(LOCATION_KEY, &location).await;
        true
    }

    async fn read_store(&self) -> Option<HashMap<String, String>> {
        match self.store.read().await {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(error = %e, "failed to read persistent store");
                None
            }
        }
    }

    async fn persist<T: Serialize>(&self, key: &'static str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize value");
                return;
            }
        };

        let result = self
            .store
            .write(Box::new(move |data: &mut HashMap<String, String>| {
                data.insert(key.to_string(), json);
            }))
            .await;
        if let Err(e) = result {
            warn!(key, error = %e, "failed to persist value");
        }
    }
}

/// Marks a coordinate as being fetched; the loading flag stays up while any
/// fetch is running.
struct InFlight<'a> {
    cache: &'a WeatherCache,
    key: (f64, f64),
}

impl<'a> InFlight<'a> {
    fn begin(cache: &'a WeatherCache, location: &Location) -> Option<Self> {
        let key = (location.lat, location.lon);
        let mut in_flight = cache.in_flight.lock();
        if in_flight.contains(&key) {
            return None;
        }
        in_flight.push(key);
        if in_flight.len() == 1 {
            cache.is_loading.set(true);
        }
        Some(Self { cache, key })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.cache.in_flight.lock();
        in_flight.retain(|k| *k != self.key);
        if in_flight.is_empty() {
            self.cache.is_loading.set(false);
        }
    }
}

fn decode<T: DeserializeOwned>(data: &HashMap<String, String>, key: &str) -> Option<T> {
    let json = data.get(key)?;
    match serde_json::from_str(json) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "ignoring malformed persisted value");
            None
        }
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
