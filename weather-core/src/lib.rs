//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The remote weather/geocoding provider abstraction
//! - Location resolution (place-name and zip search, reverse geocoding)
//! - The weather cache: current location and current report as observable
//!   state, persisted in a durable key-value store
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod cache;
pub mod config;
pub mod device;
pub mod error;
pub mod geo;
pub mod model;
pub mod observable;
pub mod provider;
pub mod resolver;
pub mod search;
pub mod store;

pub use cache::WeatherCache;
pub use config::Config;
pub use device::{DeviceLocator, FixedLocator, LocationError};
pub use error::WeatherError;
pub use model::{Location, WeatherSnapshot, kelvin_to_fahrenheit};
pub use observable::{Observable, Subscription};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use resolver::{LocationResolver, QueryKind, classify};
pub use search::LocationSearch;
pub use store::{FileStore, MemoryStore, PersistentStore};
