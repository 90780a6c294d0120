//! Device location seam: the platform supplies one coordinate on demand.

use async_trait::async_trait;
use std::fmt::Debug;

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location service unavailable")]
    Unavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location fix out of range: ({lat}, {lon})")]
    OutOfRange { lat: f64, lon: f64 },
}

#[async_trait]
pub trait DeviceLocator: Send + Sync + Debug {
    /// One-shot `(lat, lon)` fix.
    async fn current_coordinate(&self) -> Result<(f64, f64), LocationError>;
}

/// A locator that always reports the same point, e.g. one typed on the
/// command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator {
    lat: f64,
    lon: f64,
}

impl FixedLocator {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[async_trait]
impl DeviceLocator for FixedLocator {
    async fn current_coordinate(&self) -> Result<(f64, f64), LocationError> {
        Ok((self.lat, self.lon))
    }
}

/// A locator with no fix available.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLocator;

#[async_trait]
impl DeviceLocator for UnavailableLocator {
    async fn current_coordinate(&self) -> Result<(f64, f64), LocationError> {
        Err(LocationError::Unavailable)
    }
}
