use thiserror::Error;

/// Failures raised by the provider, the store and the data model.
///
/// None of these reach the presentation layer: the cache and the resolver
/// log them and fall back to "keep the previous data" or "no data".
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Deserialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::Deserialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WeatherError>;
