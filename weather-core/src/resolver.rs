//! Turns free-text queries and raw coordinates into named [`Location`]s.
//!
//! Every remote failure is swallowed here: a search that goes wrong simply
//! yields no results.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{model::Location, provider::WeatherProvider};

/// Queries shorter than this (after trimming) never reach the provider.
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    ZipLike,
    NameLike,
}

/// Two or more digits reads as a postal code. A heuristic, not a rule:
/// "Route 66" classifies as a zip code.
pub fn classify(query: &str) -> QueryKind {
    if query.chars().filter(char::is_ascii_digit).count() >= 2 {
        QueryKind::ZipLike
    } else {
        QueryKind::NameLike
    }
}

pub(crate) fn is_searchable(query: &str) -> bool {
    query.chars().count() >= MIN_QUERY_LEN
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    provider: Arc<dyn WeatherProvider>,
}

impl LocationResolver {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    pub async fn search_by_name(&self, query: &str, limit: u32) -> Vec<Location> {
        let query = query.trim();
        if !is_searchable(query) {
            return Vec::new();
        }

        match self.provider.geocode(query, limit).await {
            Ok(results) => {
                let results: Vec<Location> = results.into_iter().filter(Location::is_valid).collect();
                debug!(query, count = results.len(), "geocode search finished");
                results
            }
            Err(e) => {
                warn!(query, error = %e, "geocode search failed");
                Vec::new()
            }
        }
    }

    pub async fn search_by_zip(&self, query: &str) -> Option<Location> {
        let query = query.trim();
        if !is_searchable(query) {
            return None;
        }

        match self.provider.zip_lookup(query).await {
            Ok(location) if location.is_valid() => Some(location),
            Ok(location) => {
                warn!(query, lat = location.lat, lon = location.lon, "zip lookup returned invalid coordinate");
                None
            }
            Err(e) => {
                warn!(query, error = %e, "zip lookup failed");
                None
            }
        }
    }

    /// Reverse geocodes a coordinate; only a result carrying a name counts.
    pub async fn resolve_name(&self, lat: f64, lon: f64) -> Option<Location> {
        match self.provider.reverse_geocode(lat, lon, 1).await {
            Ok(results) => {
                let named = results.into_iter().next().filter(Location::has_name);
                if named.is_none() {
                    debug!(lat, lon, "reverse geocode found no named place");
                }
                named
            }
            Err(e) => {
                warn!(lat, lon, error = %e, "reverse geocode failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_zip_like_queries() {
        assert_eq!(classify("10001"), QueryKind::ZipLike);
        assert_eq!(classify("E14,GB"), QueryKind::ZipLike);
        assert_eq!(classify("Route 66"), QueryKind::ZipLike);
    }

    #[test]
    fn classify_name_like_queries() {
        assert_eq!(classify("London"), QueryKind::NameLike);
        assert_eq!(classify("District 9"), QueryKind::NameLike);
        assert_eq!(classify(""), QueryKind::NameLike);
    }

    #[test]
    fn minimum_query_length() {
        assert!(!is_searchable(""));
        assert!(!is_searchable("L"));
        assert!(is_searchable("LA"));
    }
}
