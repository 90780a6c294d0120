//! Great-circle distance and the proximity policy used by the cache.

/// Mean Earth radius in meters (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Two coordinates closer than this are treated as the same location.
pub const DISTANCE_THRESHOLD_M: f64 = 250.0;

/// Haversine distance between two `(lat, lon)` pairs given in degrees.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // clamp guards against rounding pushing `a` just above 1 for antipodes
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

pub fn is_close_enough(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> bool {
    distance_meters(lat1, lon1, lat2, lon2) < DISTANCE_THRESHOLD_M
}
