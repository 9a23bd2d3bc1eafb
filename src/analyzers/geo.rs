//! Great-circle distance and stop proximity matching.

use crate::model::StopRecord;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Degrees per metre, linearised around Warsaw's latitude.
///
/// The same factor is applied to latitude and longitude, so the tolerance box
/// is only roughly square near 52°N and drifts further away from it.
pub const PROXIMITY_APPROXIMATION: f64 = 0.00001 / 1.30578;

/// Haversine distance in kilometres between two points given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Converts a proximity in metres into a tolerance in decimal degrees.
pub fn proximity_to_tolerance(meters: u32) -> f64 {
    meters as f64 * PROXIMITY_APPROXIMATION
}

/// All stops whose latitude and longitude are each strictly within
/// `tolerance` degrees of the given point, in reference-table order.
pub fn stops_within_tolerance(lat: f64, lon: f64, stops: &[StopRecord], tolerance: f64) -> Vec<&StopRecord> {
    stops
        .iter()
        .filter(|s| (s.latitude - lat).abs() < tolerance && (s.longitude - lon).abs() < tolerance)
        .collect()
}

/// The stop inside the tolerance box that is closest by great-circle
/// distance. Equal distances go to the stop listed first.
pub fn nearest_stop(lat: f64, lon: f64, stops: &[StopRecord], tolerance: f64) -> Option<&StopRecord> {
    stops_within_tolerance(lat, lon, stops, tolerance)
        .into_iter()
        .map(|s| (s, haversine_km(lat, lon, s.latitude, s.longitude)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(s, _)| s)
}
