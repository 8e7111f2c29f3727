pub mod corridor;

use crate::models::location::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Below this latitude/longitude delta (radians) the equirectangular
/// projection is within a few metres of the great-circle answer.
const FLAT_EARTH_DELTA_RAD: f64 = 0.01;

pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    if a.lat == b.lat && a.lng == b.lng {
        return 0.0;
    }

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    if delta_lat.abs() < FLAT_EARTH_DELTA_RAD && delta_lng.abs() < FLAT_EARTH_DELTA_RAD {
        let x = delta_lng * ((lat1 + lat2) / 2.0).cos();
        return (x * x + delta_lat * delta_lat).sqrt() * EARTH_RADIUS_KM;
    }

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().atan2((1.0 - haversine).sqrt());

    EARTH_RADIUS_KM * central_angle
}

/// Initial compass bearing from `a` towards `b`, degrees in `[0, 360)`.
pub fn bearing_deg(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}
