use crate::geo::distance_km;
use crate::models::location::GeoPoint;

pub const DEFAULT_CORRIDOR_KM: f64 = 5.0;

/// Returned by [`detour_km`] when no meaningful detour exists.
pub const UNBOUNDED_DETOUR: f64 = f64::INFINITY;

/// True when both pickups and both drops lie within `threshold_km` of each
/// other. Non-finite coordinates never match.
pub fn routes_similar(
    user_pickup: &GeoPoint,
    user_drop: &GeoPoint,
    traveler_pickup: &GeoPoint,
    traveler_drop: &GeoPoint,
    threshold_km: f64,
) -> bool {
    let all_finite = [user_pickup, user_drop, traveler_pickup, traveler_drop]
        .iter()
        .all(|p| p.is_finite());
    if !all_finite || !threshold_km.is_finite() {
        return false;
    }

    if distance_km(user_pickup, traveler_pickup) > threshold_km {
        return false;
    }

    distance_km(user_drop, traveler_drop) <= threshold_km
}

/// Extra kilometres the traveler covers by going
/// `traveler_pickup -> user_pickup -> user_drop -> traveler_drop` instead of
/// straight to `traveler_drop`.
pub fn detour_km(
    user_pickup: &GeoPoint,
    user_drop: &GeoPoint,
    traveler_pickup: &GeoPoint,
    traveler_drop: &GeoPoint,
) -> f64 {
    let all_finite = [user_pickup, user_drop, traveler_pickup, traveler_drop]
        .iter()
        .all(|p| p.is_finite());
    if !all_finite {
        return UNBOUNDED_DETOUR;
    }

    let direct = distance_km(traveler_pickup, traveler_drop);
    if direct == 0.0 || !direct.is_finite() {
        return UNBOUNDED_DETOUR;
    }

    let via_parcel = distance_km(traveler_pickup, user_pickup)
        + distance_km(user_pickup, user_drop)
        + distance_km(user_drop, traveler_drop);

    via_parcel - direct
}
