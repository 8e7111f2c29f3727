use serde::Deserialize;
use tracing::info;

use crate::auth::{Principal, Role};
use crate::error::AppError;
use crate::models::location::GeoPoint;
use crate::models::traveler::TravelerProfile;
use crate::state::AppState;

/// Position may come as a live fix, a declared pickup, or both.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteUpdate {
    pub current_location: Option<GeoPoint>,
    pub pickup: Option<GeoPoint>,
    pub destination: GeoPoint,
}

pub async fn update_route(
    state: &AppState,
    principal: &Principal,
    update: RouteUpdate,
) -> Result<TravelerProfile, AppError> {
    principal.require_role(Role::Traveler)?;

    if !update.destination.is_valid() {
        return Err(AppError::Validation("invalid destination".to_string()));
    }
    let origins = [update.current_location, update.pickup];
    if origins.iter().flatten().any(|point| !point.is_valid()) {
        return Err(AppError::Validation("invalid coordinates".to_string()));
    }
    if origins.iter().all(Option::is_none) {
        return Err(AppError::Validation(
            "current_location or pickup is required".to_string(),
        ));
    }

    let profile = TravelerProfile {
        id: principal.id,
        current_location: update.current_location,
        pickup: update.pickup,
        destination: Some(update.destination),
        updated_at: state.clock.now(),
    };
    let profile = state.store.upsert_traveler(profile).await?;

    // matching answers depend on the traveler pool
    state.caches.matching.clear();

    info!(traveler_id = %profile.id, "traveler route updated");
    Ok(profile)
}
