use tracing::debug;
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::error::AppError;
use crate::models::delivery::DeliveryStatus;
use crate::models::event::DomainEvent;
use crate::models::location::{GeoPoint, LocationPing};
use crate::state::AppState;

/// Stores an audit ping and announces it to the delivery's room. Repeats of
/// the same fix inside the tracking cache window are answered from cache and
/// produce neither a write nor an event.
pub async fn record_position(
    state: &AppState,
    principal: &Principal,
    delivery_id: Uuid,
    position: GeoPoint,
) -> Result<LocationPing, AppError> {
    if !position.is_valid() {
        return Err(AppError::Validation("invalid coordinates".to_string()));
    }
    principal.require_role(Role::Traveler)?;

    let delivery = state
        .store
        .get_delivery(delivery_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;
    principal.require_self(delivery.traveler_id, "delivery")?;

    if delivery.status == DeliveryStatus::Delivered {
        return Err(AppError::Conflict(format!("delivery {delivery_id} is already DELIVERED")));
    }

    let cache_key = format!("{delivery_id}-{}-{}", position.lat, position.lng);
    if let Some(ping) = state.cached(&state.caches.tracking, &cache_key) {
        debug!(delivery_id = %delivery_id, "duplicate position ignored");
        return Ok(ping);
    }

    let ping = LocationPing {
        id: Uuid::new_v4(),
        delivery_id,
        reporter_id: principal.id,
        position,
        timestamp: state.clock.now(),
    };
    let ping = state.store.insert_location(ping).await?;

    state.caches.tracking.set(cache_key, ping.clone());
    state.emit(DomainEvent::Position(ping.clone()));
    Ok(ping)
}
