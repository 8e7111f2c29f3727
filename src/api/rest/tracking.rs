use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::engine::tracking;
use crate::error::AppError;
use crate::models::location::{GeoPoint, LocationPing};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/tracking/location", post(record_position))
}

#[derive(Debug, Deserialize)]
pub struct PositionReport {
    pub delivery_id: Uuid,
    pub lat: f64,
    pub lng: f64,
}

async fn record_position(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<PositionReport>,
) -> Result<Json<LocationPing>, AppError> {
    let position = GeoPoint {
        lat: payload.lat,
        lng: payload.lng,
    };
    let ping = tracking::record_position(&state, &principal, payload.delivery_id, position).await?;
    Ok(Json(ping))
}
