use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::engine::lifecycle;
use crate::error::AppError;
use crate::models::delivery::Delivery;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries/pickup", post(verify_pickup))
        .route("/deliveries/drop", post(verify_drop))
}

#[derive(Debug, Deserialize)]
pub struct HandoffRequest {
    pub delivery_id: Uuid,
    pub code: String,
}

async fn verify_pickup(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<HandoffRequest>,
) -> Result<Json<Delivery>, AppError> {
    let delivery =
        lifecycle::verify_pickup(&state, &principal, payload.delivery_id, &payload.code).await?;
    Ok(Json(delivery))
}

async fn verify_drop(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<HandoffRequest>,
) -> Result<Json<Delivery>, AppError> {
    let delivery =
        lifecycle::verify_drop(&state, &principal, payload.delivery_id, &payload.code).await?;
    Ok(Json(delivery))
}
