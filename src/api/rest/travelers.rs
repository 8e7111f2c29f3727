use std::sync::Arc;

use axum::extract::State;
use axum::routing::put;
use axum::Json;
use axum::Router;

use crate::auth::Principal;
use crate::engine::travelers::{self, RouteUpdate};
use crate::error::AppError;
use crate::models::traveler::TravelerProfile;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/travelers/route", put(update_route))
}

async fn update_route(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<RouteUpdate>,
) -> Result<Json<TravelerProfile>, AppError> {
    Ok(Json(travelers::update_route(&state, &principal, payload).await?))
}
