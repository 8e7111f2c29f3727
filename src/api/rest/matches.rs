use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::engine::lifecycle::{self, AcceptedMatch};
use crate::engine::matching;
use crate::error::AppError;
use crate::models::matching::Match;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/matches/batch", post(create_matches))
        .route("/matches/:id/accept", post(accept_match))
}

#[derive(Debug, Deserialize)]
pub struct AcceptMatchRequest {
    pub fare: f64,
}

async fn create_matches(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<(StatusCode, Json<Vec<Match>>), AppError> {
    let created = matching::create_matches(&state, &principal).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// The response body is the only place the handoff codes ever appear.
async fn accept_match(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptMatchRequest>,
) -> Result<Json<AcceptedMatch>, AppError> {
    Ok(Json(lifecycle::accept_match(&state, &principal, id, payload.fare).await?))
}
