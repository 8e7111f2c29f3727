use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Principal;
use crate::engine::matching;
use crate::engine::requests::{self, NewRequest};
use crate::error::AppError;
use crate::models::matching::RankedMatch;
use crate::models::page::{Page, PageRequest};
use crate::models::request::{ParcelRequest, RequestStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", post(create_request).get(search_requests))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/cancel", post(cancel_request))
        .route("/requests/:id/matches", get(request_matches))
        .route("/feed", get(feed))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub status: Option<RequestStatus>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(payload): Json<NewRequest>,
) -> Result<(StatusCode, Json<ParcelRequest>), AppError> {
    let request = requests::create_request(&state, &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn search_requests(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<ParcelRequest>>, AppError> {
    let page = PageRequest::new(params.page, params.limit);
    let result = requests::search_requests(&state, &principal, params.status, page).await?;
    Ok(Json(result))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ParcelRequest>, AppError> {
    Ok(Json(requests::get_request(&state, &principal, id).await?))
}

async fn cancel_request(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<ParcelRequest>, AppError> {
    Ok(Json(requests::cancel_request(&state, &principal, id).await?))
}

async fn request_matches(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RankedMatch>>, AppError> {
    Ok(Json(matching::matches_for_request(&state, &principal, id).await?))
}

async fn feed(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<ParcelRequest>>, AppError> {
    let page = PageRequest::new(params.page, params.limit);
    Ok(Json(requests::feed(&state, &principal, page).await?))
}
