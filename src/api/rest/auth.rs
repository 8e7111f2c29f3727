use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::login;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/otp/request", post(request_code))
        .route("/auth/otp/verify", post(verify_code))
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct CodeIssued {
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CodeVerification {
    pub phone: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
pub struct CodeVerified {
    pub verified: bool,
}

async fn request_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CodeRequest>,
) -> Result<Json<CodeIssued>, AppError> {
    let expires_at = login::request_login_code(&state, payload.phone.trim()).await?;
    Ok(Json(CodeIssued { expires_at }))
}

async fn verify_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CodeVerification>,
) -> Result<Json<CodeVerified>, AppError> {
    login::verify_login_code(&state, payload.phone.trim(), payload.otp.trim()).await?;
    Ok(Json(CodeVerified { verified: true }))
}
