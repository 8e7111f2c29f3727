use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::engine::otp::{self, CodeRejection};
use crate::error::AppError;
use crate::state::AppState;

// Sliding window per phone; nothing sweeps idle phones.
pub struct OtpRateLimiter {
    requests: DashMap<String, Vec<DateTime<Utc>>>,
    limit: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl OtpRateLimiter {
    pub fn new(limit: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            requests: DashMap::new(),
            limit,
            window,
            clock,
        }
    }

    pub fn try_acquire(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut entry = self.requests.entry(key.to_string()).or_default();

        entry.retain(|at| now - *at < self.window);
        if entry.len() >= self.limit {
            return false;
        }

        entry.push(now);
        true
    }
}

/// Ten digits, leading 6-9.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10
        && phone.bytes().all(|b| b.is_ascii_digit())
        && matches!(phone.as_bytes()[0], b'6'..=b'9')
}

pub async fn request_login_code(state: &AppState, phone: &str) -> Result<DateTime<Utc>, AppError> {
    if !is_valid_phone(phone) {
        return Err(AppError::Validation(
            "phone must be a 10-digit mobile number starting with 6-9".to_string(),
        ));
    }

    if !state.otp_limiter.try_acquire(phone) {
        warn!("otp quota exhausted");
        return Err(AppError::RateLimited(
            "too many code requests, try again later".to_string(),
        ));
    }

    let code = otp::issue_code();
    let hash = state.otp_hasher.hash(&code)?;
    let expires_at = state
        .login_codes
        .store(phone, hash.clone(), state.login_otp_ttl);

    if let Err(err) = state.notifier.send(&code, phone).await {
        // only this attempt's code; a later request may already own the slot
        state.login_codes.withdraw(phone, &hash);
        error!(reason = %err.reason, "code dispatch failed; pending code withdrawn");
        return Err(AppError::Dependency(err.to_string()));
    }

    info!(%expires_at, "login code issued");
    Ok(expires_at)
}

pub async fn verify_login_code(state: &AppState, phone: &str, code: &str) -> Result<(), AppError> {
    if !is_valid_phone(phone) {
        return Err(AppError::Validation("invalid phone number format".to_string()));
    }
    if !otp::is_well_formed(code) {
        return Err(AppError::Validation("invalid otp format".to_string()));
    }

    let outcome = state
        .login_codes
        .verify_and_consume(phone, code, &state.otp_hasher);
    state.record_otp_check("login", outcome.is_ok());

    match outcome {
        Ok(()) => {
            info!("login code verified");
            Ok(())
        }
        Err(CodeRejection::NotRequested) => {
            Err(AppError::Conflict("otp not requested or already used".to_string()))
        }
        Err(CodeRejection::Expired) => Err(AppError::Conflict("otp has expired".to_string())),
        Err(CodeRejection::Mismatch) => Err(AppError::Validation("invalid otp".to_string())),
    }
}
