use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;

use crate::clock::Clock;
use crate::error::AppError;

pub const CODE_LEN: usize = 6;
const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

pub fn issue_code() -> String {
    rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string()
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Clone)]
pub struct OtpHasher {
    argon2: Argon2<'static>,
}

impl OtpHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|err| AppError::Internal(format!("invalid otp hash params: {err}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, code: &str) -> Result<String, AppError> {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .map_err(|err| AppError::Internal(format!("salt encoding failed: {err}")))?;

        self.argon2
            .hash_password(code.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AppError::Internal(format!("otp hashing failed: {err}")))
    }

    pub fn verify(&self, code: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self.argon2.verify_password(code.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRejection {
    NotRequested,
    Expired,
    Mismatch,
}

#[derive(Debug, Clone)]
struct PendingCode {
    hash: String,
    expires_at: DateTime<Utc>,
}

pub struct OtpVault {
    pending: DashMap<String, PendingCode>,
    clock: Arc<dyn Clock>,
}

impl OtpVault {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            pending: DashMap::new(),
            clock,
        }
    }

    pub fn store(&self, key: &str, hash: String, ttl: Duration) -> DateTime<Utc> {
        let expires_at = self.clock.now() + ttl;
        self.pending
            .insert(key.to_string(), PendingCode { hash, expires_at });
        expires_at
    }

    /// No-op once `key` holds a newer code than `hash`.
    pub fn withdraw(&self, key: &str, hash: &str) {
        self.pending.remove_if(key, |_, current| current.hash == hash);
    }

    /// Succeeds at most once per stored code.
    pub fn verify_and_consume(
        &self,
        key: &str,
        candidate: &str,
        hasher: &OtpHasher,
    ) -> Result<(), CodeRejection> {
        let pending = self
            .pending
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(CodeRejection::NotRequested)?;

        if self.clock.now() > pending.expires_at {
            self.pending
                .remove_if(key, |_, current| current.hash == pending.hash);
            return Err(CodeRejection::Expired);
        }

        if !hasher.verify(candidate, &pending.hash) {
            return Err(CodeRejection::Mismatch);
        }

        // a concurrent redeemer may have consumed it while we were hashing
        self.pending
            .remove_if(key, |_, current| current.hash == pending.hash)
            .map(|_| ())
            .ok_or(CodeRejection::NotRequested)
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> OtpHasher {
    OtpHasher::new(8, 1).expect("minimal argon2 params are valid")
}
