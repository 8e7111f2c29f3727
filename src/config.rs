use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub room_buffer_size: usize,
    pub feed_cache: CacheSettings,
    pub search_cache: CacheSettings,
    pub matching_cache: CacheSettings,
    pub tracking_cache: CacheSettings,
    pub login_otp_ttl_secs: i64,
    pub otp_requests_per_hour: usize,
    pub otp_hash_memory_kib: u32,
    pub otp_hash_iterations: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub ttl_ms: i64,
    pub capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            room_buffer_size: parse_or_default("ROOM_BUFFER_SIZE", 64)?,
            feed_cache: cache_settings("FEED", 30_000, 50)?,
            search_cache: cache_settings("SEARCH", 30_000, 100)?,
            matching_cache: cache_settings("MATCHING", 30_000, 50)?,
            tracking_cache: cache_settings("TRACKING", 5_000, 1_000)?,
            login_otp_ttl_secs: parse_or_default("LOGIN_OTP_TTL_SECS", 300)?,
            otp_requests_per_hour: parse_or_default("OTP_REQUESTS_PER_HOUR", 5)?,
            otp_hash_memory_kib: parse_or_default("OTP_HASH_MEMORY_KIB", 19_456)?,
            otp_hash_iterations: parse_or_default("OTP_HASH_ITERATIONS", 2)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            event_buffer_size: 1024,
            room_buffer_size: 64,
            feed_cache: CacheSettings { ttl_ms: 30_000, capacity: 50 },
            search_cache: CacheSettings { ttl_ms: 30_000, capacity: 100 },
            matching_cache: CacheSettings { ttl_ms: 30_000, capacity: 50 },
            tracking_cache: CacheSettings { ttl_ms: 5_000, capacity: 1_000 },
            login_otp_ttl_secs: 300,
            otp_requests_per_hour: 5,
            otp_hash_memory_kib: 19_456,
            otp_hash_iterations: 2,
        }
    }
}

fn cache_settings(family: &str, ttl_ms: i64, capacity: usize) -> Result<CacheSettings, AppError> {
    Ok(CacheSettings {
        ttl_ms: parse_or_default(&format!("{family}_CACHE_TTL_MS"), ttl_ms)?,
        capacity: parse_or_default(&format!("{family}_CACHE_CAPACITY"), capacity)?,
    })
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
