use std::sync::Arc;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::clock::ManualClock;
use crate::config::Config;
use crate::notify::LogNotifier;
use crate::state::AppState;
use crate::store::MemoryStore;

pub fn test_config() -> Config {
    Config {
        otp_hash_memory_kib: 8,
        otp_hash_iterations: 1,
        ..Config::default()
    }
}

pub fn test_state() -> (AppState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()));
    let state = AppState::new(
        &test_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(LogNotifier),
        clock.clone(),
    )
    .unwrap();
    (state, clock)
}

pub fn sender(n: u128) -> Principal {
    Principal { id: Uuid::from_u128(n), role: Role::User }
}

pub fn traveler_principal(n: u128) -> Principal {
    Principal { id: Uuid::from_u128(n), role: Role::Traveler }
}

pub fn admin(n: u128) -> Principal {
    Principal { id: Uuid::from_u128(n), role: Role::Admin }
}
