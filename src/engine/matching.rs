use std::collections::HashSet;
use std::time::Instant;

use tracing::info;
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::engine::ranking::{self, MAX_REQUESTS, MAX_TRAVELERS_PER_REQUEST};
use crate::engine::requests::get_request;
use crate::error::AppError;
use crate::models::matching::{Match, MatchStatus, RankedMatch};
use crate::models::request::{ParcelRequest, RequestStatus};
use crate::models::traveler::Traveler;
use crate::state::AppState;
use crate::store::{RequestFilter, RequestQuery};

async fn routable_travelers(state: &AppState) -> Result<Vec<Traveler>, AppError> {
    let profiles = state.store.list_travelers(MAX_TRAVELERS_PER_REQUEST).await?;
    Ok(profiles.iter().filter_map(|profile| profile.route()).collect())
}

fn timed_rank(state: &AppState, requests: &[ParcelRequest], travelers: &[Traveler]) -> Vec<RankedMatch> {
    let start = Instant::now();
    let ranked = ranking::rank(requests, travelers);
    state
        .metrics
        .match_ranking_seconds
        .observe(start.elapsed().as_secs_f64());
    state.metrics.matches_ranked_total.inc_by(ranked.len() as u64);
    ranked
}

pub async fn matches_for_request(
    state: &AppState,
    principal: &Principal,
    request_id: Uuid,
) -> Result<Vec<RankedMatch>, AppError> {
    let request = get_request(state, principal, request_id).await?;

    let cache_key = format!("matches_{}_{}", request_id, principal.id);
    if let Some(cached) = state.cached(&state.caches.matching, &cache_key) {
        return Ok(cached);
    }

    let travelers = routable_travelers(state).await?;
    let ranked = timed_rank(state, std::slice::from_ref(&request), &travelers);

    state.caches.matching.set(cache_key, ranked.clone());
    Ok(ranked)
}

/// Ranks every open request and records a PENDING match per new pair.
/// Pairs that already have a live (PENDING or ACCEPTED) match are skipped.
pub async fn create_matches(state: &AppState, principal: &Principal) -> Result<Vec<Match>, AppError> {
    principal.require_role(Role::Admin)?;

    let pending = state
        .store
        .find_requests(&RequestQuery {
            filter: RequestFilter {
                sender_id: None,
                status: Some(RequestStatus::Pending),
            },
            skip: 0,
            limit: MAX_REQUESTS,
        })
        .await?;
    let travelers = routable_travelers(state).await?;
    let ranked = timed_rank(state, &pending, &travelers);

    let mut live: HashSet<(Uuid, Uuid)> = HashSet::new();
    for request_id in ranked.iter().map(|m| m.request_id).collect::<HashSet<_>>() {
        live.extend(
            state
                .store
                .matches_for_request(request_id)
                .await?
                .into_iter()
                .filter(|m| matches!(m.status, MatchStatus::Pending | MatchStatus::Accepted))
                .map(|m| (m.request_id, m.traveler_id)),
        );
    }

    let now = state.clock.now();
    let fresh: Vec<Match> = ranked
        .iter()
        .filter(|candidate| !live.contains(&(candidate.request_id, candidate.traveler_id)))
        .map(|candidate| Match {
            id: Uuid::new_v4(),
            request_id: candidate.request_id,
            traveler_id: candidate.traveler_id,
            detour_km: candidate.detour_km,
            fare_offered: None,
            status: MatchStatus::Pending,
            created_at: now,
            updated_at: now,
        })
        .collect();

    let skipped = ranked.len() - fresh.len();
    let created = if fresh.is_empty() {
        Vec::new()
    } else {
        state.store.insert_matches(fresh).await?
    };
    state.caches.matching.clear();

    info!(
        requests = pending.len(),
        travelers = travelers.len(),
        created = created.len(),
        skipped,
        "batch matching finished"
    );
    Ok(created)
}
