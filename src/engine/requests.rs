use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::error::AppError;
use crate::models::location::GeoPoint;
use crate::models::page::{Page, PageRequest};
use crate::models::request::{ParcelInfo, ParcelRequest, RequestStatus};
use crate::state::AppState;
use crate::store::{RequestFilter, RequestQuery};

#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub pickup: GeoPoint,
    pub drop: GeoPoint,
    pub parcel: ParcelInfo,
}

fn validate(input: &NewRequest) -> Result<(), AppError> {
    if !input.pickup.is_valid() || !input.drop.is_valid() {
        return Err(AppError::Validation("invalid coordinates".to_string()));
    }

    let parcel = &input.parcel;
    if !parcel.weight.is_finite() || parcel.weight <= 0.0 {
        return Err(AppError::Validation("weight must be a positive number".to_string()));
    }
    if parcel.description.trim().is_empty() {
        return Err(AppError::Validation("description cannot be empty".to_string()));
    }
    if let Some(dimensions) = &parcel.dimensions {
        let sides = [dimensions.length, dimensions.width, dimensions.height];
        if sides.iter().flatten().any(|side| !side.is_finite() || *side < 0.0) {
            return Err(AppError::Validation("dimensions must be non-negative numbers".to_string()));
        }
    }

    Ok(())
}

pub async fn create_request(
    state: &AppState,
    principal: &Principal,
    input: NewRequest,
) -> Result<ParcelRequest, AppError> {
    principal.require_role(Role::User)?;
    validate(&input)?;

    let now = state.clock.now();
    let request = ParcelRequest {
        id: Uuid::new_v4(),
        sender_id: principal.id,
        pickup: input.pickup,
        drop: input.drop,
        parcel: input.parcel,
        status: RequestStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    let request = state.store.insert_request(request).await?;
    state.caches.invalidate_request_views();

    info!(request_id = %request.id, sender_id = %request.sender_id, "parcel request created");
    Ok(request)
}

pub async fn get_request(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
) -> Result<ParcelRequest, AppError> {
    let request = state
        .store
        .get_request(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

    principal.require_self(request.sender_id, "request")?;
    Ok(request)
}

pub async fn search_requests(
    state: &AppState,
    principal: &Principal,
    status: Option<RequestStatus>,
    page: PageRequest,
) -> Result<Page<ParcelRequest>, AppError> {
    let status_key = status.map(RequestStatus::as_str).unwrap_or("all");
    let cache_key = format!("requests_{}_{}_{}_{}", principal.id, status_key, page.page, page.limit);
    if let Some(cached) = state.cached(&state.caches.search, &cache_key) {
        return Ok(cached);
    }

    let filter = RequestFilter {
        sender_id: Some(principal.id),
        status,
    };
    let result = load_page(state, filter, page).await?;

    state.caches.search.set(cache_key, result.clone());
    Ok(result)
}

pub async fn feed(
    state: &AppState,
    principal: &Principal,
    page: PageRequest,
) -> Result<Page<ParcelRequest>, AppError> {
    if principal.role == Role::User {
        return Err(AppError::Forbidden("feed is for travelers".to_string()));
    }

    let cache_key = format!("feed_{}_{}", page.page, page.limit);
    if let Some(cached) = state.cached(&state.caches.feed, &cache_key) {
        return Ok(cached);
    }

    let filter = RequestFilter {
        sender_id: None,
        status: Some(RequestStatus::Pending),
    };
    let result = load_page(state, filter, page).await?;

    state.caches.feed.set(cache_key, result.clone());
    Ok(result)
}

async fn load_page(
    state: &AppState,
    filter: RequestFilter,
    page: PageRequest,
) -> Result<Page<ParcelRequest>, AppError> {
    let total = state.store.count_requests(&filter).await?;
    let items = state
        .store
        .find_requests(&RequestQuery {
            filter,
            skip: page.skip(),
            limit: page.limit,
        })
        .await?;

    Ok(Page::new(items, page, total))
}

/// Sender-only. Legal from any non-terminal status.
pub async fn cancel_request(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
) -> Result<ParcelRequest, AppError> {
    let request = get_request(state, principal, id).await?;

    if !request.status.can_transition_to(RequestStatus::Cancelled) {
        state.record_transition("request", false);
        return Err(AppError::Conflict(format!(
            "request {id} is already {}",
            request.status.as_str()
        )));
    }

    let expected = request.status;
    let mut cancelled = request;
    cancelled.status = RequestStatus::Cancelled;
    cancelled.updated_at = state.clock.now();

    let cancelled = state
        .store
        .compare_and_set_request(expected, cancelled)
        .await
        .inspect_err(|_| state.record_transition("request", false))?;

    state.caches.invalidate_request_views();
    state.record_transition("request", true);
    info!(request_id = %id, "parcel request cancelled");
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::engine::testkit::{sender, test_state, traveler_principal};
    use crate::models::request::Dimensions;

    fn new_request() -> NewRequest {
        NewRequest {
            pickup: GeoPoint { lat: 12.90, lng: 77.58 },
            drop: GeoPoint { lat: 12.95, lng: 77.60 },
            parcel: ParcelInfo {
                weight: 1.5,
                dimensions: Some(Dimensions {
                    length: Some(30.0),
                    width: Some(20.0),
                    height: None,
                }),
                description: "laptop".to_string(),
                fragile: true,
            },
        }
    }

    #[tokio::test]
    async fn create_then_get_by_owner() {
        let (state, _clock) = test_state();
        let owner = sender(1);

        let created = create_request(&state, &owner, new_request()).await.unwrap();
        assert_eq!(created.status, RequestStatus::Pending);
        assert_eq!(created.sender_id, owner.id);

        let fetched = get_request(&state, &owner, created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn other_sender_cannot_read() {
        let (state, _clock) = test_state();
        let created = create_request(&state, &sender(1), new_request()).await.unwrap();

        let err = get_request(&state, &sender(2), created.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let (state, _clock) = test_state();
        let err = get_request(&state, &sender(1), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_bad_input_before_storing() {
        let (state, _clock) = test_state();
        let owner = sender(1);

        let mut nan_pickup = new_request();
        nan_pickup.pickup.lat = f64::NAN;
        let mut heavy_nothing = new_request();
        heavy_nothing.parcel.weight = 0.0;
        let mut blank = new_request();
        blank.parcel.description = "   ".to_string();

        for input in [nan_pickup, heavy_nothing, blank] {
            let err = create_request(&state, &owner, input).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let page = search_requests(&state, &owner, None, PageRequest::new(None, None))
            .await
            .unwrap();
        assert_eq!(page.pagination.total_records, 0);
    }

    #[tokio::test]
    async fn travelers_cannot_submit_requests() {
        let (state, _clock) = test_state();
        let err = create_request(&state, &traveler_principal(9), new_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn search_is_cached_until_a_write() {
        let (state, _clock) = test_state();
        let owner = sender(1);
        create_request(&state, &owner, new_request()).await.unwrap();

        let first = search_requests(&state, &owner, None, PageRequest::new(None, None))
            .await
            .unwrap();
        assert_eq!(first.items.len(), 1);
        assert_eq!(state.caches.search.len(), 1);

        create_request(&state, &owner, new_request()).await.unwrap();
        assert!(state.caches.search.is_empty());

        let second = search_requests(&state, &owner, None, PageRequest::new(None, None))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);
    }

    #[tokio::test]
    async fn feed_lists_only_pending_for_travelers() {
        let (state, _clock) = test_state();
        let owner = sender(1);
        let keep = create_request(&state, &owner, new_request()).await.unwrap();
        let gone = create_request(&state, &owner, new_request()).await.unwrap();
        cancel_request(&state, &owner, gone.id).await.unwrap();

        let page = feed(&state, &traveler_principal(5), PageRequest::new(None, None))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, keep.id);

        let err = feed(&state, &owner, PageRequest::new(None, None)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn cancelled_request_cannot_be_cancelled_again() {
        let (state, _clock) = test_state();
        let owner = sender(1);
        let created = create_request(&state, &owner, new_request()).await.unwrap();

        let cancelled = cancel_request(&state, &owner, created.id).await.unwrap();
        assert_eq!(cancelled.status, RequestStatus::Cancelled);

        let err = cancel_request(&state, &owner, created.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
