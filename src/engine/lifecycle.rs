// Every status write is a compare-and-set on the prior status. When a later
// write in the same transition fails the earlier ones are put back.

use std::fmt;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{Principal, Role};
use crate::engine::otp;
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::event::DomainEvent;
use crate::models::matching::{Match, MatchStatus};
use crate::models::request::{ParcelRequest, RequestStatus};
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Serialize)]
pub struct AcceptedMatch {
    pub delivery: Delivery,
    pub pickup_code: String,
    pub drop_code: String,
}

impl fmt::Debug for AcceptedMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptedMatch")
            .field("delivery", &self.delivery)
            .field("pickup_code", &"<redacted>")
            .field("drop_code", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handoff {
    Pickup,
    Drop,
}

impl Handoff {
    fn label(self) -> &'static str {
        match self {
            Handoff::Pickup => "pickup",
            Handoff::Drop => "drop",
        }
    }

    fn target(self) -> DeliveryStatus {
        match self {
            Handoff::Pickup => DeliveryStatus::PickedUp,
            Handoff::Drop => DeliveryStatus::Delivered,
        }
    }
}

fn rejected(state: &AppState, entity: &str, err: StoreError) -> AppError {
    state.record_transition(entity, false);
    err.into()
}

fn conflict(state: &AppState, entity: &str, message: String) -> AppError {
    state.record_transition(entity, false);
    AppError::Conflict(message)
}

pub async fn accept_match(
    state: &AppState,
    principal: &Principal,
    match_id: Uuid,
    fare: f64,
) -> Result<AcceptedMatch, AppError> {
    if !fare.is_finite() || fare <= 0.0 {
        return Err(AppError::Validation("fare must be a positive number".to_string()));
    }
    principal.require_role(Role::Traveler)?;

    let candidate = state
        .store
        .get_match(match_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("match {match_id} not found")))?;
    principal.require_self(candidate.traveler_id, "match")?;

    if candidate.status != MatchStatus::Pending {
        return Err(conflict(
            state,
            "match",
            format!("match {match_id} is already {}", candidate.status.as_str()),
        ));
    }

    let request = state
        .store
        .get_request(candidate.request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("request {} not found", candidate.request_id)))?;

    if request.status != RequestStatus::Pending {
        return Err(conflict(
            state,
            "match",
            format!("request {} is already {}", request.id, request.status.as_str()),
        ));
    }

    let pickup_code = otp::issue_code();
    let mut drop_code = otp::issue_code();
    while drop_code == pickup_code {
        drop_code = otp::issue_code();
    }
    let pickup_code_hash = state.otp_hasher.hash(&pickup_code)?;
    let drop_code_hash = state.otp_hasher.hash(&drop_code)?;

    let now = state.clock.now();

    let mut matched = request.clone();
    matched.status = RequestStatus::Matched;
    matched.updated_at = now;
    let matched = state
        .store
        .compare_and_set_request(RequestStatus::Pending, matched)
        .await
        .map_err(|err| rejected(state, "match", err))?;

    let mut accepted = candidate.clone();
    accepted.status = MatchStatus::Accepted;
    accepted.fare_offered = Some(fare);
    accepted.updated_at = now;
    let accepted = match state
        .store
        .compare_and_set_match(MatchStatus::Pending, accepted)
        .await
    {
        Ok(accepted) => accepted,
        Err(err) => {
            restore_request(state, matched.status, request).await;
            return Err(rejected(state, "match", err));
        }
    };

    let delivery = Delivery {
        id: Uuid::new_v4(),
        request_id: request.id,
        match_id: accepted.id,
        traveler_id: accepted.traveler_id,
        pickup_code_hash: Some(pickup_code_hash),
        drop_code_hash: Some(drop_code_hash),
        pickup_time: None,
        drop_time: None,
        status: DeliveryStatus::Accepted,
        created_at: now,
        updated_at: now,
    };
    let delivery = match state.store.insert_delivery(delivery).await {
        Ok(delivery) => delivery,
        Err(err) => {
            restore_match(state, accepted.status, candidate).await;
            restore_request(state, matched.status, request).await;
            return Err(rejected(state, "match", err));
        }
    };

    state.caches.invalidate_request_views();
    state.record_transition("match", true);
    state.emit(DomainEvent::DeliveryStatus {
        delivery_id: delivery.id,
        status: delivery.status,
    });

    info!(
        match_id = %match_id,
        request_id = %delivery.request_id,
        delivery_id = %delivery.id,
        traveler_id = %delivery.traveler_id,
        fare,
        "match accepted"
    );

    Ok(AcceptedMatch {
        delivery,
        pickup_code,
        drop_code,
    })
}

pub async fn verify_pickup(
    state: &AppState,
    principal: &Principal,
    delivery_id: Uuid,
    code: &str,
) -> Result<Delivery, AppError> {
    let delivery = check_handoff(state, principal, delivery_id, code, Handoff::Pickup).await?;

    let from = delivery.status;
    let mut picked_up = delivery;
    let now = state.clock.now();
    picked_up.status = Handoff::Pickup.target();
    picked_up.pickup_time = Some(now);
    picked_up.pickup_code_hash = None;
    picked_up.updated_at = now;

    let picked_up = state
        .store
        .compare_and_set_delivery(from, picked_up)
        .await
        .map_err(|err| rejected(state, "delivery", err))?;

    state.record_transition("delivery", true);
    state.emit(DomainEvent::DeliveryStatus {
        delivery_id,
        status: picked_up.status,
    });

    info!(delivery_id = %delivery_id, "parcel picked up");
    Ok(picked_up)
}

pub async fn verify_drop(
    state: &AppState,
    principal: &Principal,
    delivery_id: Uuid,
    code: &str,
) -> Result<Delivery, AppError> {
    let delivery = check_handoff(state, principal, delivery_id, code, Handoff::Drop).await?;

    let request = state
        .store
        .get_request(delivery.request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("request {} not found", delivery.request_id)))?;
    if request.status != RequestStatus::Matched {
        return Err(conflict(
            state,
            "delivery",
            format!("request {} is {}", request.id, request.status.as_str()),
        ));
    }

    let now = state.clock.now();
    let mut delivered = delivery.clone();
    delivered.status = Handoff::Drop.target();
    delivered.drop_time = Some(now);
    delivered.drop_code_hash = None;
    delivered.updated_at = now;

    let delivered = state
        .store
        .compare_and_set_delivery(delivery.status, delivered)
        .await
        .map_err(|err| rejected(state, "delivery", err))?;

    let mut completed = request;
    completed.status = RequestStatus::Delivered;
    completed.updated_at = now;
    if let Err(err) = state
        .store
        .compare_and_set_request(RequestStatus::Matched, completed)
        .await
    {
        restore_delivery(state, delivered.status, delivery).await;
        return Err(rejected(state, "delivery", err));
    }

    state.caches.invalidate_request_views();
    state.record_transition("delivery", true);
    state.emit(DomainEvent::DeliveryStatus {
        delivery_id,
        status: delivered.status,
    });

    info!(delivery_id = %delivery_id, request_id = %delivered.request_id, "parcel delivered");
    Ok(delivered)
}

async fn check_handoff(
    state: &AppState,
    principal: &Principal,
    delivery_id: Uuid,
    code: &str,
    handoff: Handoff,
) -> Result<Delivery, AppError> {
    if !otp::is_well_formed(code) {
        return Err(AppError::Validation(format!(
            "{} code must be {} digits",
            handoff.label(),
            otp::CODE_LEN
        )));
    }
    principal.require_role(Role::Traveler)?;

    let delivery = state
        .store
        .get_delivery(delivery_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;
    principal.require_self(delivery.traveler_id, "delivery")?;

    let target = handoff.target();
    if delivery.status.next() != Some(target) {
        return Err(conflict(
            state,
            "delivery",
            format!(
                "delivery {delivery_id} is {}, cannot move to {}",
                delivery.status.as_str(),
                target.as_str()
            ),
        ));
    }

    let hash = match handoff {
        Handoff::Pickup => delivery.pickup_code_hash.as_deref(),
        Handoff::Drop => delivery.drop_code_hash.as_deref(),
    }
    .ok_or_else(|| {
        conflict(
            state,
            "delivery",
            format!("{} code already used", handoff.label()),
        )
    })?;

    let verified = state.otp_hasher.verify(code, hash);
    state.record_otp_check(handoff.label(), verified);
    if !verified {
        warn!(delivery_id = %delivery_id, handoff = handoff.label(), "handoff code mismatch");
        return Err(AppError::Validation(format!("invalid {} code", handoff.label())));
    }

    Ok(delivery)
}

async fn restore_request(state: &AppState, current: RequestStatus, original: ParcelRequest) {
    let id = original.id;
    if let Err(err) = state.store.compare_and_set_request(current, original).await {
        error!(request_id = %id, error = %err, "failed to roll back request");
    }
}

async fn restore_match(state: &AppState, current: MatchStatus, original: Match) {
    let id = original.id;
    if let Err(err) = state.store.compare_and_set_match(current, original).await {
        error!(match_id = %id, error = %err, "failed to roll back match");
    }
}

async fn restore_delivery(state: &AppState, current: DeliveryStatus, original: Delivery) {
    let id = original.id;
    if let Err(err) = state.store.compare_and_set_delivery(current, original).await {
        error!(delivery_id = %id, error = %err, "failed to roll back delivery");
    }
}
