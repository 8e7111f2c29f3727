use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::location::LocationPing;
use crate::models::matching::{Match, MatchStatus};
use crate::models::request::{ParcelRequest, RequestStatus};
use crate::models::traveler::TravelerProfile;
use crate::store::{RequestFilter, RequestQuery, Store, StoreError};

// compare_and_set_* hold the shard lock across the check and the write.
#[derive(Default)]
pub struct MemoryStore {
    requests: DashMap<Uuid, ParcelRequest>,
    matches: DashMap<Uuid, Match>,
    deliveries: DashMap<Uuid, Delivery>,
    travelers: DashMap<Uuid, TravelerProfile>,
    locations: DashMap<Uuid, LocationPing>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_request(&self, request: ParcelRequest) -> Result<ParcelRequest, StoreError> {
        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<ParcelRequest>, StoreError> {
        Ok(self.requests.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_requests(&self, query: &RequestQuery) -> Result<Vec<ParcelRequest>, StoreError> {
        let mut found: Vec<ParcelRequest> = self
            .requests
            .iter()
            .filter(|entry| query.filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(found.into_iter().skip(query.skip).take(query.limit).collect())
    }

    async fn count_requests(&self, filter: &RequestFilter) -> Result<u64, StoreError> {
        let count = self
            .requests
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count();
        Ok(count as u64)
    }

    async fn compare_and_set_request(
        &self,
        expected: RequestStatus,
        updated: ParcelRequest,
    ) -> Result<ParcelRequest, StoreError> {
        let mut current = self
            .requests
            .get_mut(&updated.id)
            .ok_or_else(|| StoreError::NotFound(format!("request {}", updated.id)))?;

        if current.status != expected {
            return Err(StoreError::StatusMismatch {
                record: format!("request {}", updated.id),
                expected: expected.as_str(),
                actual: current.status.as_str(),
            });
        }

        *current = updated.clone();
        Ok(updated)
    }

    async fn insert_matches(&self, matches: Vec<Match>) -> Result<Vec<Match>, StoreError> {
        for candidate in &matches {
            self.matches.insert(candidate.id, candidate.clone());
        }
        Ok(matches)
    }

    async fn get_match(&self, id: Uuid) -> Result<Option<Match>, StoreError> {
        Ok(self.matches.get(&id).map(|entry| entry.value().clone()))
    }

    async fn matches_for_request(&self, request_id: Uuid) -> Result<Vec<Match>, StoreError> {
        let mut found: Vec<Match> = self
            .matches
            .iter()
            .filter(|entry| entry.value().request_id == request_id)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn compare_and_set_match(
        &self,
        expected: MatchStatus,
        updated: Match,
    ) -> Result<Match, StoreError> {
        let mut current = self
            .matches
            .get_mut(&updated.id)
            .ok_or_else(|| StoreError::NotFound(format!("match {}", updated.id)))?;

        if current.status != expected {
            return Err(StoreError::StatusMismatch {
                record: format!("match {}", updated.id),
                expected: expected.as_str(),
                actual: current.status.as_str(),
            });
        }

        *current = updated.clone();
        Ok(updated)
    }

    async fn insert_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError> {
        self.deliveries.insert(delivery.id, delivery.clone());
        Ok(delivery)
    }

    async fn get_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        Ok(self.deliveries.get(&id).map(|entry| entry.value().clone()))
    }

    async fn compare_and_set_delivery(
        &self,
        expected: DeliveryStatus,
        updated: Delivery,
    ) -> Result<Delivery, StoreError> {
        let mut current = self
            .deliveries
            .get_mut(&updated.id)
            .ok_or_else(|| StoreError::NotFound(format!("delivery {}", updated.id)))?;

        if current.status != expected {
            return Err(StoreError::StatusMismatch {
                record: format!("delivery {}", updated.id),
                expected: expected.as_str(),
                actual: current.status.as_str(),
            });
        }

        *current = updated.clone();
        Ok(updated)
    }

    async fn upsert_traveler(&self, profile: TravelerProfile) -> Result<TravelerProfile, StoreError> {
        self.travelers.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn list_travelers(&self, limit: usize) -> Result<Vec<TravelerProfile>, StoreError> {
        let mut found: Vec<TravelerProfile> = self
            .travelers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        found.truncate(limit);
        Ok(found)
    }

    async fn insert_location(&self, ping: LocationPing) -> Result<LocationPing, StoreError> {
        self.locations.insert(ping.id, ping.clone());
        Ok(ping)
    }

    async fn locations_for_delivery(&self, delivery_id: Uuid) -> Result<Vec<LocationPing>, StoreError> {
        let mut found: Vec<LocationPing> = self
            .locations
            .iter()
            .filter(|entry| entry.value().delivery_id == delivery_id)
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(found)
    }
}
