pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::location::LocationPing;
use crate::models::matching::{Match, MatchStatus};
use crate::models::request::{ParcelRequest, RequestStatus};
use crate::models::traveler::TravelerProfile;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{record} is {actual}, expected {expected}")]
    StatusMismatch {
        record: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestFilter {
    pub sender_id: Option<Uuid>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn matches(&self, request: &ParcelRequest) -> bool {
        self.sender_id.is_none_or(|sender| sender == request.sender_id)
            && self.status.is_none_or(|status| status == request.status)
    }
}

#[derive(Debug, Clone)]
pub struct RequestQuery {
    pub filter: RequestFilter,
    pub skip: usize,
    pub limit: usize,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_request(&self, request: ParcelRequest) -> Result<ParcelRequest, StoreError>;
    async fn get_request(&self, id: Uuid) -> Result<Option<ParcelRequest>, StoreError>;
    async fn find_requests(&self, query: &RequestQuery) -> Result<Vec<ParcelRequest>, StoreError>;
    async fn count_requests(&self, filter: &RequestFilter) -> Result<u64, StoreError>;
    async fn compare_and_set_request(
        &self,
        expected: RequestStatus,
        updated: ParcelRequest,
    ) -> Result<ParcelRequest, StoreError>;

    async fn insert_matches(&self, matches: Vec<Match>) -> Result<Vec<Match>, StoreError>;
    async fn get_match(&self, id: Uuid) -> Result<Option<Match>, StoreError>;
    async fn matches_for_request(&self, request_id: Uuid) -> Result<Vec<Match>, StoreError>;
    async fn compare_and_set_match(
        &self,
        expected: MatchStatus,
        updated: Match,
    ) -> Result<Match, StoreError>;

    async fn insert_delivery(&self, delivery: Delivery) -> Result<Delivery, StoreError>;
    async fn get_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError>;
    async fn compare_and_set_delivery(
        &self,
        expected: DeliveryStatus,
        updated: Delivery,
    ) -> Result<Delivery, StoreError>;

    async fn upsert_traveler(&self, profile: TravelerProfile) -> Result<TravelerProfile, StoreError>;
    /// Most recently updated first.
    async fn list_travelers(&self, limit: usize) -> Result<Vec<TravelerProfile>, StoreError>;

    async fn insert_location(&self, ping: LocationPing) -> Result<LocationPing, StoreError>;
    async fn locations_for_delivery(&self, delivery_id: Uuid) -> Result<Vec<LocationPing>, StoreError>;
}
