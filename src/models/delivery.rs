use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Accepted,
    PickedUp,
    Delivered,
}

impl DeliveryStatus {
    pub fn next(self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::Accepted => Some(DeliveryStatus::PickedUp),
            DeliveryStatus::PickedUp => Some(DeliveryStatus::Delivered),
            DeliveryStatus::Delivered => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Accepted => "ACCEPTED",
            DeliveryStatus::PickedUp => "PICKED_UP",
            DeliveryStatus::Delivered => "DELIVERED",
        }
    }
}

/// Execution of an accepted match. Each handoff code is stored only as a
/// salted hash and the hash is cleared once the code has been used.
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub id: Uuid,
    pub request_id: Uuid,
    pub match_id: Uuid,
    pub traveler_id: Uuid,
    #[serde(skip_serializing)]
    pub pickup_code_hash: Option<String>,
    #[serde(skip_serializing)]
    pub drop_code_hash: Option<String>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub drop_time: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
