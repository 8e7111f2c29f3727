use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Matched,
    Accepted,
    PickedUp,
    Delivered,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Delivered | RequestStatus::Cancelled)
    }

    /// Transitions the lifecycle drives on a request. `Accepted` and
    /// `PickedUp` are never entered: `Matched` stands in until drop-off.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        match (self, next) {
            (RequestStatus::Pending, RequestStatus::Matched) => true,
            (RequestStatus::Matched, RequestStatus::Delivered) => true,
            (current, RequestStatus::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Matched => "MATCHED",
            RequestStatus::Accepted => "ACCEPTED",
            RequestStatus::PickedUp => "PICKED_UP",
            RequestStatus::Delivered => "DELIVERED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dimensions {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParcelInfo {
    pub weight: f64,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    pub description: String,
    #[serde(default)]
    pub fragile: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub pickup: GeoPoint,
    pub drop: GeoPoint,
    pub parcel: ParcelInfo,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
