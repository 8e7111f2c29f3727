use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::GeoPoint;

/// What a traveler has told us about their trip. Position arrives either as
/// a live `current_location` or as a declared `pickup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelerProfile {
    pub id: Uuid,
    pub current_location: Option<GeoPoint>,
    pub pickup: Option<GeoPoint>,
    pub destination: Option<GeoPoint>,
    pub updated_at: DateTime<Utc>,
}

/// A traveler route in the only shape the matching core accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Traveler {
    pub id: Uuid,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

impl TravelerProfile {
    /// Live location wins over the declared pickup. Profiles without a
    /// usable origin or destination yield `None`.
    pub fn route(&self) -> Option<Traveler> {
        let origin = self
            .current_location
            .filter(GeoPoint::is_valid)
            .or(self.pickup.filter(GeoPoint::is_valid))?;
        let destination = self.destination.filter(GeoPoint::is_valid)?;

        Some(Traveler {
            id: self.id,
            origin,
            destination,
        })
    }
}
