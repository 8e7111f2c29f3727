use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    pub fn is_valid(&self) -> bool {
        self.is_finite() && (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Audit copy of a position report for an in-flight delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPing {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub reporter_id: Uuid,
    pub position: GeoPoint,
    pub timestamp: DateTime<Utc>,
}
