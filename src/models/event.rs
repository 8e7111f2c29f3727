use uuid::Uuid;

use crate::models::delivery::DeliveryStatus;
use crate::models::location::LocationPing;

/// What the core announces after a committed change. Transports subscribe
/// to these; the core never talks to sockets.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    Position(LocationPing),
    DeliveryStatus {
        delivery_id: Uuid,
        status: DeliveryStatus,
    },
}
