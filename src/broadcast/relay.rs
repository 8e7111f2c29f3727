use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::broadcast::{LocationBroadcaster, RoomEvent};
use crate::models::event::DomainEvent;

pub fn room_event(event: &DomainEvent) -> (uuid::Uuid, RoomEvent) {
    match event {
        DomainEvent::Position(ping) => (
            ping.delivery_id,
            RoomEvent::LocationUpdate {
                delivery_id: ping.delivery_id,
                lat: ping.position.lat,
                lng: ping.position.lng,
                timestamp: ping.timestamp,
            },
        ),
        DomainEvent::DeliveryStatus { delivery_id, status } => (
            *delivery_id,
            RoomEvent::DeliveryStatusUpdate {
                delivery_id: *delivery_id,
                status: *status,
            },
        ),
    }
}

/// Forwards committed domain events into delivery rooms until the core's
/// event channel closes.
pub async fn run_room_relay(
    broadcaster: Arc<LocationBroadcaster>,
    events_rx: broadcast::Receiver<DomainEvent>,
) {
    info!("room relay started");

    let mut events = BroadcastStream::new(events_rx);
    while let Some(result) = events.next().await {
        match result {
            Ok(event) => {
                let (room, frame) = room_event(&event);
                broadcaster.publish(room, frame);
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "room relay lagged; events dropped");
            }
        }
    }

    warn!("room relay stopped: event channel closed");
}
