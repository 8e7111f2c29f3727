pub mod relay;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::delivery::DeliveryStatus;

pub type ConnectionId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RoomEvent {
    LocationUpdate {
        delivery_id: Uuid,
        lat: f64,
        lng: f64,
        timestamp: DateTime<Utc>,
    },
    DeliveryStatusUpdate {
        delivery_id: Uuid,
        status: DeliveryStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientEvent {
    Join { delivery_id: Uuid },
    Position { delivery_id: Uuid, lat: f64, lng: f64 },
}

pub struct LocationBroadcaster {
    connections: DashMap<ConnectionId, mpsc::Sender<RoomEvent>>,
    rooms: DashMap<Uuid, HashSet<ConnectionId>>,
    buffer: usize,
}

impl LocationBroadcaster {
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            buffer: buffer.max(1),
        }
    }

    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<RoomEvent>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        self.connections.insert(id, tx);
        (id, rx)
    }

    /// Returns false for a connection that is not (or no longer) registered.
    pub fn join(&self, connection: ConnectionId, delivery_id: Uuid) -> bool {
        if !self.connections.contains_key(&connection) {
            return false;
        }
        self.rooms.entry(delivery_id).or_default().insert(connection);
        debug!(connection = %connection, delivery_id = %delivery_id, "joined room");
        true
    }

    pub fn disconnect(&self, connection: ConnectionId) {
        self.connections.remove(&connection);
        for mut room in self.rooms.iter_mut() {
            room.value_mut().remove(&connection);
        }
        self.rooms.retain(|_, members| !members.is_empty());
    }

    /// Server-originated: every member receives the event.
    pub fn publish(&self, delivery_id: Uuid, event: RoomEvent) -> usize {
        self.fan_out(delivery_id, None, event)
    }

    /// Member-originated: the sending connection gets no echo.
    pub fn publish_from(&self, origin: ConnectionId, delivery_id: Uuid, event: RoomEvent) -> usize {
        self.fan_out(delivery_id, Some(origin), event)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn rooms_info(&self) -> HashMap<Uuid, usize> {
        self.rooms
            .iter()
            .map(|room| (*room.key(), room.value().len()))
            .collect()
    }

    fn fan_out(&self, delivery_id: Uuid, skip: Option<ConnectionId>, event: RoomEvent) -> usize {
        let members: Vec<ConnectionId> = match self.rooms.get(&delivery_id) {
            Some(members) => members.iter().copied().collect(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut closed = Vec::new();

        for member in members.into_iter().filter(|member| Some(*member) != skip) {
            let Some(tx) = self.connections.get(&member).map(|entry| entry.value().clone()) else {
                continue;
            };

            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(connection = %member, delivery_id = %delivery_id, "subscriber queue full; frame dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(member),
            }
        }

        for member in closed {
            self.disconnect(member);
        }

        delivered
    }
}
