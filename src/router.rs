//! Room-keyed fan-out: maps each (group, channel) to the event sinks of the
//! sessions currently subscribed to it.
//!
//! Each room carries its own member lock, so joins and broadcasts in
//! unrelated rooms never contend. Delivery is best-effort per recipient: a
//! sink whose receiver is gone is skipped, never blocking the rest of the
//! room, and the dead session is reaped on disconnect.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use crate::gateway::protocol::ServerEvent;
use crate::presence::SessionId;
use crate::room::RoomKey;

/// Outbound event queue of one connection. Unbounded so a slow consumer
/// never stalls fan-out; the socket writer task drains it.
pub type EventSink = mpsc::UnboundedSender<ServerEvent>;

#[derive(Default)]
struct Room {
    members: RwLock<HashMap<SessionId, EventSink>>,
}

#[derive(Default)]
pub struct RoomRouter {
    rooms: RwLock<HashMap<RoomKey, Arc<Room>>>,
}

impl RoomRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, session: SessionId, key: &RoomKey, sink: EventSink) {
        // The member insert happens under the map lock, so a concurrent
        // unsubscribe that sees the room empty cannot drop it between our
        // lookup and the insert, stranding this session in an orphaned room.
        let mut rooms = self.rooms.write().unwrap();
        let room = Arc::clone(rooms.entry(key.clone()).or_default());
        room.members.write().unwrap().insert(session, sink);
    }

    pub fn unsubscribe(&self, session: SessionId, key: &RoomKey) {
        let Some(room) = self.rooms.read().unwrap().get(key).cloned() else {
            return;
        };
        let emptied = {
            let mut members = room.members.write().unwrap();
            members.remove(&session);
            members.is_empty()
        };
        if emptied {
            let mut rooms = self.rooms.write().unwrap();
            // Re-check under the map lock; someone may have joined meanwhile.
            if let Some(room) = rooms.get(key) {
                if room.members.read().unwrap().is_empty() {
                    rooms.remove(key);
                }
            }
        }
    }

    /// Delivers `event` to every subscribed session, including the sender.
    pub fn broadcast(&self, key: &RoomKey, event: ServerEvent) {
        let Some(room) = self.rooms.read().unwrap().get(key).cloned() else {
            return;
        };
        let sinks: Vec<(SessionId, EventSink)> = room
            .members
            .read()
            .unwrap()
            .iter()
            .map(|(id, sink)| (*id, sink.clone()))
            .collect();
        for (id, sink) in sinks {
            if sink.send(event.clone()).is_err() {
                tracing::debug!(session = %id, room = %key, "dropping event for closed session");
            }
        }
    }

    pub fn occupancy(&self, key: &RoomKey) -> usize {
        self.rooms
            .read()
            .unwrap()
            .get(key)
            .map(|room| room.members.read().unwrap().len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::protocol::PresenceKind;
    use uuid::Uuid;

    fn key() -> RoomKey {
        RoomKey::new("g1", "general").unwrap()
    }

    fn probe() -> ServerEvent {
        ServerEvent::Presence {
            kind: PresenceKind::Joined,
            username: "alice".into(),
            channel: "general".into(),
            text: "alice joined general".into(),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member() {
        let router = RoomRouter::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        router.subscribe(Uuid::now_v7(), &key(), tx_a);
        router.subscribe(Uuid::now_v7(), &key(), tx_b);

        router.broadcast(&key(), probe());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn closed_sink_does_not_block_others() {
        let router = RoomRouter::new();
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        router.subscribe(Uuid::now_v7(), &key(), tx_a);
        router.subscribe(Uuid::now_v7(), &key(), tx_b);
        drop(rx_a);

        router.broadcast(&key(), probe());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn concurrent_churn_never_strands_a_subscriber() {
        // A join racing the last member's unsubscribe must end up in the
        // live room entry, not one reaped off the map mid-insert.
        let router = Arc::new(RoomRouter::new());
        for _ in 0..2000 {
            let leaving = Uuid::now_v7();
            let joining = Uuid::now_v7();
            let (tx_old, _rx_old) = mpsc::unbounded_channel();
            router.subscribe(leaving, &key(), tx_old);

            let (tx_new, mut rx_new) = mpsc::unbounded_channel();
            let unsub = {
                let router = Arc::clone(&router);
                std::thread::spawn(move || router.unsubscribe(leaving, &key()))
            };
            let sub = {
                let router = Arc::clone(&router);
                std::thread::spawn(move || router.subscribe(joining, &key(), tx_new))
            };
            unsub.join().unwrap();
            sub.join().unwrap();

            router.broadcast(&key(), probe());
            assert!(rx_new.try_recv().is_ok(), "subscriber missed broadcast");
            router.unsubscribe(joining, &key());
        }
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery_and_reaps_empty_rooms() {
        let router = RoomRouter::new();
        let session = Uuid::now_v7();
        let (tx, mut rx) = mpsc::unbounded_channel();
        router.subscribe(session, &key(), tx);
        assert_eq!(router.occupancy(&key()), 1);

        router.unsubscribe(session, &key());
        assert_eq!(router.occupancy(&key()), 0);
        router.broadcast(&key(), probe());
        assert!(rx.try_recv().is_err());
    }
}
