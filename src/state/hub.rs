//! Room fan-out.
//!
//! The hub owns each connection's outbound queue and the subscriber set of
//! every session room. Sends use `try_send`: a slow client loses the event
//! rather than stalling the handler that produced it.

use super::conn::ConnId;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use stormer_proto::ServerEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Queue of events waiting to be written to one connection.
pub type Outbound = mpsc::Sender<Arc<ServerEvent>>;

#[derive(Default)]
pub struct Hub {
    senders: DashMap<ConnId, Outbound>,
    rooms: DashMap<String, HashSet<ConnId>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conn: &str, tx: Outbound) {
        self.senders.insert(conn.to_string(), tx);
    }

    pub fn unregister(&self, conn: &str) {
        self.senders.remove(conn);
    }

    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }

    /// Add a connection to a room's subscriber set.
    pub fn subscribe(&self, code: &str, conn: &str) {
        self.rooms
            .entry(code.to_string())
            .or_default()
            .insert(conn.to_string());
    }

    /// Remove a connection from a room, dropping the room once empty.
    pub fn unsubscribe(&self, code: &str, conn: &str) {
        self.rooms.remove_if_mut(code, |_, members| {
            members.remove(conn);
            members.is_empty()
        });
    }

    /// Drop a room entirely, returning whoever was subscribed.
    pub fn close_room(&self, code: &str) -> Vec<ConnId> {
        self.rooms
            .remove(code)
            .map(|(_, members)| members.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn members(&self, code: &str) -> Vec<ConnId> {
        self.rooms
            .get(code)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Send to one connection. Returns false if the event was not queued.
    pub fn unicast(&self, conn: &str, event: ServerEvent) -> bool {
        self.deliver(conn, &Arc::new(event))
    }

    /// Send to every subscriber of `code` except `exclude`.
    ///
    /// Returns how many connections the event was queued for.
    pub fn broadcast(&self, code: &str, event: ServerEvent, exclude: Option<&str>) -> usize {
        let event = Arc::new(event);
        // Snapshot first so no room guard is held while touching senders.
        let members = self.members(code);
        let delivered = members
            .iter()
            .filter(|conn| Some(conn.as_str()) != exclude)
            .filter(|conn| self.deliver(conn, &event))
            .count();
        crate::metrics::record_fanout(delivered);
        delivered
    }

    fn deliver(&self, conn: &str, event: &Arc<ServerEvent>) -> bool {
        let Some(tx) = self.senders.get(conn).map(|r| r.value().clone()) else {
            debug!(conn = %conn, event = event.name(), "No sender for connection");
            return false;
        };
        match tx.try_send(Arc::clone(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                crate::metrics::record_dropped();
                warn!(conn = %conn, event = event.name(), "Outbound queue full, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn = %conn, event = event.name(), "Connection closed before delivery");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stormer_proto::Roster;

    fn connect(hub: &Hub, conn: &str, cap: usize) -> mpsc::Receiver<Arc<ServerEvent>> {
        let (tx, rx) = mpsc::channel(cap);
        hub.register(conn, tx);
        rx
    }

    fn roster() -> ServerEvent {
        ServerEvent::UserJoined(Roster {
            users: vec!["alice".into()],
        })
    }

    #[test]
    fn broadcast_respects_exclude() {
        let hub = Hub::new();
        let mut a = connect(&hub, "a", 4);
        let mut b = connect(&hub, "b", 4);
        hub.subscribe("ROOM01", "a");
        hub.subscribe("ROOM01", "b");

        assert_eq!(hub.broadcast("ROOM01", roster(), Some("a")), 1);
        assert!(a.try_recv().is_err());
        assert_eq!(*b.try_recv().unwrap(), roster());

        assert_eq!(hub.broadcast("ROOM01", roster(), None), 2);
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn rooms_are_isolated() {
        let hub = Hub::new();
        let mut a = connect(&hub, "a", 4);
        let _b = connect(&hub, "b", 4);
        hub.subscribe("ROOM01", "a");
        hub.subscribe("ROOM02", "b");

        hub.broadcast("ROOM02", roster(), None);
        assert!(a.try_recv().is_err());
    }

    #[test]
    fn full_queue_drops_without_blocking_others() {
        let hub = Hub::new();
        let _slow = connect(&hub, "slow", 1);
        let mut fast = connect(&hub, "fast", 8);
        hub.subscribe("ROOM01", "slow");
        hub.subscribe("ROOM01", "fast");

        assert_eq!(hub.broadcast("ROOM01", roster(), None), 2);
        assert_eq!(hub.broadcast("ROOM01", roster(), None), 1);
        assert!(fast.try_recv().is_ok());
        assert!(fast.try_recv().is_ok());
    }

    #[test]
    fn unsubscribe_drops_empty_rooms() {
        let hub = Hub::new();
        hub.subscribe("ROOM01", "a");
        hub.subscribe("ROOM01", "b");
        hub.unsubscribe("ROOM01", "a");
        assert_eq!(hub.members("ROOM01"), vec!["b".to_string()]);
        hub.unsubscribe("ROOM01", "b");
        assert_eq!(hub.room_count(), 0);
        // Unknown room is a no-op.
        hub.unsubscribe("ROOM99", "a");
    }

    #[test]
    fn close_room_returns_members() {
        let hub = Hub::new();
        hub.subscribe("ROOM01", "a");
        hub.subscribe("ROOM01", "b");
        let mut members = hub.close_room("ROOM01");
        members.sort();
        assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
        assert!(hub.close_room("ROOM01").is_empty());
    }

    #[test]
    fn unicast_to_unknown_connection_fails_quietly() {
        let hub = Hub::new();
        assert!(!hub.unicast("ghost", roster()));
        let mut a = connect(&hub, "a", 1);
        assert!(hub.unicast("a", roster()));
        assert!(a.try_recv().is_ok());
        hub.unregister("a");
        assert!(!hub.unicast("a", roster()));
    }
}
