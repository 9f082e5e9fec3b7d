//! Per-board rooms: element store, presence and fan-out.

use std::sync::Arc;

use dashmap::DashMap;
use sketchsync_core::sync::{ClientMessage, Participant, ServerMessage};
use sketchsync_core::{Element, ElementId};
use tokio::sync::broadcast;

use crate::auth::Identity;
use crate::store::BoardStore;

/// Broadcast channel capacity per room.
pub const CHANNEL_CAPACITY: usize = 256;

/// Presence colors, assigned by the number of users already in the room.
pub const USER_COLORS: [&str; 8] = [
    "#F44336", "#2196F3", "#4CAF50", "#FF9800", "#9C27B0", "#00BCD4", "#E91E63", "#3F51B5",
];

/// A message fanned out to a room.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Sending user. `None` for server-originated messages, which reach everyone.
    pub from: Option<String>,
    pub message: ServerMessage,
}

impl Envelope {
    /// Whether `user_id` should receive this message.
    pub fn is_for(&self, user_id: &str) -> bool {
        self.from.as_deref() != Some(user_id)
    }
}

/// What a new connection needs to start relaying.
pub struct Joined {
    pub rx: broadcast::Receiver<Envelope>,
    pub user: Participant,
    pub elements: Vec<Element>,
}

/// Room state for a single board.
struct Room {
    tx: broadcast::Sender<Envelope>,
    /// In join order.
    users: Vec<Participant>,
    /// In z-order.
    elements: Vec<Element>,
}

impl Room {
    fn new(elements: Vec<Element>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            users: Vec::new(),
            elements,
        }
    }

    fn user(&self, user_id: &str) -> Option<&Participant> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    fn upsert(&mut self, element: Element) {
        match self.elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => *existing = element,
            None => self.elements.push(element),
        }
    }

    fn remove(&mut self, id: &ElementId) {
        self.elements.retain(|e| &e.id != id);
    }

    fn send(&self, envelope: Envelope) {
        // No receivers is not an error.
        let _ = self.tx.send(envelope);
    }
}

/// All live rooms, keyed by board id.
pub struct RoomManager {
    rooms: DashMap<String, Room>,
    store: Arc<dyn BoardStore>,
}

impl RoomManager {
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self {
            rooms: DashMap::new(),
            store,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn user_count(&self, board_id: &str) -> usize {
        self.rooms.get(board_id).map_or(0, |room| room.users.len())
    }

    pub fn elements(&self, board_id: &str) -> Vec<Element> {
        self.rooms.get(board_id).map(|room| room.elements.clone()).unwrap_or_default()
    }

    /// Add a user to a board's room, creating it from the store if needed.
    pub fn join(&self, board_id: &str, identity: &Identity) -> Joined {
        let mut room = self
            .rooms
            .entry(board_id.to_string())
            .or_insert_with(|| Room::new(self.store.load(board_id)));
        let user = Participant {
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
            color: USER_COLORS[room.users.len() % USER_COLORS.len()].to_string(),
        };
        room.users.push(user.clone());
        Joined {
            rx: room.tx.subscribe(),
            user,
            elements: room.elements.clone(),
        }
    }

    /// Tell everyone in the room, the new user included, who is present.
    pub fn announce_join(&self, board_id: &str, user: &Participant) {
        if let Some(room) = self.rooms.get(board_id) {
            room.send(Envelope {
                from: None,
                message: ServerMessage::Join {
                    user_id: Some(user.user_id.clone()),
                    username: Some(user.username.clone()),
                    users: room.users.clone(),
                },
            });
        }
    }

    /// Remove a user and tell the others. Returns the remaining users.
    ///
    /// The last user out saves the board and closes the room.
    pub fn leave(&self, board_id: &str, user_id: &str) -> Vec<Participant> {
        let remaining = match self.rooms.get_mut(board_id) {
            Some(mut room) => {
                room.users.retain(|u| u.user_id != user_id);
                if room.users.is_empty() {
                    self.store.save(board_id, &room.elements);
                } else {
                    room.send(Envelope {
                        from: Some(user_id.to_string()),
                        message: ServerMessage::Leave {
                            user_id: user_id.to_string(),
                            users: room.users.clone(),
                        },
                    });
                }
                room.users.clone()
            }
            None => return Vec::new(),
        };
        if remaining.is_empty() {
            self.rooms.remove_if(board_id, |_, room| room.users.is_empty());
            tracing::info!("Closed room {}", board_id);
        }
        remaining
    }

    /// Apply a client message to the room and relay the result to the others.
    ///
    /// The store update and the send share one lock, so every receiver sees
    /// messages in the order the store applied them. Returns what was relayed;
    /// `save_request` persists the board and relays nothing.
    pub fn apply(&self, board_id: &str, user_id: &str, message: ClientMessage) -> Option<ServerMessage> {
        let mut room = self.rooms.get_mut(board_id)?;
        let relay = match message {
            ClientMessage::SyncState { elements } => {
                room.elements = elements.clone();
                ServerMessage::SyncState { elements }
            }
            ClientMessage::ElementAdd { element } => {
                room.upsert(element.clone());
                ServerMessage::ElementAdd { element }
            }
            ClientMessage::ElementUpdate { element } => {
                room.upsert(element.clone());
                ServerMessage::ElementUpdate { element }
            }
            ClientMessage::ElementRemove { element_id } => {
                room.remove(&element_id);
                ServerMessage::ElementRemove { element_id }
            }
            ClientMessage::Cursor { x, y } => {
                let user = room.user(user_id)?;
                ServerMessage::Cursor {
                    user_id: user.user_id.clone(),
                    x,
                    y,
                    username: user.username.clone(),
                    color: user.color.clone(),
                }
            }
            ClientMessage::SaveRequest => {
                self.store.save(board_id, &room.elements);
                tracing::debug!("Save requested for board {} by {}", board_id, user_id);
                return None;
            }
        };
        room.send(Envelope {
            from: Some(user_id.to_string()),
            message: relay.clone(),
        });
        Some(relay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn identity(id: &str, name: &str) -> Identity {
        Identity {
            user_id: id.to_string(),
            username: name.to_string(),
        }
    }

    fn rect(id: &str, x: f64) -> Element {
        Element::with_id(id, "rect", x, 0.0).sized(10.0, 10.0)
    }

    fn manager() -> (RoomManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (RoomManager::new(store.clone()), store)
    }

    #[test]
    fn test_colors_cycle_by_user_count() {
        let (rooms, _) = manager();
        let colors: Vec<String> = (0..9)
            .map(|i| rooms.join("b1", &identity(&format!("u{i}"), "x")).user.color)
            .collect();
        assert_eq!(colors[0], "#F44336");
        assert_eq!(colors[1], "#2196F3");
        assert_eq!(colors[7], "#3F51B5");
        assert_eq!(colors[8], "#F44336");
    }

    #[test]
    fn test_upsert_and_remove() {
        let (rooms, _) = manager();
        rooms.join("b1", &identity("u1", "alice"));
        rooms.apply("b1", "u1", ClientMessage::ElementAdd { element: rect("a", 0.0) });
        rooms.apply("b1", "u1", ClientMessage::ElementAdd { element: rect("a", 5.0) });
        rooms.apply("b1", "u1", ClientMessage::ElementUpdate { element: rect("b", 1.0) });
        let elements = rooms.elements("b1");
        assert_eq!(elements.len(), 2);
        assert!((elements[0].x - 5.0).abs() < f64::EPSILON);

        rooms.apply("b1", "u1", ClientMessage::ElementRemove { element_id: "a".into() });
        assert_eq!(rooms.elements("b1").len(), 1);
    }

    #[test]
    fn test_sync_state_replaces_store() {
        let (rooms, _) = manager();
        rooms.join("b1", &identity("u1", "alice"));
        rooms.apply("b1", "u1", ClientMessage::ElementAdd { element: rect("a", 0.0) });
        rooms.apply("b1", "u1", ClientMessage::SyncState { elements: vec![rect("b", 0.0)] });
        let ids: Vec<String> = rooms.elements("b1").iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_cursor_is_enriched() {
        let (rooms, _) = manager();
        rooms.join("b1", &identity("u1", "alice"));
        let relayed = rooms.apply("b1", "u1", ClientMessage::Cursor { x: 1.0, y: 2.0 });
        assert_eq!(
            relayed,
            Some(ServerMessage::Cursor {
                user_id: "u1".into(),
                x: 1.0,
                y: 2.0,
                username: "alice".into(),
                color: "#F44336".into(),
            })
        );
        assert!(rooms.apply("b1", "ghost", ClientMessage::Cursor { x: 0.0, y: 0.0 }).is_none());
    }

    #[test]
    fn test_save_request_persists_without_relay() {
        let (rooms, store) = manager();
        rooms.join("b1", &identity("u1", "alice"));
        rooms.apply("b1", "u1", ClientMessage::ElementAdd { element: rect("a", 0.0) });
        assert!(rooms.apply("b1", "u1", ClientMessage::SaveRequest).is_none());
        assert_eq!(store.saved("b1").map(|e| e.len()), Some(1));
    }

    #[test]
    fn test_last_leave_saves_and_closes() {
        let (rooms, store) = manager();
        rooms.join("b1", &identity("u1", "alice"));
        rooms.join("b1", &identity("u2", "bob"));
        rooms.apply("b1", "u1", ClientMessage::ElementAdd { element: rect("a", 0.0) });

        let remaining = rooms.leave("b1", "u1");
        assert_eq!(remaining.len(), 1);
        assert_eq!(rooms.room_count(), 1);
        assert!(store.saved("b1").is_none());

        assert!(rooms.leave("b1", "u2").is_empty());
        assert_eq!(rooms.room_count(), 0);

        // A new room starts from the saved board.
        let joined = rooms.join("b1", &identity("u3", "carol"));
        assert_eq!(joined.elements.len(), 1);
        assert_eq!(rooms.user_count("b1"), 1);
    }

    #[test]
    fn test_relay_order_matches_store_order() {
        let (rooms, _) = manager();
        let mut watcher = rooms.join("b1", &identity("w", "watcher"));
        rooms.join("b1", &identity("u1", "alice"));
        rooms.join("b1", &identity("u2", "bob"));

        // Concurrent writers to the same element.
        std::thread::scope(|scope| {
            for (user, base) in [("u1", 0.0), ("u2", 1000.0)] {
                let rooms = &rooms;
                scope.spawn(move || {
                    for i in 0..100 {
                        let element = rect("a", base + i as f64);
                        rooms.apply("b1", user, ClientMessage::ElementUpdate { element });
                    }
                });
            }
        });

        let mut last = None;
        while let Ok(envelope) = watcher.rx.try_recv() {
            if let ServerMessage::ElementUpdate { element } = envelope.message {
                last = Some(element.x);
            }
        }
        assert_eq!(last, Some(rooms.elements("b1")[0].x));
    }

    #[test]
    fn test_apply_relays_from_sender() {
        let (rooms, _) = manager();
        let mut joined = rooms.join("b1", &identity("u1", "alice"));
        rooms.apply("b1", "u1", ClientMessage::ElementAdd { element: rect("a", 0.0) });
        let envelope = joined.rx.try_recv().unwrap();
        assert!(!envelope.is_for("u1"));
        assert!(envelope.is_for("u2"));
        assert!(matches!(envelope.message, ServerMessage::ElementAdd { .. }));
    }

    #[test]
    fn test_presence_reaches_room() {
        let (rooms, _) = manager();
        let mut alice = rooms.join("b1", &identity("u1", "alice"));
        let bob = rooms.join("b1", &identity("u2", "bob"));
        rooms.announce_join("b1", &bob.user);

        let join = alice.rx.try_recv().unwrap();
        assert!(join.is_for("u1"));
        assert!(join.is_for("u2"));
        match join.message {
            ServerMessage::Join { username, users, .. } => {
                assert_eq!(username.as_deref(), Some("bob"));
                assert_eq!(users.len(), 2);
            }
            other => panic!("expected join, got {other:?}"),
        }

        rooms.leave("b1", "u2");
        match alice.rx.try_recv().unwrap().message {
            ServerMessage::Leave { user_id, users } => {
                assert_eq!(user_id, "u2");
                assert_eq!(users.len(), 1);
                assert_eq!(users[0].username, "alice");
            }
            other => panic!("expected leave, got {other:?}"),
        }
    }
}
