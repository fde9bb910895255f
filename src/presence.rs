//! Per-session record of which rooms a connection currently occupies.
//!
//! Answers "what rooms is session X in"; the router answers the inverse.
//! All operations are idempotent and lock-held sections never await.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use uuid::Uuid;

use crate::room::RoomKey;

pub type SessionId = Uuid;

#[derive(Default)]
pub struct PresenceTracker {
    sessions: Mutex<HashMap<SessionId, HashSet<RoomKey>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the session was not already in the room.
    pub fn join(&self, session: SessionId, room: RoomKey) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .entry(session)
            .or_default()
            .insert(room)
    }

    /// Returns true if the session was in the room.
    pub fn leave(&self, session: SessionId, room: &RoomKey) -> bool {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(rooms) = sessions.get_mut(&session) else {
            return false;
        };
        let removed = rooms.remove(room);
        if rooms.is_empty() {
            sessions.remove(&session);
        }
        removed
    }

    pub fn is_member(&self, session: SessionId, room: &RoomKey) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .get(&session)
            .is_some_and(|rooms| rooms.contains(room))
    }

    /// Clears all state for the session and returns every room it was in,
    /// so the caller can emit a leave broadcast per room.
    pub fn drop_session(&self, session: SessionId) -> Vec<RoomKey> {
        self.sessions
            .lock()
            .unwrap()
            .remove(&session)
            .map(|rooms| rooms.into_iter().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(channel: &str) -> RoomKey {
        RoomKey::new("g1", channel).unwrap()
    }

    #[test]
    fn join_is_idempotent() {
        let tracker = PresenceTracker::new();
        let session = Uuid::now_v7();
        assert!(tracker.join(session, key("general")));
        assert!(!tracker.join(session, key("general")));
        assert!(tracker.is_member(session, &key("general")));
    }

    #[test]
    fn leave_unknown_room_is_noop() {
        let tracker = PresenceTracker::new();
        let session = Uuid::now_v7();
        assert!(!tracker.leave(session, &key("general")));
        tracker.join(session, key("general"));
        assert!(tracker.leave(session, &key("general")));
        assert!(!tracker.is_member(session, &key("general")));
    }

    #[test]
    fn drop_session_returns_all_rooms() {
        let tracker = PresenceTracker::new();
        let session = Uuid::now_v7();
        tracker.join(session, key("general"));
        tracker.join(session, key("random"));

        let mut rooms = tracker.drop_session(session);
        rooms.sort_by(|a, b| a.channel.cmp(&b.channel));
        assert_eq!(rooms, vec![key("general"), key("random")]);
        assert!(tracker.drop_session(session).is_empty());
    }
}
