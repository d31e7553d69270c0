//! Bidirectional connection ↔ room index.
//!
//! ```text
//!   by_connection                 by_room
//! ┌──────┬──────────┐         ┌──────┬──────────┐
//! │ A    │ {x}      │         │ x    │ {A, B}   │
//! │ B    │ {x, y}   │ ◄─────► │ y    │ {B, C}   │
//! │ C    │ {y}      │         └──────┴──────────┘
//! └──────┴──────────┘
//! ```
//!
//! Invariants, held after every public method returns:
//! - `r ∈ by_connection[c]` iff `c ∈ by_room[r]`
//! - no entry of either map holds an empty set
//!
//! Every removal path goes through [`MembershipIndex::unlink`], which is the
//! only place that prunes entries.

use std::collections::{HashMap, HashSet};

use crate::ids::{ConnectionId, Room};

/// Plain, unsynchronized membership state. `MembershipRegistry` wraps it in
/// a lock; use it directly only from single-threaded code.
#[derive(Debug, Default, Clone)]
pub struct MembershipIndex {
    by_connection: HashMap<ConnectionId, HashSet<Room>>,
    by_room: HashMap<Room, HashSet<ConnectionId>>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size both maps.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_connection: HashMap::with_capacity(capacity),
            by_room: HashMap::with_capacity(capacity),
        }
    }

    /// Add `conn` to `room`. Returns `true` if the pair was new.
    pub fn insert(&mut self, conn: &ConnectionId, room: &Room) -> bool {
        let added = self
            .by_connection
            .entry(conn.clone())
            .or_default()
            .insert(room.clone());

        let members = self.by_room.entry(room.clone()).or_insert_with(|| {
            log::debug!("Room {room} created");
            HashSet::new()
        });
        members.insert(conn.clone());

        added
    }

    /// Remove `conn` from `room`. Returns `true` if the pair existed.
    pub fn remove(&mut self, conn: &str, room: &str) -> bool {
        let removed = match self.by_connection.get_mut(conn) {
            Some(rooms) => rooms.remove(room),
            None => false,
        };
        self.unlink(conn, room);
        removed
    }

    /// Remove `conn` from every room and drop its entry.
    ///
    /// Returns the rooms it was removed from.
    pub fn remove_all(&mut self, conn: &str) -> HashSet<Room> {
        let rooms = self.by_connection.remove(conn).unwrap_or_default();
        for room in &rooms {
            self.unlink(conn, room.as_str());
        }
        rooms
    }

    /// Drop `conn` from `by_room[room]` and prune whichever side is now empty.
    fn unlink(&mut self, conn: &str, room: &str) {
        if let Some(members) = self.by_room.get_mut(room) {
            members.remove(conn);
            if members.is_empty() {
                self.by_room.remove(room);
                log::debug!("Room {room} removed");
            }
        }
        if self
            .by_connection
            .get(conn)
            .is_some_and(|rooms| rooms.is_empty())
        {
            self.by_connection.remove(conn);
        }
    }

    /// Recipients of a room-scoped broadcast.
    ///
    /// Walks `rooms` in order and yields each member once, skipping `except`.
    pub fn resolve_rooms(&self, rooms: &[Room], except: &HashSet<ConnectionId>) -> Vec<ConnectionId> {
        let mut seen: HashSet<&ConnectionId> = HashSet::new();
        let mut recipients = Vec::new();

        for room in rooms {
            let Some(members) = self.by_room.get(room) else {
                continue;
            };
            for conn in members {
                if except.contains(conn) || !seen.insert(conn) {
                    continue;
                }
                recipients.push(conn.clone());
            }
        }

        recipients
    }

    /// Recipients of an unscoped broadcast: every joined connection not in `except`.
    pub fn resolve_all(&self, except: &HashSet<ConnectionId>) -> Vec<ConnectionId> {
        self.by_connection
            .keys()
            .filter(|conn| !except.contains(*conn))
            .cloned()
            .collect()
    }

    pub fn rooms_of(&self, conn: &str) -> Option<&HashSet<Room>> {
        self.by_connection.get(conn)
    }

    pub fn members_of(&self, room: &str) -> Option<&HashSet<ConnectionId>> {
        self.by_room.get(room)
    }

    pub fn contains(&self, conn: &str, room: &str) -> bool {
        self.by_room
            .get(room)
            .is_some_and(|members| members.contains(conn))
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.by_room.keys()
    }

    pub fn connections(&self) -> impl Iterator<Item = &ConnectionId> {
        self.by_connection.keys()
    }

    pub fn room_count(&self) -> usize {
        self.by_room.len()
    }

    pub fn connection_count(&self) -> usize {
        self.by_connection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_connection.is_empty() && self.by_room.is_empty()
    }

    /// Panics if the two maps disagree or hold an empty set.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        for (conn, rooms) in &self.by_connection {
            assert!(!rooms.is_empty(), "connection {conn} has an empty room set");
            for room in rooms {
                assert!(
                    self.by_room.get(room).is_some_and(|m| m.contains(conn)),
                    "{conn} lists {room} but {room} does not list {conn}"
                );
            }
        }
        for (room, members) in &self.by_room {
            assert!(!members.is_empty(), "room {room} is empty");
            for conn in members {
                assert!(
                    self.by_connection.get(conn).is_some_and(|r| r.contains(room)),
                    "{room} lists {conn} but {conn} does not list {room}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: &str) -> ConnectionId {
        ConnectionId::from(id)
    }

    fn r(name: &str) -> Room {
        Room::from(name)
    }

    #[test]
    fn test_insert_is_symmetric() {
        let mut index = MembershipIndex::new();
        assert!(index.insert(&c("A"), &r("x")));

        assert!(index.rooms_of("A").unwrap().contains("x"));
        assert!(index.members_of("x").unwrap().contains("A"));
        assert!(index.contains("A", "x"));
        index.assert_consistent();
    }

    #[test]
    fn test_insert_twice_is_idempotent() {
        let mut index = MembershipIndex::new();
        assert!(index.insert(&c("A"), &r("x")));
        let once = index.clone();

        assert!(!index.insert(&c("A"), &r("x")));
        assert_eq!(index.by_connection, once.by_connection);
        assert_eq!(index.by_room, once.by_room);
    }

    #[test]
    fn test_remove_prunes_empty_room_and_connection() {
        let mut index = MembershipIndex::new();
        index.insert(&c("A"), &r("x"));

        assert!(index.remove("A", "x"));
        assert!(index.members_of("x").is_none());
        assert!(index.rooms_of("A").is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_keeps_room_with_other_members() {
        let mut index = MembershipIndex::new();
        index.insert(&c("A"), &r("x"));
        index.insert(&c("B"), &r("x"));
        index.insert(&c("A"), &r("y"));

        index.remove("A", "x");
        assert_eq!(index.members_of("x").unwrap().len(), 1);
        assert!(index.members_of("x").unwrap().contains("B"));
        // A still in y, so its entry stays
        assert!(index.rooms_of("A").unwrap().contains("y"));
        index.assert_consistent();
    }

    #[test]
    fn test_remove_unknown_pair_is_noop() {
        let mut index = MembershipIndex::new();
        index.insert(&c("A"), &r("x"));

        assert!(!index.remove("A", "y"));
        assert!(!index.remove("Z", "x"));
        assert!(!index.remove("Z", "nowhere"));
        assert!(index.contains("A", "x"));
        assert_eq!(index.room_count(), 1);
        index.assert_consistent();
    }

    #[test]
    fn test_remove_twice_is_idempotent() {
        let mut index = MembershipIndex::new();
        index.insert(&c("A"), &r("x"));
        index.insert(&c("B"), &r("x"));

        index.remove("A", "x");
        let once = index.clone();
        index.remove("A", "x");
        assert_eq!(index.by_connection, once.by_connection);
        assert_eq!(index.by_room, once.by_room);
    }

    #[test]
    fn test_remove_all() {
        let mut index = MembershipIndex::new();
        index.insert(&c("A"), &r("x"));
        index.insert(&c("A"), &r("y"));
        index.insert(&c("B"), &r("y"));

        let left = index.remove_all("A");
        assert_eq!(left.len(), 2);
        assert!(index.rooms_of("A").is_none());
        assert!(index.members_of("x").is_none());
        assert_eq!(index.members_of("y").unwrap().len(), 1);
        index.assert_consistent();

        assert!(index.remove_all("A").is_empty());
    }

    #[test]
    fn test_resolve_rooms_dedups_across_rooms() {
        let mut index = MembershipIndex::new();
        index.insert(&c("A"), &r("x"));
        index.insert(&c("A"), &r("y"));
        index.insert(&c("B"), &r("y"));

        let mut got = index.resolve_rooms(&[r("x"), r("y")], &HashSet::new());
        got.sort();
        assert_eq!(got, vec![c("A"), c("B")]);
    }

    #[test]
    fn test_resolve_rooms_skips_unknown_and_excluded() {
        let mut index = MembershipIndex::new();
        index.insert(&c("A"), &r("x"));
        index.insert(&c("B"), &r("x"));

        let except: HashSet<ConnectionId> = [c("B")].into_iter().collect();
        let got = index.resolve_rooms(&[r("ghost"), r("x")], &except);
        assert_eq!(got, vec![c("A")]);
    }

    #[test]
    fn test_resolve_rooms_first_room_members_come_first() {
        let mut index = MembershipIndex::new();
        index.insert(&c("A"), &r("x"));
        index.insert(&c("B"), &r("y"));

        let got = index.resolve_rooms(&[r("y"), r("x")], &HashSet::new());
        assert_eq!(got, vec![c("B"), c("A")]);
    }

    #[test]
    fn test_resolve_all() {
        let mut index = MembershipIndex::new();
        index.insert(&c("A"), &r("x"));
        index.insert(&c("B"), &r("x"));
        index.insert(&c("B"), &r("y"));
        index.insert(&c("C"), &r("y"));

        let except: HashSet<ConnectionId> = [c("C")].into_iter().collect();
        let mut got = index.resolve_all(&except);
        got.sort();
        assert_eq!(got, vec![c("A"), c("B")]);
    }

    #[test]
    fn test_consistency_under_churn() {
        let mut index = MembershipIndex::with_capacity(8);
        let conns: Vec<ConnectionId> = (0..6).map(|i| c(&format!("c{i}"))).collect();
        let rooms: Vec<Room> = (0..4).map(|i| r(&format!("r{i}"))).collect();

        for step in 0..200usize {
            let conn = &conns[step % conns.len()];
            let room = &rooms[(step * 7) % rooms.len()];
            match step % 5 {
                0 | 1 | 2 => {
                    index.insert(conn, room);
                }
                3 => {
                    index.remove(conn.as_str(), room.as_str());
                }
                _ => {
                    index.remove_all(conn.as_str());
                }
            }
            index.assert_consistent();
        }
    }
}
