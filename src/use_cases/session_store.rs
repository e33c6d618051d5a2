// Owned room table plus the reverse index from connection to seat.

use crate::domain::{ClientId, ConnId, LobbyError, Room, Slot};
use crate::use_cases::types::RoomSummary;
use std::collections::HashMap;
use tracing::debug;

/// In-memory store of active rooms.
///
/// Owned by the lobby task and mutated from a single place, so it needs no
/// locking. Nothing is persisted across restarts.
#[derive(Debug, Default)]
pub struct SessionStore {
    /// Room name to room.
    rooms: HashMap<String, Room>,
    /// Connection to the seat it currently speaks for.
    bindings: HashMap<ConnId, (String, Slot)>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_room(&mut self, name: &str) -> Result<(), LobbyError> {
        if self.rooms.contains_key(name) {
            return Err(LobbyError::RoomExists);
        }
        self.rooms
            .insert(name.to_string(), Room::new(name.to_string()));
        Ok(())
    }

    /// Seats `client_id` in the room, reusing its slot when it is already a member.
    pub fn assign_slot(&mut self, name: &str, client_id: ClientId) -> Result<Slot, LobbyError> {
        let room = self.rooms.get_mut(name).ok_or(LobbyError::RoomNotFound)?;
        room.assign(client_id)
    }

    /// Binds `conn` to an occupied seat and returns the connection it displaced.
    ///
    /// A connection speaks for one seat at a time, so any other seat it held is
    /// released first.
    pub fn bind_socket(
        &mut self,
        name: &str,
        slot: Slot,
        conn: ConnId,
    ) -> Result<Option<ConnId>, LobbyError> {
        let room = self.rooms.get(name).ok_or(LobbyError::RoomNotFound)?;
        if room.seat(slot).is_none() {
            return Err(LobbyError::NotAMember);
        }

        let already_bound = self
            .bindings
            .get(&conn)
            .is_some_and(|(bound_room, bound_slot)| bound_room == name && *bound_slot == slot);
        if !already_bound {
            self.release(conn, Some(name));
        }

        let room = self.rooms.get_mut(name).ok_or(LobbyError::RoomNotFound)?;
        let displaced = room.bind(slot, conn)?;
        if let Some(old) = displaced {
            self.bindings.remove(&old);
        }
        self.bindings.insert(conn, (name.to_string(), slot));
        Ok(displaced)
    }

    /// Unbinds a closed connection and deletes its room once no socket is left.
    pub fn remove_socket(&mut self, conn: ConnId) -> Option<(String, Slot)> {
        self.release(conn, None)
    }

    pub fn binding(&self, conn: ConnId) -> Option<(&str, Slot)> {
        self.bindings
            .get(&conn)
            .map(|(name, slot)| (name.as_str(), *slot))
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn room_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name)
    }

    /// Rooms that still have a free seat, sorted by name.
    pub fn open_rooms(&self) -> Vec<RoomSummary> {
        let mut open: Vec<RoomSummary> = self
            .rooms
            .values()
            .filter(|room| !room.is_full())
            .map(|room| RoomSummary {
                name: room.name().to_string(),
                count: room.member_count(),
            })
            .collect();
        open.sort_by(|a, b| a.name.cmp(&b.name));
        open
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    // `keep` names a room that must survive even when left without sockets.
    fn release(&mut self, conn: ConnId, keep: Option<&str>) -> Option<(String, Slot)> {
        let (name, slot) = self.bindings.remove(&conn)?;
        let room = self.rooms.get_mut(&name)?;
        room.unbind(conn);

        if !room.has_bound_conns() && keep != Some(name.as_str()) {
            self.rooms.remove(&name);
            debug!(room = %name, "room deleted after last socket left");
        }
        Some((name, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str) -> ClientId {
        ClientId::parse(id).expect("valid client id")
    }

    fn seat(store: &mut SessionStore, room: &str, id: &str, conn: ConnId) -> Slot {
        let slot = store.assign_slot(room, client(id)).expect("slot");
        store.bind_socket(room, slot, conn).expect("bind");
        slot
    }

    #[test]
    fn when_room_name_is_taken_then_create_fails() {
        let mut store = SessionStore::new();
        store.create_room("arena").expect("first create");

        assert_eq!(store.create_room("arena"), Err(LobbyError::RoomExists));
    }

    #[test]
    fn when_assigning_into_unknown_room_then_room_not_found() {
        let mut store = SessionStore::new();
        assert_eq!(
            store.assign_slot("nowhere", client("a")),
            Err(LobbyError::RoomNotFound)
        );
    }

    #[test]
    fn when_many_distinct_clients_join_then_room_never_exceeds_two_slots() {
        let mut store = SessionStore::new();
        store.create_room("arena").expect("create");

        let mut seated = 0;
        for conn in 0..10u64 {
            let id = format!("client-{conn}");
            match store.assign_slot("arena", client(&id)) {
                Ok(slot) => {
                    store.bind_socket("arena", slot, conn).expect("bind");
                    seated += 1;
                }
                Err(err) => assert_eq!(err, LobbyError::RoomFull),
            }
        }

        let room = store.room("arena").expect("room");
        assert_eq!(seated, 2);
        assert_eq!(room.member_count(), 2);
        assert_eq!(room.bound_conns().count(), 2);
    }

    #[test]
    fn when_member_rejoins_on_new_socket_then_slot_is_rebound() {
        let mut store = SessionStore::new();
        store.create_room("arena").expect("create");
        seat(&mut store, "arena", "a", 1);
        seat(&mut store, "arena", "b", 2);

        let slot = store.assign_slot("arena", client("a")).expect("slot");
        let displaced = store.bind_socket("arena", slot, 3).expect("rebind");

        assert_eq!(slot, Slot::One);
        assert_eq!(displaced, Some(1));
        assert_eq!(store.binding(3), Some(("arena", Slot::One)));
        assert_eq!(store.binding(1), None);
        // The stale socket closing later must not disturb the room.
        assert_eq!(store.remove_socket(1), None);
        assert_eq!(store.room("arena").map(Room::member_count), Some(2));
    }

    #[test]
    fn when_last_socket_is_removed_then_room_is_deleted() {
        let mut store = SessionStore::new();
        store.create_room("arena").expect("create");
        seat(&mut store, "arena", "a", 1);
        seat(&mut store, "arena", "b", 2);

        assert_eq!(store.remove_socket(2), Some(("arena".to_string(), Slot::Two)));
        assert!(store.room("arena").is_some());

        assert_eq!(store.remove_socket(1), Some(("arena".to_string(), Slot::One)));
        assert!(store.room("arena").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn when_peer_disconnects_then_its_seat_can_be_reclaimed() {
        let mut store = SessionStore::new();
        store.create_room("arena").expect("create");
        seat(&mut store, "arena", "a", 1);
        seat(&mut store, "arena", "b", 2);
        store.remove_socket(2);

        assert_eq!(store.assign_slot("arena", client("c")), Err(LobbyError::RoomFull));
        assert_eq!(seat(&mut store, "arena", "b", 5), Slot::Two);
    }

    #[test]
    fn when_socket_moves_to_another_room_then_previous_room_is_released() {
        let mut store = SessionStore::new();
        store.create_room("first").expect("create first");
        seat(&mut store, "first", "a", 1);
        store.create_room("second").expect("create second");
        seat(&mut store, "second", "a", 1);

        assert!(store.room("first").is_none());
        assert_eq!(store.binding(1), Some(("second", Slot::One)));
    }

    #[test]
    fn when_listing_rooms_then_only_open_rooms_are_returned() {
        let mut store = SessionStore::new();
        store.create_room("b-open").expect("create");
        seat(&mut store, "b-open", "a", 1);
        store.create_room("full").expect("create");
        seat(&mut store, "full", "b", 2);
        seat(&mut store, "full", "c", 3);
        store.create_room("a-open").expect("create");
        seat(&mut store, "a-open", "d", 4);

        let open = store.open_rooms();
        assert_eq!(
            open,
            vec![
                RoomSummary {
                    name: "a-open".to_string(),
                    count: 1
                },
                RoomSummary {
                    name: "b-open".to_string(),
                    count: 1
                },
            ]
        );
    }
}
