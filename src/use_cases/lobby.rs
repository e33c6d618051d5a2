// Lobby protocol handler and the task that drives it.

use crate::domain::{ClientId, ConnId, LobbyError, PlayerState, Slot};
use crate::use_cases::hit;
use crate::use_cases::relay::Relay;
use crate::use_cases::session_store::SessionStore;
use crate::use_cases::types::{Command, HitClaim, LobbyEvent, Outbound};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Owns the session store and the relay; every event is handled to
/// completion before the next one.
#[derive(Debug)]
pub struct Lobby {
    store: SessionStore,
    relay: Relay,
}

impl Lobby {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            relay: Relay::new(),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn handle_event(&mut self, event: LobbyEvent) {
        match event {
            LobbyEvent::Connected {
                conn,
                outbound,
                replaced,
            } => {
                self.relay.attach(conn, outbound, replaced);
            }
            LobbyEvent::Command { conn, command } => self.handle_command(conn, command),
            LobbyEvent::Disconnected { conn } => self.disconnect(conn),
            LobbyEvent::ListRooms { reply } => {
                // The requester may have given up waiting.
                let _ = reply.send(self.store.open_rooms());
            }
        }
    }

    pub fn handle_command(&mut self, conn: ConnId, command: Command) {
        let result = match command {
            Command::CreateRoom { name, client_id } => self.create_room(conn, name, client_id),
            Command::JoinRoom { name, client_id } => self.join_room(conn, name, client_id),
            Command::Restore { name, client_id } => self.restore(conn, name, client_id),
            Command::GetRooms => {
                self.relay
                    .send_to(conn, Outbound::RoomsList(self.store.open_rooms()));
                Ok(())
            }
            Command::PlayerInput { room, key, pressed } => {
                self.relay_input(conn, room.as_deref(), key, pressed)
            }
            Command::State { room, state } => self.relay_state(conn, room.as_deref(), state),
            Command::Hit(claim) => self.confirm_hit(conn, claim),
        };

        if let Err(err) = result {
            debug!(conn_id = conn, error = %err, "command rejected");
            self.relay.send_to(
                conn,
                Outbound::Error {
                    message: err.to_string(),
                },
            );
        }
    }

    fn create_room(
        &mut self,
        conn: ConnId,
        name: String,
        client_id: ClientId,
    ) -> Result<(), LobbyError> {
        self.store.create_room(&name)?;
        let slot = self.store.assign_slot(&name, client_id)?;
        self.bind(conn, &name, slot)?;

        info!(conn_id = conn, room = %name, slot = slot.number(), "room created");
        self.relay
            .send_to(conn, Outbound::RoomCreated { room: name, slot });
        Ok(())
    }

    fn join_room(
        &mut self,
        conn: ConnId,
        name: String,
        client_id: ClientId,
    ) -> Result<(), LobbyError> {
        let slot = self.store.assign_slot(&name, client_id)?;
        self.bind(conn, &name, slot)?;
        info!(conn_id = conn, room = %name, slot = slot.number(), "room joined");

        self.relay.send_to(
            conn,
            Outbound::RoomJoined {
                room: name.clone(),
                slot,
            },
        );

        // Existing members learn the match is ready, each with their own slot.
        let room = self.store.room(&name).ok_or(LobbyError::RoomNotFound)?;
        for (peer_slot, peer_conn) in room.bound_conns().filter(|(_, c)| *c != conn) {
            self.relay.send_to(
                peer_conn,
                Outbound::RoomJoined {
                    room: name.clone(),
                    slot: peer_slot,
                },
            );
        }
        Ok(())
    }

    fn restore(
        &mut self,
        conn: ConnId,
        name: String,
        client_id: ClientId,
    ) -> Result<(), LobbyError> {
        let slot = self
            .store
            .room(&name)
            .ok_or(LobbyError::RoomNotFound)?
            .slot_of(&client_id)
            .ok_or(LobbyError::NotAMember)?;
        self.bind(conn, &name, slot)?;

        info!(conn_id = conn, room = %name, slot = slot.number(), "session restored");
        self.relay
            .send_to(conn, Outbound::RoomJoined { room: name, slot });
        Ok(())
    }

    fn bind(&mut self, conn: ConnId, name: &str, slot: Slot) -> Result<(), LobbyError> {
        if let Some(displaced) = self.store.bind_socket(name, slot, conn)? {
            info!(
                conn_id = conn,
                displaced_conn_id = displaced,
                room = %name,
                slot = slot.number(),
                "slot rebound to newer connection"
            );
            if !self.relay.replace(displaced) {
                warn!(
                    displaced_conn_id = displaced,
                    "displaced connection could not be signalled"
                );
            }
        }
        Ok(())
    }

    fn relay_input(
        &mut self,
        conn: ConnId,
        requested: Option<&str>,
        key: String,
        pressed: bool,
    ) -> Result<(), LobbyError> {
        let (name, _) = self.sender_seat(conn, requested)?;
        let room = self.store.room(&name).ok_or(LobbyError::RoomNotFound)?;
        self.relay
            .forward_to_room(room, conn, &Outbound::RemoteInput { key, pressed });
        Ok(())
    }

    fn relay_state(
        &mut self,
        conn: ConnId,
        requested: Option<&str>,
        state: PlayerState,
    ) -> Result<(), LobbyError> {
        let (name, slot) = self.sender_seat(conn, requested)?;
        let room = self
            .store
            .room_mut(&name)
            .ok_or(LobbyError::RoomNotFound)?;
        room.record_state(slot, state.clone());
        self.relay
            .forward_to_room(room, conn, &Outbound::RemoteState(state));
        Ok(())
    }

    fn confirm_hit(&mut self, conn: ConnId, claim: HitClaim) -> Result<(), LobbyError> {
        let confirmed = hit::arbitrate(&mut self.store, conn, &claim)?;
        info!(
            conn_id = conn,
            room = %claim.room,
            attacker = claim.attacker.number(),
            defender = claim.defender.number(),
            damage = claim.damage,
            remaining_health = ?confirmed.remaining_health,
            "hit confirmed"
        );

        let room = self
            .store
            .room(&claim.room)
            .ok_or(LobbyError::RoomNotFound)?;
        self.relay
            .broadcast_to_room(room, &Outbound::ConfirmedHit(confirmed));
        Ok(())
    }

    // Resolves the seat a connection speaks for; a room named in the message
    // must match it.
    fn sender_seat(
        &self,
        conn: ConnId,
        requested: Option<&str>,
    ) -> Result<(String, Slot), LobbyError> {
        let (name, slot) = self.store.binding(conn).ok_or(LobbyError::NotInRoom)?;
        if requested.is_some_and(|room| room != name) {
            return Err(LobbyError::NotInRoom);
        }
        Ok((name.to_string(), slot))
    }

    fn disconnect(&mut self, conn: ConnId) {
        if let Some((room, slot)) = self.store.remove_socket(conn) {
            info!(conn_id = conn, room = %room, slot = slot.number(), "slot released");
        }
        self.relay.detach(conn);
    }
}

/// Consumes lobby events serially until every sender is gone.
pub async fn lobby_task(mut events: mpsc::Receiver<LobbyEvent>, mut lobby: Lobby) {
    while let Some(event) = events.recv().await {
        lobby.handle_event(event);
    }
    info!(
        rooms = lobby.store.len(),
        dropped = lobby.relay.dropped(),
        "lobby event channel closed; lobby task exiting"
    );
}
