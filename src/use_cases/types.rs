// Use-case level inputs/outputs for the lobby task.

use crate::domain::{ClientId, ConnId, PlayerState, Slot};
use tokio::sync::{mpsc, oneshot};

/// A validated client request.
#[derive(Debug, Clone)]
pub enum Command {
    CreateRoom { name: String, client_id: ClientId },
    JoinRoom { name: String, client_id: ClientId },
    // Reclaim an existing seat without ever taking a new one.
    Restore { name: String, client_id: ClientId },
    GetRooms,
    PlayerInput {
        room: Option<String>,
        key: String,
        pressed: bool,
    },
    State {
        room: Option<String>,
        state: PlayerState,
    },
    Hit(HitClaim),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitClaim {
    pub room: String,
    pub attacker: Slot,
    pub defender: Slot,
    pub damage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedHit {
    pub defender: Slot,
    pub damage: u32,
    pub remaining_health: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub name: String,
    pub count: usize,
}

/// Messages the lobby task hands to connection tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    RoomCreated { room: String, slot: Slot },
    RoomJoined { room: String, slot: Slot },
    RoomsList(Vec<RoomSummary>),
    RemoteInput { key: String, pressed: bool },
    RemoteState(PlayerState),
    ConfirmedHit(ConfirmedHit),
    Error { message: String },
}

#[derive(Debug)]
pub enum LobbyEvent {
    Connected {
        conn: ConnId,
        outbound: mpsc::Sender<Outbound>,
        // Resolves when a newer socket takes this connection's seat.
        replaced: oneshot::Sender<()>,
    },
    Command {
        conn: ConnId,
        command: Command,
    },
    Disconnected {
        conn: ConnId,
    },
    ListRooms {
        reply: oneshot::Sender<Vec<RoomSummary>>,
    },
}
