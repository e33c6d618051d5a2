// Wire protocol DTOs and conversions for lobby messages.
// Every frame is a JSON object tagged by a camelCase `type` field.

use crate::domain::room::normalize_room_name;
use crate::domain::{ClientId, LobbyError, Slot};
use crate::use_cases::{Command, ConfirmedHit, HitClaim, Outbound, RoomSummary};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    CreateRoom(RoomRequest),
    JoinRoom(RoomRequest),
    // Reconnect to a seat this client already holds.
    Restore(RoomRequest),
    GetRooms,
    PlayerInput(PlayerInputPayload),
    State(StatePayload),
    Hit(HitPayload),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    #[serde(alias = "room")]
    pub name: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerInputPayload {
    #[serde(default)]
    pub room: Option<String>,
    pub key: String,
    pub pressed: bool,
}

/// A `state` frame keeps every field the sender wrote, except `type` and `room`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatePayload {
    #[serde(default)]
    pub room: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitPayload {
    pub room: String,
    pub attacker_id: u64,
    pub defender_id: u64,
    pub damage: u32,
}

fn room_name(raw: &str) -> Result<String, LobbyError> {
    normalize_room_name(raw)
        .ok_or_else(|| LobbyError::MalformedMessage("invalid room name".to_string()))
}

fn client_id(raw: &str) -> Result<ClientId, LobbyError> {
    ClientId::parse(raw)
        .ok_or_else(|| LobbyError::MalformedMessage("invalid clientId".to_string()))
}

fn slot(n: u64, field: &str) -> Result<Slot, LobbyError> {
    Slot::from_number(n)
        .ok_or_else(|| LobbyError::MalformedMessage(format!("{field} must be 1 or 2")))
}

// Blank room hints are treated as absent.
fn room_hint(room: Option<String>) -> Option<String> {
    room.map(|r| r.trim().to_string()).filter(|r| !r.is_empty())
}

impl TryFrom<ClientMessage> for Command {
    type Error = LobbyError;

    fn try_from(msg: ClientMessage) -> Result<Self, Self::Error> {
        Ok(match msg {
            ClientMessage::CreateRoom(req) => Command::CreateRoom {
                name: room_name(&req.name)?,
                client_id: client_id(&req.client_id)?,
            },
            ClientMessage::JoinRoom(req) => Command::JoinRoom {
                name: room_name(&req.name)?,
                client_id: client_id(&req.client_id)?,
            },
            ClientMessage::Restore(req) => Command::Restore {
                name: room_name(&req.name)?,
                client_id: client_id(&req.client_id)?,
            },
            ClientMessage::GetRooms => Command::GetRooms,
            ClientMessage::PlayerInput(input) => Command::PlayerInput {
                room: room_hint(input.room),
                key: input.key,
                pressed: input.pressed,
            },
            ClientMessage::State(payload) => Command::State {
                room: room_hint(payload.room),
                state: payload.fields.into(),
            },
            ClientMessage::Hit(hit) => Command::Hit(HitClaim {
                room: room_name(&hit.room)?,
                attacker: slot(hit.attacker_id, "attackerId")?,
                defender: slot(hit.defender_id, "defenderId")?,
                damage: hit.damage,
            }),
        })
    }
}

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    RoomCreated(RoomAssignmentDto),
    // Sent to the joiner and to members already seated.
    RoomJoined(RoomAssignmentDto),
    RoomsList(RoomsListDto),
    RemoteInput(RemoteInputDto),
    // The sender's fields, untouched.
    RemoteState(Map<String, Value>),
    ConfirmedHit(ConfirmedHitDto),
    Error(ErrorDto),
}

impl From<Outbound> for ServerMessage {
    fn from(outbound: Outbound) -> Self {
        match outbound {
            Outbound::RoomCreated { room, slot } => {
                ServerMessage::RoomCreated(RoomAssignmentDto::new(room, slot))
            }
            Outbound::RoomJoined { room, slot } => {
                ServerMessage::RoomJoined(RoomAssignmentDto::new(room, slot))
            }
            Outbound::RoomsList(rooms) => ServerMessage::RoomsList(rooms.into()),
            Outbound::RemoteInput { key, pressed } => {
                ServerMessage::RemoteInput(RemoteInputDto { key, pressed })
            }
            Outbound::RemoteState(state) => ServerMessage::RemoteState(state.into_fields()),
            Outbound::ConfirmedHit(hit) => ServerMessage::ConfirmedHit(hit.into()),
            Outbound::Error { message } => ServerMessage::Error(ErrorDto { message }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAssignmentDto {
    pub room: String,
    pub player_id: u8,
}

impl RoomAssignmentDto {
    fn new(room: String, slot: Slot) -> Self {
        Self {
            room,
            player_id: slot.number(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomSummaryDto {
    pub name: String,
    pub count: usize,
}

/// Open rooms; shared by the `roomsList` message and `GET /rooms`.
#[derive(Debug, Clone, Serialize)]
pub struct RoomsListDto {
    pub rooms: Vec<RoomSummaryDto>,
}

impl From<Vec<RoomSummary>> for RoomsListDto {
    fn from(rooms: Vec<RoomSummary>) -> Self {
        Self {
            rooms: rooms
                .into_iter()
                .map(|room| RoomSummaryDto {
                    name: room.name,
                    count: room.count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteInputDto {
    pub key: String,
    pub pressed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedHitDto {
    pub defender_id: u8,
    pub damage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_health: Option<u32>,
}

impl From<ConfirmedHit> for ConfirmedHitDto {
    fn from(hit: ConfirmedHit) -> Self {
        Self {
            defender_id: hit.defender.number(),
            damage: hit.damage,
            remaining_health: hit.remaining_health,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDto {
    pub message: String,
}
