use std::fmt;

// Domain-level errors for lobby workflows.
// Every variant is recoverable and reported to the originating client only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyError {
    RoomExists,
    RoomNotFound,
    RoomFull,
    MalformedMessage(String),
    UnauthorizedHit,
    NotInRoom,
    NotAMember,
}

impl fmt::Display for LobbyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LobbyError::RoomExists => f.write_str("room already exists"),
            LobbyError::RoomNotFound => f.write_str("room not found"),
            LobbyError::RoomFull => f.write_str("room is full"),
            LobbyError::MalformedMessage(reason) => write!(f, "malformed message: {reason}"),
            LobbyError::UnauthorizedHit => {
                f.write_str("hit rejected: sender does not own the attacker slot")
            }
            LobbyError::NotInRoom => f.write_str("not in a room"),
            LobbyError::NotAMember => f.write_str("client is not a member of this room"),
        }
    }
}

impl std::error::Error for LobbyError {}
