// Domain layer: rooms, seats and the player state they carry.

pub mod errors;
pub mod room;
pub mod state;

pub use errors::LobbyError;
pub use room::{ClientId, ConnId, Room, Seat, Slot};
pub use state::PlayerState;
