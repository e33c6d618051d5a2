// Use cases layer: lobby workflows driven by the single lobby task.

pub mod hit;
pub mod lobby;
pub mod relay;
pub mod session_store;
pub mod types;

pub use lobby::{Lobby, lobby_task};
pub use relay::Relay;
pub use session_store::SessionStore;
pub use types::{Command, ConfirmedHit, HitClaim, LobbyEvent, Outbound, RoomSummary};
