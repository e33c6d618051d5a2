use std::{
    env,
    net::{IpAddr, Ipv4Addr},
};

// Runtime/server constants (not gameplay rules).

pub fn http_port() -> u16 {
    env::var("LOBBY_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn bind_host() -> IpAddr {
    env::var("LOBBY_SERVER_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

// Socket events queued for the lobby task.
pub const LOBBY_CHANNEL_CAPACITY: usize = 1024;
// Lobby messages queued per connection before they are dropped.
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 64;
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024;
