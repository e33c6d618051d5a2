// Network adapter modules split by lobby sockets vs plain HTTP routes.

pub mod client;
pub mod rooms;

pub use client::ws_handler;
pub use rooms::list_rooms_handler;
