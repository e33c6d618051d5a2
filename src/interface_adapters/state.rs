use crate::use_cases::LobbyEvent;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    // Every socket event and HTTP query flows to the single lobby task.
    pub lobby_tx: mpsc::Sender<LobbyEvent>,
}
