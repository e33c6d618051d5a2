use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::RoomsListDto;
use crate::interface_adapters::state::AppState;
use crate::use_cases::LobbyEvent;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::warn;

// Same listing as the `getRooms` socket message, for pages that have no socket yet.
pub async fn list_rooms_handler(State(state): State<Arc<AppState>>) -> Response {
    let (reply_tx, reply_rx) = oneshot::channel();
    if state
        .lobby_tx
        .send(LobbyEvent::ListRooms { reply: reply_tx })
        .await
        .is_err()
    {
        return lobby_unavailable();
    }

    match reply_rx.await {
        Ok(rooms) => (StatusCode::OK, Json(RoomsListDto::from(rooms))).into_response(),
        Err(_) => lobby_unavailable(),
    }
}

fn lobby_unavailable() -> Response {
    warn!("lobby task unavailable for room listing");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "lobby unavailable".to_string(),
        }),
    )
        .into_response()
}
