use crate::domain::{ConnId, LobbyError};
use crate::frameworks::config;
use crate::interface_adapters::protocol::{ClientMessage, ErrorDto, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::conn_id::next_conn_id;
use crate::use_cases::{Command, LobbyEvent, Outbound};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    LobbyClosed,
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let lobby_tx = state.lobby_tx.clone();
    ws.max_message_size(config::MAX_MESSAGE_BYTES)
        .on_upgrade(move |socket| {
            // Separate connection id for correlating every log line of this socket.
            let conn_id = next_conn_id();
            handle_socket(socket, conn_id, lobby_tx).instrument(info_span!("conn", conn_id))
        })
}

struct ConnCtx {
    conn_id: ConnId,
    lobby_tx: mpsc::Sender<LobbyEvent>,
    // Messages the lobby task addressed to this socket.
    outbound_rx: mpsc::Receiver<Outbound>,
    // Fires once a newer socket takes this connection's seat.
    replaced_rx: oneshot::Receiver<()>,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    rejected: u32,
    last_rejected_log: Option<Instant>,

    close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn new(
        conn_id: ConnId,
        lobby_tx: mpsc::Sender<LobbyEvent>,
        outbound_rx: mpsc::Receiver<Outbound>,
        replaced_rx: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            conn_id,
            lobby_tx,
            outbound_rx,
            replaced_rx,
            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            rejected: 0,
            last_rejected_log: None,
            close_frame: None,
        }
    }

    fn should_log_rejected(&mut self) -> bool {
        let due = self
            .last_rejected_log
            .is_none_or(|last| last.elapsed() >= LOG_THROTTLE);
        if due {
            self.last_rejected_log = Some(Instant::now());
        }
        due
    }
}

async fn handle_socket(
    mut socket: WebSocket,
    conn_id: ConnId,
    lobby_tx: mpsc::Sender<LobbyEvent>,
) {
    let (outbound_tx, outbound_rx) = mpsc::channel::<Outbound>(config::OUTBOUND_CHANNEL_CAPACITY);
    let (replaced_tx, replaced_rx) = oneshot::channel();

    // Attach before reading anything so replies always have somewhere to go.
    if lobby_tx
        .send(LobbyEvent::Connected {
            conn: conn_id,
            outbound: outbound_tx,
            replaced: replaced_tx,
        })
        .await
        .is_err()
    {
        warn!("lobby task unavailable; closing connection");
        let _ = send_close_with_reason(&mut socket, close_code::ERROR, "lobby unavailable").await;
        return;
    }
    info!("client connected");

    let mut ctx = ConnCtx::new(conn_id, lobby_tx, outbound_rx, replaced_rx);

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }

    disconnect_cleanup(&ctx).await;
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, ctx).await? {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }

            // A newer connection took the seat
            replaced = &mut ctx.replaced_rx => {
                if replaced.is_err() {
                    warn!("lobby dropped replacement signal; disconnecting");
                    return Err(NetError::LobbyClosed);
                }
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "connection replaced".into(),
                });
                info!("connection replaced by newer session");
                true
            }

            // Outgoing Lobby Message
            outbound = ctx.outbound_rx.recv() => {
                match outbound {
                    Some(msg) => match forward_outbound(msg, socket, ctx).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    None => {
                        warn!("lobby dropped outbound channel; disconnecting");
                        return Err(NetError::LobbyClosed);
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            return Ok(());
        }
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                let parsed = serde_json::from_str::<ClientMessage>(&text)
                    .map_err(|e| LobbyError::MalformedMessage(e.to_string()))
                    .and_then(Command::try_from);

                match parsed {
                    Ok(command) => {
                        ctx.lobby_tx
                            .send(LobbyEvent::Command {
                                conn: ctx.conn_id,
                                command,
                            })
                            .await
                            .map_err(|_| NetError::LobbyClosed)?;
                        Ok(LoopControl::Continue)
                    }
                    Err(err) => {
                        // Malformed input is answered, never fatal.
                        ctx.rejected += 1;
                        if ctx.should_log_rejected() {
                            warn!(
                                bytes = text.len(),
                                rejected = ctx.rejected,
                                error = %err,
                                "rejected client message"
                            );
                        }
                        Ok(reply_error(socket, err.to_string(), ctx).await)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.rejected += 1;
                let err =
                    LobbyError::MalformedMessage("binary messages not supported".to_string());
                Ok(reply_error(socket, err.to_string(), ctx).await)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn reply_error(socket: &mut WebSocket, message: String, ctx: &mut ConnCtx) -> LoopControl {
    let msg = ServerMessage::Error(ErrorDto { message });
    deliver(socket, &msg, ctx).await
}

async fn forward_outbound(msg: Outbound, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    deliver(socket, &ServerMessage::from(msg), ctx).await
}

async fn deliver(socket: &mut WebSocket, msg: &ServerMessage, ctx: &mut ConnCtx) -> LoopControl {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send lobby message");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) {
    // Releases the seat; the room goes away with its last socket.
    if ctx
        .lobby_tx
        .send(LobbyEvent::Disconnected { conn: ctx.conn_id })
        .await
        .is_err()
    {
        debug!("lobby task gone before disconnect cleanup");
    }

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        rejected = ctx.rejected,
        "connection stats"
    );
    info!("client disconnected");
}
