// Fire-and-forget delivery from the lobby task to connection tasks.

use crate::domain::{ConnId, Room};
use crate::use_cases::types::Outbound;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tracing::{debug, warn};

const DROP_LOG_THROTTLE: Duration = Duration::from_secs(2);

#[derive(Debug)]
struct Peer {
    outbound: mpsc::Sender<Outbound>,
    // Fired at most once, when a newer socket takes this connection's seat.
    replaced: Option<oneshot::Sender<()>>,
}

/// Outbound channels of every attached connection.
///
/// Delivery is at-most-once: a full or closed channel drops the message and
/// nothing is queued for replay. The replacement signal travels separately and
/// is never dropped for lack of capacity.
#[derive(Debug, Default)]
pub struct Relay {
    peers: HashMap<ConnId, Peer>,
    dropped: u64,
    last_drop_log: Option<Instant>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(
        &mut self,
        conn: ConnId,
        outbound: mpsc::Sender<Outbound>,
        replaced: oneshot::Sender<()>,
    ) {
        self.peers.insert(
            conn,
            Peer {
                outbound,
                replaced: Some(replaced),
            },
        );
    }

    pub fn detach(&mut self, conn: ConnId) -> bool {
        self.peers.remove(&conn).is_some()
    }

    /// Number of messages dropped because a connection fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn send_to(&mut self, conn: ConnId, msg: Outbound) -> bool {
        let Some(peer) = self.peers.get(&conn) else {
            debug!(conn_id = conn, "no outbound channel for connection; dropping");
            return false;
        };

        match peer.outbound.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.should_log_drop() {
                    warn!(
                        conn_id = conn,
                        dropped = self.dropped,
                        "outbound channel full; dropping message"
                    );
                }
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(conn_id = conn, "outbound channel closed; dropping");
                false
            }
        }
    }

    /// Tells a connection that a newer socket took its seat.
    pub fn replace(&mut self, conn: ConnId) -> bool {
        let Some(signal) = self
            .peers
            .get_mut(&conn)
            .and_then(|peer| peer.replaced.take())
        else {
            debug!(conn_id = conn, "connection already replaced or detached");
            return false;
        };

        if signal.send(()).is_err() {
            debug!(conn_id = conn, "connection gone before replacement signal");
            return false;
        }
        true
    }

    /// Sends `msg` to every bound socket of `room` except `exclude`.
    pub fn forward_to_room(&mut self, room: &Room, exclude: ConnId, msg: &Outbound) -> usize {
        room.bound_conns()
            .filter(|(_, conn)| *conn != exclude)
            .filter(|(_, conn)| self.send_to(*conn, msg.clone()))
            .count()
    }

    /// Sends `msg` to every bound socket of `room`.
    pub fn broadcast_to_room(&mut self, room: &Room, msg: &Outbound) -> usize {
        room.bound_conns()
            .filter(|(_, conn)| self.send_to(*conn, msg.clone()))
            .count()
    }

    fn should_log_drop(&mut self) -> bool {
        let due = self
            .last_drop_log
            .is_none_or(|last| last.elapsed() >= DROP_LOG_THROTTLE);
        if due {
            self.last_drop_log = Some(Instant::now());
        }
        due
    }
}
