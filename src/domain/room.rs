// Rooms pair exactly two clients. Seats are indexed by slot and never reassigned.

use super::errors::LobbyError;
use super::state::PlayerState;

pub const MAX_ROOM_NAME_LEN: usize = 64;
pub const MAX_CLIENT_ID_LEN: usize = 128;

/// Process-unique identifier of an accepted WebSocket connection.
pub type ConnId = u64;

/// Room-scoped player index. Slot one belongs to the creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::One, Slot::Two];

    pub fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }

    pub fn from_number(n: u64) -> Option<Slot> {
        match n {
            1 => Some(Slot::One),
            2 => Some(Slot::Two),
            _ => None,
        }
    }

    fn index(self) -> usize {
        usize::from(self.number() - 1)
    }
}

/// Opaque, client-generated token that survives page reloads.
///
/// Only equality matters; the format is never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_CLIENT_ID_LEN {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }
}

/// Trims a requested room name, rejecting empty or oversized names.
pub fn normalize_room_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_ROOM_NAME_LEN {
        return None;
    }
    Some(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct Seat {
    pub client_id: ClientId,
    // Connection currently speaking for this seat, if any.
    pub conn: Option<ConnId>,
    pub state: Option<PlayerState>,
    // Authoritative health; only confirmed hits lower it once seeded.
    pub health: Option<u32>,
}

impl Seat {
    fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            conn: None,
            state: None,
            health: None,
        }
    }
}

#[derive(Debug)]
pub struct Room {
    name: String,
    seats: [Option<Seat>; 2],
}

impl Room {
    pub fn new(name: String) -> Self {
        Self {
            name,
            seats: [None, None],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seat(&self, slot: Slot) -> Option<&Seat> {
        self.seats[slot.index()].as_ref()
    }

    pub fn slot_of(&self, client_id: &ClientId) -> Option<Slot> {
        Slot::ALL
            .into_iter()
            .find(|slot| self.seat(*slot).is_some_and(|s| &s.client_id == client_id))
    }

    pub fn member_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.member_count() == self.seats.len()
    }

    /// Returns the member's existing slot, or seats them in the first free one.
    pub fn assign(&mut self, client_id: ClientId) -> Result<Slot, LobbyError> {
        if let Some(slot) = self.slot_of(&client_id) {
            return Ok(slot);
        }

        let slot = Slot::ALL
            .into_iter()
            .find(|slot| self.seats[slot.index()].is_none())
            .ok_or(LobbyError::RoomFull)?;
        self.seats[slot.index()] = Some(Seat::new(client_id));
        Ok(slot)
    }

    /// Binds `conn` to an occupied seat and returns the connection it displaced.
    pub fn bind(&mut self, slot: Slot, conn: ConnId) -> Result<Option<ConnId>, LobbyError> {
        let seat = self.seats[slot.index()]
            .as_mut()
            .ok_or(LobbyError::NotAMember)?;
        let previous = seat.conn.replace(conn);
        Ok(previous.filter(|prev| *prev != conn))
    }

    /// Releases whichever seat `conn` is bound to. The member keeps the seat.
    pub fn unbind(&mut self, conn: ConnId) -> Option<Slot> {
        for slot in Slot::ALL {
            let Some(seat) = self.seats[slot.index()].as_mut() else {
                continue;
            };
            if seat.conn == Some(conn) {
                seat.conn = None;
                return Some(slot);
            }
        }
        None
    }

    pub fn conn_of(&self, slot: Slot) -> Option<ConnId> {
        self.seat(slot).and_then(|s| s.conn)
    }

    pub fn bound_conns(&self) -> impl Iterator<Item = (Slot, ConnId)> + '_ {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.conn_of(slot).map(|conn| (slot, conn)))
    }

    pub fn has_bound_conns(&self) -> bool {
        self.bound_conns().next().is_some()
    }

    /// Stores the latest snapshot for a seat; the first reported health seeds
    /// the authoritative counter.
    pub fn record_state(&mut self, slot: Slot, state: PlayerState) {
        if let Some(seat) = self.seats[slot.index()].as_mut() {
            if seat.health.is_none() {
                seat.health = state.health();
            }
            seat.state = Some(state);
        }
    }

    /// Lowers the seat's health by `damage`, saturating at zero.
    /// Returns the remaining health when the seat has a known counter.
    pub fn apply_damage(&mut self, slot: Slot, damage: u32) -> Option<u32> {
        let seat = self.seats[slot.index()].as_mut()?;
        let health = seat.health.as_mut()?;
        *health = health.saturating_sub(damage);
        Some(*health)
    }
}
