// Hit arbitration: decides whether a client-reported hit becomes a confirmed hit.
//
// Damage and defender are taken from the attacking client as reported. The
// server only checks that the room exists and that the sender owns the
// attacker slot; collision and timing are not re-simulated here.

use crate::domain::{ConnId, LobbyError};
use crate::use_cases::session_store::SessionStore;
use crate::use_cases::types::{ConfirmedHit, HitClaim};

pub fn arbitrate(
    store: &mut SessionStore,
    conn: ConnId,
    claim: &HitClaim,
) -> Result<ConfirmedHit, LobbyError> {
    if store.room(&claim.room).is_none() {
        return Err(LobbyError::RoomNotFound);
    }
    if claim.attacker == claim.defender {
        return Err(LobbyError::MalformedMessage(
            "attacker and defender must differ".to_string(),
        ));
    }

    let owns_attacker = store
        .binding(conn)
        .is_some_and(|(room, slot)| room == claim.room && slot == claim.attacker);
    if !owns_attacker {
        return Err(LobbyError::UnauthorizedHit);
    }

    let room = store
        .room_mut(&claim.room)
        .ok_or(LobbyError::RoomNotFound)?;
    let remaining_health = room.apply_damage(claim.defender, claim.damage);

    Ok(ConfirmedHit {
        defender: claim.defender,
        damage: claim.damage,
        remaining_health,
    })
}
