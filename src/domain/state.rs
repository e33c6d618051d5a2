// Domain-level player state reported by clients and relayed to their opponent.

use serde_json::{Map, Value};

/// Latest self-reported state of one fighter, kept exactly as the client sent it.
///
/// The server never validates position or velocity. The fields are stored for
/// the owning seat and forwarded to the other one unchanged; only `health` is
/// ever read, and only on a best-effort basis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    fields: Map<String, Value>,
}

impl PlayerState {
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Reported health as a whole number of points.
    ///
    /// Fractional values are truncated; negative or non-numeric values read as
    /// absent rather than rejecting the snapshot.
    pub fn health(&self) -> Option<u32> {
        let value = self.fields.get("health")?;
        if let Some(whole) = value.as_u64() {
            return Some(u32::try_from(whole).unwrap_or(u32::MAX));
        }
        value
            .as_f64()
            .filter(|h| h.is_finite() && *h >= 0.0)
            .map(|h| h.min(f64::from(u32::MAX)) as u32)
    }
}

impl From<Map<String, Value>> for PlayerState {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
