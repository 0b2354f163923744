//! Identity and unit types shared across the ledger.
//!
//! Balances and reward amounts are `u64` base units. Aggregates that sum
//! many balances (totals, lifetime counters, accumulator values) are `u128`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An amount of the locked token or of the reward asset, in base units.
pub type Amount = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Opaque 32-byte participant identity.
///
/// The ledger never interprets the bytes; they are whatever the balance
/// transfer service uses to address an owner. Serialized as lowercase hex
/// in human-readable formats.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
#[serde(into = "String", try_from = "String")]
pub struct ParticipantId(pub [u8; 32]);

impl ParticipantId {
    /// The all-zero identity.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a participant id from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic id from a human-readable label (BLAKE3).
    ///
    /// Intended for fixtures and operator tooling where participants are
    /// named rather than keyed.
    pub fn from_label(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Error parsing a hex participant id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseParticipantIdError(pub String);

impl fmt::Display for ParseParticipantIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid participant id: {}", self.0)
    }
}

impl std::error::Error for ParseParticipantIdError {}

impl FromStr for ParticipantId {
    type Err = ParseParticipantIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseParticipantIdError(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ParseParticipantIdError(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Self(bytes))
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ParseParticipantIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<[u8; 32]> for ParticipantId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ParticipantId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase_hex() {
        let id = ParticipantId([0xAB; 32]);
        assert_eq!(id.to_string(), "ab".repeat(32));
    }

    #[test]
    fn parse_display_agree() {
        let id = ParticipantId::from_label("alice");
        let parsed: ParticipantId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_short_input() {
        let err = "abcd".parse::<ParticipantId>().unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!("zz".repeat(32).parse::<ParticipantId>().is_err());
    }

    #[test]
    fn labels_are_distinct_and_deterministic() {
        assert_eq!(ParticipantId::from_label("a"), ParticipantId::from_label("a"));
        assert_ne!(ParticipantId::from_label("a"), ParticipantId::from_label("b"));
    }

    #[test]
    fn json_uses_hex_string() {
        let id = ParticipantId([0x01; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: ParticipantId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
