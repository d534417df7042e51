//! Typed identifiers for conversations and messages.
//!
//! `ConversationId` wraps a UUIDv7 (time-ordered, globally unique). It displays
//! as standard UUID text for logging; `short()` (first 8 hex chars) is for
//! human-facing output only, never a lookup key.
//!
//! `SequenceId` is the ordering key of a message within its conversation:
//! assigned by the store at creation, strictly increasing, never reused.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A conversation identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(uuid::Uuid);

impl ConversationId {
    /// Create a new time-ordered ID (UUIDv7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters, for human display only (not lookup).
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// Full 32-character hex string (no hyphens).
    pub fn to_hex(&self) -> String {
        self.0.as_simple().to_string()
    }

    /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<uuid::Uuid> for ConversationId {
    fn from(u: uuid::Uuid) -> Self {
        Self(u)
    }
}

impl From<ConversationId> for uuid::Uuid {
    fn from(id: ConversationId) -> uuid::Uuid {
        id.0
    }
}

impl std::str::FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full UUID with hyphens for log readability
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConversationId({})", self.short())
    }
}

// ── SequenceId ──────────────────────────────────────────────────────────────

/// Ordering key of a message within its conversation.
///
/// Valid values are `1..=i64::MAX`: zero is never assigned, and the upper
/// bound is the SQLite `INTEGER` key space the store persists into.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct SequenceId(u64);

impl SequenceId {
    /// Largest assignable sequence id.
    pub const MAX: u64 = i64::MAX as u64;

    /// Wrap a raw value, rejecting zero and values beyond [`SequenceId::MAX`].
    pub fn new(raw: u64) -> Option<Self> {
        (1..=Self::MAX).contains(&raw).then_some(Self(raw))
    }

    /// The raw value.
    pub fn get(self) -> u64 {
        self.0
    }

    /// The value as a signed SQLite integer (always in range by construction).
    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }

    /// Reconstruct from a SQLite integer column.
    pub fn from_i64(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().and_then(Self::new)
    }
}

/// Error for out-of-domain sequence ids during deserialization.
#[derive(Debug, thiserror::Error)]
#[error("sequence id {0} outside 1..={max}", max = SequenceId::MAX)]
pub struct SequenceIdOutOfRange(pub u64);

impl TryFrom<u64> for SequenceId {
    type Error = SequenceIdOutOfRange;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(SequenceIdOutOfRange(raw))
    }
}

impl From<SequenceId> for u64 {
    fn from(id: SequenceId) -> u64 {
        id.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique() {
        let a = ConversationId::new();
        let b = ConversationId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_v7_ids_are_time_ordered() {
        let a = ConversationId::new();
        let b = ConversationId::new();
        assert!(a <= b);
    }

    #[test]
    fn test_parse_accepts_hex_and_hyphenated() {
        let id = ConversationId::new();
        assert_eq!(ConversationId::parse(&id.to_hex()).unwrap(), id);
        assert_eq!(ConversationId::parse(&id.to_string()).unwrap(), id);
        assert!(ConversationId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_debug_shows_type_and_short() {
        let id = ConversationId::new();
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("ConversationId("));
        let inner = &debug["ConversationId(".len()..debug.len() - 1];
        assert_eq!(inner.len(), 8);
    }

    #[test]
    fn test_sequence_id_domain() {
        assert!(SequenceId::new(0).is_none());
        assert_eq!(SequenceId::new(1).map(SequenceId::get), Some(1));
        assert!(SequenceId::new(SequenceId::MAX).is_some());
        assert!(SequenceId::new(SequenceId::MAX + 1).is_none());
        assert!(SequenceId::from_i64(-3).is_none());
        assert_eq!(SequenceId::from_i64(42).map(SequenceId::get), Some(42));
    }

    #[test]
    fn test_sequence_id_serde_rejects_zero() {
        assert!(serde_json::from_str::<SequenceId>("0").is_err());
        let seq: SequenceId = serde_json::from_str("7").unwrap();
        assert_eq!(seq.get(), 7);
        assert_eq!(serde_json::to_string(&seq).unwrap(), "7");
    }
}
