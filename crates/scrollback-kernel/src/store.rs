//! Storage seam for conversation feeds.
//!
//! The window resolver never talks to a backend directly. It asks the store
//! for a [`SnapshotReader`] scoped to one conversation and one consistent
//! snapshot, then issues its page fetch and existence probes through it. Both
//! backends guarantee that a message inserted while the reader is alive is
//! either visible to every call on it or to none.
//!
//! ```text
//!   resolve_window ──read(conv)──▶ FeedStore
//!                                   │ snapshot (txn / read guard)
//!                                   ▼
//!                   SnapshotReader::fetch_ordered(boundary, limit, dir)
//!                   SnapshotReader::exists_beyond(boundary)
//! ```

use scrollback_types::{Conversation, ConversationId, FeedResult, Message, SequenceId};

/// Comparison applied to a message's sequence id against a boundary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum BoundaryOp {
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

impl BoundaryOp {
    /// Whether `seq OP value` holds.
    pub fn matches(self, seq: SequenceId, value: SequenceId) -> bool {
        match self {
            Self::Lt => seq < value,
            Self::Le => seq <= value,
            Self::Gt => seq > value,
            Self::Ge => seq >= value,
        }
    }
}

/// A half-open bound on sequence ids: `seq OP value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub op: BoundaryOp,
    pub value: SequenceId,
}

impl Boundary {
    /// Strictly older than `value`.
    pub fn older_than(value: SequenceId) -> Self {
        Self { op: BoundaryOp::Lt, value }
    }

    /// `value` itself or older.
    pub fn at_or_older(value: SequenceId) -> Self {
        Self { op: BoundaryOp::Le, value }
    }

    /// Strictly newer than `value`.
    pub fn newer_than(value: SequenceId) -> Self {
        Self { op: BoundaryOp::Gt, value }
    }

    /// `value` itself or newer.
    pub fn at_or_newer(value: SequenceId) -> Self {
        Self { op: BoundaryOp::Ge, value }
    }

    pub fn matches(&self, seq: SequenceId) -> bool {
        self.op.matches(seq, self.value)
    }
}

/// Order in which a fetch walks the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    NewestFirst,
    OldestFirst,
}

impl Direction {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::NewestFirst => "DESC",
            Self::OldestFirst => "ASC",
        }
    }
}

/// Reads against one conversation inside one consistent snapshot.
pub trait SnapshotReader {
    /// Up to `limit` messages matching `boundary` (all messages when `None`),
    /// in `direction` order.
    fn fetch_ordered(
        &self,
        boundary: Option<Boundary>,
        limit: u32,
        direction: Direction,
    ) -> FeedResult<Vec<Message>>;

    /// Whether at least one message matches `boundary`.
    ///
    /// Must be a bounded probe (an index seek, `LIMIT 1`), never a page fetch.
    fn exists_beyond(&self, boundary: Boundary) -> FeedResult<bool>;
}

/// A persistent or in-memory home for conversations and their messages.
pub trait FeedStore: Send + Sync {
    /// Create an empty conversation.
    fn create_conversation(&self, name: &str) -> FeedResult<Conversation>;

    /// All conversations, newest first.
    fn list_conversations(&self) -> FeedResult<Vec<Conversation>>;

    /// Append a message, assigning the next sequence id.
    ///
    /// Fails with `NotFound` when the conversation does not exist.
    fn create_message(
        &self,
        conversation: ConversationId,
        author: &str,
        body: &str,
    ) -> FeedResult<Message>;

    /// Run `f` against a snapshot of `conversation`.
    ///
    /// Fails with `NotFound` (without calling `f`) when the conversation does
    /// not exist.
    fn read<R>(
        &self,
        conversation: ConversationId,
        f: impl FnOnce(&dyn SnapshotReader) -> FeedResult<R>,
    ) -> FeedResult<R>;
}
