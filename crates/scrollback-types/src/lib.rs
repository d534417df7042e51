//! Shared types for scrollback.
//!
//! A leaf crate with **no internal scrollback dependencies**: typed ids,
//! messages, the cursor codec, window requests, connection responses, and the
//! error taxonomy. The kernel (server side) and client crates both build on it.
//!
//! # Key Types
//!
//! |------------------|------------------------------------------------|
//! | Type             | Purpose                                        |
//! |------------------|------------------------------------------------|
//! | [`ConversationId`] | Which conversation (UUIDv7)                  |
//! | [`SequenceId`]   | Ordering key of a message in its conversation  |
//! | [`Message`]      | A feed item                                    |
//! | [`Cursor`]       | Opaque token, 1:1 with a `SequenceId`          |
//! | [`WindowSpec`]   | Validated `first`/`after` or `last`/`before`   |
//! | [`Connection`]   | Edges (newest first) + [`PageInfo`]            |
//! | [`FeedError`]    | NotFound / InvalidArgument / InvalidCursor / … |
//! |------------------|------------------------------------------------|

pub mod cursor;
pub mod error;
pub mod ids;
pub mod message;
pub mod page;

pub use cursor::Cursor;
pub use error::{FeedError, FeedResult};
pub use ids::{ConversationId, SequenceId};
pub use message::{Conversation, Message};
pub use page::{Connection, Edge, PageInfo, WindowArgs, WindowSpec};

/// Current time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
