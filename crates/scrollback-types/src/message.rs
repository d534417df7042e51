//! Conversations and the messages they order.

use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, SequenceId};

/// Conversation metadata. Messages are stored and paginated separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub name: String,
    /// Unix millis.
    pub created_at: u64,
}

impl Conversation {
    /// Create a new conversation with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            name: name.into(),
            created_at: crate::now_millis(),
        }
    }
}

/// A single message in a conversation feed.
///
/// `sequence_id` is assigned by the store and is the only ordering key:
/// newer messages have strictly greater ids within their conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub conversation_id: ConversationId,
    pub sequence_id: SequenceId,
    pub author: String,
    pub body: String,
    /// Unix millis.
    pub created_at: u64,
}

impl Message {
    /// Build a message with an already-assigned sequence id.
    pub fn new(
        conversation_id: ConversationId,
        sequence_id: SequenceId,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            sequence_id,
            author: author.into(),
            body: body.into(),
            created_at: crate::now_millis(),
        }
    }
}
