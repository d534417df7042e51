//! In-memory feed store.
//!
//! Used for tests and ephemeral sessions. All data is lost when dropped.
//!
//! # Concurrency Model
//!
//! - DashMap for per-conversation concurrent access
//! - A reader holds the conversation's shard read guard for its whole
//!   lifetime, so appends to that conversation wait until it is done
//! - Reads of different conversations, and concurrent reads of the same
//!   conversation, proceed in parallel

use dashmap::DashMap;
use tracing::debug;

use scrollback_types::{
    Conversation, ConversationId, FeedError, FeedResult, Message, SequenceId,
};

use crate::store::{Boundary, BoundaryOp, Direction, FeedStore, SnapshotReader};

/// One conversation's metadata plus its messages, oldest first.
#[derive(Debug)]
struct ConversationLog {
    conversation: Conversation,
    messages: Vec<Message>,
    last_seq: u64,
}

impl ConversationLog {
    /// Messages matching `boundary`, still oldest first.
    fn matching(&self, boundary: Option<Boundary>) -> &[Message] {
        let Some(b) = boundary else {
            return &self.messages;
        };
        let below = |strict: bool| {
            self.messages.partition_point(|m| {
                if strict { m.sequence_id < b.value } else { m.sequence_id <= b.value }
            })
        };
        match b.op {
            BoundaryOp::Lt => &self.messages[..below(true)],
            BoundaryOp::Le => &self.messages[..below(false)],
            BoundaryOp::Gt => &self.messages[below(false)..],
            BoundaryOp::Ge => &self.messages[below(true)..],
        }
    }
}

impl SnapshotReader for ConversationLog {
    fn fetch_ordered(
        &self,
        boundary: Option<Boundary>,
        limit: u32,
        direction: Direction,
    ) -> FeedResult<Vec<Message>> {
        let slice = self.matching(boundary);
        let limit = limit as usize;
        let page = match direction {
            Direction::NewestFirst => slice.iter().rev().take(limit).cloned().collect(),
            Direction::OldestFirst => slice.iter().take(limit).cloned().collect(),
        };
        Ok(page)
    }

    fn exists_beyond(&self, boundary: Boundary) -> FeedResult<bool> {
        Ok(!self.matching(Some(boundary)).is_empty())
    }
}

/// In-memory feed store.
#[derive(Debug, Default)]
pub struct MemoryFeedStore {
    conversations: DashMap<ConversationId, ConversationLog>,
}

impl MemoryFeedStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeedStore for MemoryFeedStore {
    fn create_conversation(&self, name: &str) -> FeedResult<Conversation> {
        let conversation = Conversation::new(name);
        self.conversations.insert(
            conversation.id,
            ConversationLog {
                conversation: conversation.clone(),
                messages: Vec::new(),
                last_seq: 0,
            },
        );
        debug!(conversation = %conversation.id, "created conversation");
        Ok(conversation)
    }

    fn list_conversations(&self) -> FeedResult<Vec<Conversation>> {
        let mut all: Vec<Conversation> = self
            .conversations
            .iter()
            .map(|entry| entry.conversation.clone())
            .collect();
        // UUIDv7 ids sort by creation time
        all.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(all)
    }

    fn create_message(
        &self,
        conversation: ConversationId,
        author: &str,
        body: &str,
    ) -> FeedResult<Message> {
        let mut log = self
            .conversations
            .get_mut(&conversation)
            .ok_or(FeedError::NotFound(conversation))?;

        let sequence_id = SequenceId::new(log.last_seq + 1)
            .ok_or_else(|| FeedError::invariant("sequence id space exhausted"))?;
        let message = Message::new(conversation, sequence_id, author, body);
        log.last_seq = sequence_id.get();
        log.messages.push(message.clone());
        Ok(message)
    }

    fn read<R>(
        &self,
        conversation: ConversationId,
        f: impl FnOnce(&dyn SnapshotReader) -> FeedResult<R>,
    ) -> FeedResult<R> {
        let log = self
            .conversations
            .get(&conversation)
            .ok_or(FeedError::NotFound(conversation))?;
        f(&*log)
    }
}
