//! The feed query surface.
//!
//! [`Feed`] ties a store to its configured limits and exposes the one read
//! operation clients care about, `window`, plus the write side the item
//! creation collaborator needs.

use std::sync::Arc;

use tracing::{debug, warn};

use scrollback_types::{
    Connection, Conversation, ConversationId, FeedError, FeedResult, Message, WindowArgs,
    WindowSpec,
};

use crate::config::FeedConfig;
use crate::store::FeedStore;
use crate::window::resolve_window;

/// A store plus the limits window requests are validated against.
pub struct Feed<S: FeedStore> {
    store: Arc<S>,
    config: FeedConfig,
}

impl<S: FeedStore> Feed<S> {
    pub fn new(store: Arc<S>, config: FeedConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Resolve raw `first`/`after`/`last`/`before` arguments into a connection.
    pub fn window(&self, conversation: ConversationId, args: WindowArgs) -> FeedResult<Connection> {
        let spec = WindowSpec::from_args(args, self.config.max_page_size)?;
        self.resolve(conversation, &spec)
    }

    /// Resolve an already-validated window.
    pub fn resolve(&self, conversation: ConversationId, spec: &WindowSpec) -> FeedResult<Connection> {
        let window = resolve_window(self.store.as_ref(), conversation, spec, self.config.max_page_size)
            .inspect_err(|e| log_failure(conversation, e))?;
        Connection::try_from(window).inspect_err(|e| log_failure(conversation, e))
    }

    /// Append a message; the result carries the assigned sequence id.
    pub fn post_message(
        &self,
        conversation: ConversationId,
        author: &str,
        body: &str,
    ) -> FeedResult<Message> {
        let message = self.store.create_message(conversation, author, body)?;
        debug!(
            conversation = %conversation,
            seq = %message.sequence_id,
            "posted message"
        );
        Ok(message)
    }

    pub fn create_conversation(&self, name: &str) -> FeedResult<Conversation> {
        self.store.create_conversation(name)
    }

    pub fn list_conversations(&self) -> FeedResult<Vec<Conversation>> {
        self.store.list_conversations()
    }
}

fn log_failure(conversation: ConversationId, error: &FeedError) {
    match error {
        FeedError::InvariantViolation(_) | FeedError::Unavailable(_) => {
            warn!(conversation = %conversation, error = %error, "window resolution failed")
        }
        _ => debug!(conversation = %conversation, error = %error, "window request rejected"),
    }
}
