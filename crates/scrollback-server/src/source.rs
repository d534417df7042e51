//! In-process window source backed by a [`Feed`].

use std::sync::Arc;

use async_trait::async_trait;

use scrollback_client::WindowSource;
use scrollback_kernel::{Feed, FeedStore};
use scrollback_types::{Connection, ConversationId, FeedError, FeedResult, WindowSpec};

/// Serves a [`FeedView`](scrollback_client::FeedView) straight from a local
/// feed. Store reads are blocking, so each fetch runs on the blocking pool.
pub struct LocalSource<S: FeedStore + 'static> {
    feed: Arc<Feed<S>>,
}

impl<S: FeedStore + 'static> LocalSource<S> {
    pub fn new(feed: Arc<Feed<S>>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl<S: FeedStore + 'static> WindowSource for LocalSource<S> {
    async fn fetch(&self, conversation: ConversationId, spec: WindowSpec) -> FeedResult<Connection> {
        let feed = Arc::clone(&self.feed);
        tokio::task::spawn_blocking(move || feed.resolve(conversation, &spec))
            .await
            .map_err(|e| FeedError::unavailable(format!("window task failed: {e}")))?
    }
}
