//! Where a view gets its windows from.

use async_trait::async_trait;

use scrollback_types::{Connection, ConversationId, FeedResult, WindowSpec};

/// Resolves window requests on behalf of a [`FeedView`](crate::FeedView).
///
/// Implementations wrap whatever actually talks to the server: an RPC client,
/// or an in-process `Feed` for local use and tests.
#[async_trait]
pub trait WindowSource: Send + Sync {
    async fn fetch(&self, conversation: ConversationId, spec: WindowSpec) -> FeedResult<Connection>;
}
