//! Turn a resolved window into a wire [`Connection`].

use scrollback_types::{cursor, Connection, Edge, FeedError, FeedResult, Message, PageInfo};

use crate::window::Window;

/// Pair each item with its cursor and attach page info.
///
/// Items must be strictly newest first and all belong to one conversation;
/// anything else is an `InvariantViolation` rather than a silently wrong page.
pub fn assemble(
    items: Vec<Message>,
    has_previous_page: bool,
    has_next_page: bool,
) -> FeedResult<Connection> {
    for pair in items.windows(2) {
        let (newer, older) = (&pair[0], &pair[1]);
        if newer.sequence_id <= older.sequence_id {
            return Err(FeedError::invariant(format!(
                "window not strictly descending: {} before {}",
                newer.sequence_id, older.sequence_id
            )));
        }
        if newer.conversation_id != older.conversation_id {
            return Err(FeedError::invariant(format!(
                "window mixes conversations {} and {}",
                newer.conversation_id, older.conversation_id
            )));
        }
    }

    let edges: Vec<Edge> = items
        .into_iter()
        .map(|node| Edge { cursor: cursor::encode(node.sequence_id), node })
        .collect();

    let page_info = PageInfo {
        has_previous_page,
        has_next_page,
        start_cursor: edges.first().map(|e| e.cursor.clone()),
        end_cursor: edges.last().map(|e| e.cursor.clone()),
    };

    Ok(Connection { edges, page_info })
}

impl TryFrom<Window> for Connection {
    type Error = FeedError;

    fn try_from(window: Window) -> FeedResult<Self> {
        assemble(window.items, window.has_previous_page, window.has_next_page)
    }
}
