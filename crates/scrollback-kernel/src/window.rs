//! Window resolution: a window request in, a bounded ordered slice out.
//!
//! Forward windows (`first`/`after`) walk from just below the `after` cursor
//! toward older messages. Backward windows (`last`/`before`) walk from just
//! above the `before` cursor toward newer messages and are reversed before
//! returning, so callers always see newest first.
//!
//! The two page-info flags come from existence probes, not from fetching an
//! extra row: `hasNextPage` asks "is anything older than what I returned?",
//! `hasPreviousPage` asks "is anything newer?". All of it happens inside one
//! [`FeedStore::read`] so a concurrent insert cannot split the answer.

use tracing::debug;

use scrollback_types::{cursor, ConversationId, FeedError, FeedResult, Message, SequenceId, WindowSpec};

use crate::store::{Boundary, Direction, FeedStore, SnapshotReader};

/// A resolved window, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub items: Vec<Message>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

/// Resolve `spec` against `conversation`.
///
/// Fails with `InvalidArgument` for a zero or oversized count, `InvalidCursor`
/// when the cursor does not decode, `NotFound` for an unknown conversation.
pub fn resolve_window<S: FeedStore>(
    store: &S,
    conversation: ConversationId,
    spec: &WindowSpec,
    max_page_size: u32,
) -> FeedResult<Window> {
    let count = spec.count();
    if count == 0 || count > max_page_size {
        return Err(FeedError::invalid_argument(format!(
            "window size must be within 1..={max_page_size}, got {count}"
        )));
    }
    let boundary = spec.cursor().map(cursor::decode).transpose()?;

    let window = store.read(conversation, |reader| match spec {
        WindowSpec::Forward { .. } => forward(reader, count, boundary),
        WindowSpec::Backward { .. } => backward(reader, count, boundary),
    })?;

    if window.items.len() > count as usize {
        return Err(FeedError::invariant(format!(
            "store returned {} items for a window of {count}",
            window.items.len()
        )));
    }

    debug!(
        conversation = %conversation,
        count,
        returned = window.items.len(),
        has_previous_page = window.has_previous_page,
        has_next_page = window.has_next_page,
        "resolved window"
    );
    Ok(window)
}

fn forward(
    reader: &dyn SnapshotReader,
    first: u32,
    after: Option<SequenceId>,
) -> FeedResult<Window> {
    let items = reader.fetch_ordered(after.map(Boundary::older_than), first, Direction::NewestFirst)?;

    let has_next_page = match items.last() {
        Some(oldest) => reader.exists_beyond(Boundary::older_than(oldest.sequence_id))?,
        None => false,
    };
    // A cursor implies a previous page, as long as its item (or anything
    // newer) actually exists.
    let has_previous_page = match after {
        Some(b) => reader.exists_beyond(Boundary::at_or_newer(b))?,
        None => false,
    };

    Ok(Window { items, has_previous_page, has_next_page })
}

fn backward(
    reader: &dyn SnapshotReader,
    last: u32,
    before: Option<SequenceId>,
) -> FeedResult<Window> {
    let mut items =
        reader.fetch_ordered(before.map(Boundary::newer_than), last, Direction::OldestFirst)?;

    // Still oldest-first here, so the newest fetched item is at the end.
    let has_previous_page = match items.last() {
        Some(newest) => reader.exists_beyond(Boundary::newer_than(newest.sequence_id))?,
        None => false,
    };
    let has_next_page = match before {
        Some(b) => reader.exists_beyond(Boundary::at_or_older(b))?,
        None => false,
    };

    items.reverse();
    Ok(Window { items, has_previous_page, has_next_page })
}
