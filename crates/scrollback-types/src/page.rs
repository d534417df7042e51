//! Relay-style window requests and connection responses.
//!
//! A client asks for a bounded window with `first`/`after` (toward older
//! messages) or `last`/`before` (toward newer messages) and receives a
//! [`Connection`]: edges newest-first plus a [`PageInfo`] saying whether more
//! messages exist past either end.

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::error::{FeedError, FeedResult};
use crate::message::Message;

/// Raw window arguments as they arrive from a caller, before validation.
///
/// Counts are signed so that `first=-1` is representable and rejected with
/// `InvalidArgument` instead of failing to parse somewhere upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowArgs {
    pub first: Option<i64>,
    pub after: Option<Cursor>,
    pub last: Option<i64>,
    pub before: Option<Cursor>,
}

impl WindowArgs {
    /// `first: count` with no cursor.
    pub fn first(count: i64) -> Self {
        Self { first: Some(count), ..Self::default() }
    }

    /// `last: count` with no cursor.
    pub fn last(count: i64) -> Self {
        Self { last: Some(count), ..Self::default() }
    }

    pub fn after(mut self, cursor: Cursor) -> Self {
        self.after = Some(cursor);
        self
    }

    pub fn before(mut self, cursor: Cursor) -> Self {
        self.before = Some(cursor);
        self
    }
}

/// A validated window request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSpec {
    /// Newest-to-oldest from just below `after` (or from the newest message).
    Forward { first: u32, after: Option<Cursor> },
    /// Oldest-to-newest from just above `before` (or from the oldest message).
    Backward { last: u32, before: Option<Cursor> },
}

impl WindowSpec {
    /// Validate raw arguments against the configured page size ceiling.
    ///
    /// Cursors are carried through undecoded; the resolver decodes them so a
    /// bad cursor surfaces as `InvalidCursor`, not `InvalidArgument`.
    pub fn from_args(args: WindowArgs, max_page_size: u32) -> FeedResult<Self> {
        let WindowArgs { first, after, last, before } = args;
        match (first, last) {
            (Some(_), Some(_)) => Err(FeedError::invalid_argument(
                "`first` and `last` are mutually exclusive",
            )),
            (None, None) => Err(FeedError::invalid_argument(
                "one of `first` or `last` is required",
            )),
            (Some(first), None) => {
                if before.is_some() {
                    return Err(FeedError::invalid_argument("`before` cannot be used with `first`"));
                }
                let first = validate_count("first", first, max_page_size)?;
                Ok(Self::Forward { first, after })
            }
            (None, Some(last)) => {
                if after.is_some() {
                    return Err(FeedError::invalid_argument("`after` cannot be used with `last`"));
                }
                let last = validate_count("last", last, max_page_size)?;
                Ok(Self::Backward { last, before })
            }
        }
    }

    /// Forward window from the newest end.
    pub fn newest(count: u32) -> Self {
        Self::Forward { first: count, after: None }
    }

    /// Forward window continuing below `cursor`.
    pub fn older_than(count: u32, cursor: Cursor) -> Self {
        Self::Forward { first: count, after: Some(cursor) }
    }

    pub fn count(&self) -> u32 {
        match self {
            Self::Forward { first, .. } => *first,
            Self::Backward { last, .. } => *last,
        }
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        match self {
            Self::Forward { after, .. } => after.as_ref(),
            Self::Backward { before, .. } => before.as_ref(),
        }
    }
}

fn validate_count(name: &str, count: i64, max: u32) -> FeedResult<u32> {
    if count < 1 {
        return Err(FeedError::invalid_argument(format!(
            "`{name}` must be positive, got {count}"
        )));
    }
    if count > i64::from(max) {
        return Err(FeedError::invalid_argument(format!(
            "`{name}` must be at most {max}, got {count}"
        )));
    }
    Ok(count as u32)
}

/// One message paired with its cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub node: Message,
    pub cursor: Cursor,
}

/// Existence of messages beyond the two ends of a window or cached run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Newer messages exist above the first edge.
    pub has_previous_page: bool,
    /// Older messages exist below the last edge.
    pub has_next_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<Cursor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<Cursor>,
}

/// A window of edges, newest first, plus page info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
}

impl Connection {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Iterate the messages in edge order.
    pub fn nodes(&self) -> impl Iterator<Item = &Message> {
        self.edges.iter().map(|e| &e.node)
    }
}
