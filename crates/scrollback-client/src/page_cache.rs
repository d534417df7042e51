//! Client-side page cache for one conversation view.
//!
//! Holds a single contiguous run of edges, newest first, plus the two
//! page-info flags describing what lies beyond each end of the run. The merge
//! policy lives here as plain methods so it can be unit tested without any
//! async machinery; [`FeedView`](crate::FeedView) owns one and serializes
//! calls into it.
//!
//! # State Machine
//!
//! ```text
//! +----------------+
//! |     Empty      | no edges, no flags
//! +-------+--------+
//!         | apply_initial() / apply_refresh()
//!         v
//! +----------------+  apply_older()   (append below oldest edge)
//! |     Loaded     |  apply_refresh() (stitch onto run, or replace it)
//! |                |  insert_local()  (prepend above newest edge)
//! +----------------+
//! ```
//!
//! Every method either applies its whole change or leaves the cache exactly
//! as it was. Every successful mutation bumps the version counter.

use std::collections::HashSet;

use tracing::{debug, warn};

use scrollback_types::{cursor, Connection, Cursor, Edge, FeedError, FeedResult, Message, WindowSpec};

/// Whether the view has completed its first fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheState {
    #[default]
    Empty,
    Loaded,
}

/// Which branch of the merge policy a call took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First window installed.
    Loaded { count: usize },
    /// Older edges appended below the run.
    Extended { added: usize },
    /// Refreshed window overlapped the run; `kept` cached edges survive below it.
    Stitched { kept: usize },
    /// No overlap: the run was discarded in favor of the refreshed window.
    Replaced,
    /// A locally created message was prepended.
    Inserted,
    /// Nothing changed (see reason).
    Unchanged { reason: UnchangedReason },
    /// A newer refresh was issued while this one was in flight; its result
    /// was dropped.
    Superseded,
}

/// Why a call left the cache untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnchangedReason {
    /// The first page has not been loaded yet.
    NotLoaded,
    /// The first page is already loaded; use refresh instead.
    AlreadyLoaded,
    /// The last known `hasNextPage` was false, so no request was made.
    AtEnd,
    /// The run's oldest edge moved while the fetch was in flight.
    StaleAnchor,
    /// An edge with this cursor is already cached.
    DuplicateCursor,
    /// The message is not newer than the newest cached edge.
    NotNewer,
}

/// Immutable copy of the cache handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheSnapshot {
    pub state: CacheState,
    pub edges: Vec<Edge>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub version: u64,
}

impl CacheSnapshot {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Messages newest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.edges.iter().map(|e| &e.node)
    }
}

/// One contiguous newest-first run of edges and its page info.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    state: CacheState,
    edges: Vec<Edge>,
    has_previous_page: bool,
    has_next_page: bool,
    /// Count of the first page, reused by refresh.
    first_count: Option<u32>,
    version: u64,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn has_previous_page(&self) -> bool {
        self.has_previous_page
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    /// Version counter (bumped on every successful mutation).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Count used for the first page, if one has been loaded.
    pub fn first_count(&self) -> Option<u32> {
        self.first_count
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            state: self.state,
            edges: self.edges.clone(),
            has_previous_page: self.has_previous_page,
            has_next_page: self.has_next_page,
            version: self.version,
        }
    }

    /// The request `loadOlder` should issue, or why it should issue none.
    pub fn plan_older(&self, count: u32) -> Result<WindowSpec, UnchangedReason> {
        if self.state == CacheState::Empty {
            return Err(UnchangedReason::NotLoaded);
        }
        if !self.has_next_page {
            return Err(UnchangedReason::AtEnd);
        }
        match self.edges.last() {
            Some(oldest) => Ok(WindowSpec::older_than(count, oldest.cursor.clone())),
            None => Err(UnchangedReason::AtEnd),
        }
    }

    /// The request `refresh` should issue: the newest end, first page's count.
    pub fn plan_refresh(&self, default_count: u32) -> WindowSpec {
        WindowSpec::newest(self.first_count.unwrap_or(default_count))
    }

    /// Install the first window fetched with `first = count` and no cursor.
    pub fn apply_initial(&mut self, count: u32, window: Connection) -> FeedResult<MergeOutcome> {
        if self.state == CacheState::Loaded {
            return Ok(MergeOutcome::Unchanged { reason: UnchangedReason::AlreadyLoaded });
        }
        check_run(&window.edges)?;

        let loaded = window.edges.len();
        self.install(window);
        self.first_count = Some(count);
        debug!(edges = loaded, version = self.version, "loaded first page");
        Ok(MergeOutcome::Loaded { count: loaded })
    }

    /// Append an older window fetched with `after = anchor`.
    ///
    /// `anchor` must still be the run's oldest cursor; otherwise the result
    /// belongs to a run that no longer exists and is dropped.
    pub fn apply_older(&mut self, anchor: &Cursor, window: Connection) -> FeedResult<MergeOutcome> {
        let Some(oldest) = self.edges.last() else {
            return Ok(MergeOutcome::Unchanged { reason: UnchangedReason::NotLoaded });
        };
        if &oldest.cursor != anchor {
            warn!(anchor = %anchor, "older page anchor no longer at end of run, dropping");
            return Ok(MergeOutcome::Unchanged { reason: UnchangedReason::StaleAnchor });
        }
        check_run(&window.edges)?;
        if let Some(first) = window.edges.first() {
            if first.node.sequence_id >= oldest.node.sequence_id {
                return Err(FeedError::invariant(format!(
                    "older page starts at {} which is not older than cached {}",
                    first.node.sequence_id, oldest.node.sequence_id
                )));
            }
        }

        let added = window.edges.len();
        self.edges.extend(window.edges);
        self.has_next_page = window.page_info.has_next_page;
        self.bump();
        debug!(added, total = self.edges.len(), has_next_page = self.has_next_page, "extended run");
        Ok(MergeOutcome::Extended { added })
    }

    /// Merge a window refetched from the newest end.
    ///
    /// When the window's oldest cursor is in the run, the result is the window
    /// followed by the cached edges older than that match, keeping the cached
    /// far-end `hasNextPage`. Otherwise the run is replaced by the window
    /// alone, so the cache never holds a silent gap.
    ///
    /// Either way, cached edges newer than the window's newest edge stay on
    /// top. Those can only be local inserts made after the window was
    /// resolved.
    pub fn apply_refresh(&mut self, window: Connection) -> FeedResult<MergeOutcome> {
        check_run(&window.edges)?;

        if self.state == CacheState::Empty {
            let loaded = window.edges.len();
            self.install(window);
            return Ok(MergeOutcome::Loaded { count: loaded });
        }

        let head = self.newer_than_window(&window);

        let overlap = window
            .edges
            .last()
            .and_then(|oldest| self.edges.iter().position(|e| e.cursor == oldest.cursor));

        let Some(i) = overlap else {
            debug!(
                cached = self.edges.len(),
                fetched = window.edges.len(),
                kept_local = head.len(),
                "refresh found no overlap, replacing run"
            );
            let mut edges = head;
            edges.extend(window.edges);
            check_run(&edges)?;
            self.edges = edges;
            self.has_previous_page = window.page_info.has_previous_page;
            self.has_next_page = window.page_info.has_next_page;
            self.bump();
            return Ok(MergeOutcome::Replaced);
        };

        let fresh: HashSet<&Cursor> = window.edges.iter().map(|e| &e.cursor).collect();
        let tail: Vec<Edge> = self.edges[i + 1..]
            .iter()
            .filter(|e| !fresh.contains(&e.cursor))
            .cloned()
            .collect();
        let kept = tail.len();

        let mut edges = head;
        edges.extend(window.edges);
        edges.extend(tail);
        check_run(&edges)?;

        self.edges = edges;
        self.has_previous_page = window.page_info.has_previous_page;
        // has_next_page describes the far end, which the cache still owns.
        self.bump();
        debug!(kept, total = self.edges.len(), "stitched refresh onto run");
        Ok(MergeOutcome::Stitched { kept })
    }

    /// Leading cached edges strictly newer than the window's newest edge.
    /// Empty when the window itself is empty.
    fn newer_than_window(&self, window: &Connection) -> Vec<Edge> {
        let Some(newest) = window.edges.first() else {
            return Vec::new();
        };
        self.edges
            .iter()
            .take_while(|e| e.node.sequence_id > newest.node.sequence_id)
            .cloned()
            .collect()
    }

    /// Prepend a message this client just created.
    pub fn insert_local(&mut self, message: Message) -> MergeOutcome {
        if self.state == CacheState::Empty {
            return MergeOutcome::Unchanged { reason: UnchangedReason::NotLoaded };
        }
        let edge = Edge { cursor: cursor::encode(message.sequence_id), node: message };
        if self.edges.iter().any(|e| e.cursor == edge.cursor) {
            return MergeOutcome::Unchanged { reason: UnchangedReason::DuplicateCursor };
        }
        let not_newer = self
            .edges
            .first()
            .is_some_and(|newest| edge.node.sequence_id <= newest.node.sequence_id);
        if not_newer {
            return MergeOutcome::Unchanged { reason: UnchangedReason::NotNewer };
        }

        self.edges.insert(0, edge);
        self.bump();
        MergeOutcome::Inserted
    }

    fn install(&mut self, window: Connection) {
        self.edges = window.edges;
        self.has_previous_page = window.page_info.has_previous_page;
        self.has_next_page = window.page_info.has_next_page;
        self.state = CacheState::Loaded;
        self.bump();
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// A run is valid when it is strictly newest first and every cursor decodes
/// to its own node's sequence id (which also makes cursors unique).
fn check_run(edges: &[Edge]) -> FeedResult<()> {
    for edge in edges {
        let decoded = cursor::decode(&edge.cursor)
            .map_err(|e| FeedError::invariant(format!("edge carries undecodable cursor: {e}")))?;
        if decoded != edge.node.sequence_id {
            return Err(FeedError::invariant(format!(
                "cursor for {} decodes to {decoded}",
                edge.node.sequence_id
            )));
        }
    }
    if let Some(pair) = edges.windows(2).find(|p| p[0].node.sequence_id <= p[1].node.sequence_id) {
        return Err(FeedError::invariant(format!(
            "run not strictly newest first: {} then {}",
            pair[0].node.sequence_id, pair[1].node.sequence_id
        )));
    }
    Ok(())
}
