//! Async view over one conversation's feed.
//!
//! [`FeedView`] owns a [`PageCache`] and is its only writer. Fetches go
//! through a [`WindowSource`]; the cache lock is never held across an await,
//! so `insert_local` and `snapshot` stay responsive while a fetch is out.
//!
//! # Concurrency
//!
//! At most one fetch is in flight per view:
//!
//! | in flight \ call | `load_first` | `load_older` | `refresh`    |
//! |------------------|--------------|--------------|--------------|
//! | nothing          | runs         | runs         | runs         |
//! | first page       | `Busy`       | `Busy`       | `Busy`       |
//! | older page       | `Busy`       | `Busy`       | `Busy`       |
//! | refresh          | `Busy`       | `Busy`       | supersedes   |
//!
//! A superseded refresh still completes its fetch, but its result is dropped
//! and the call returns [`MergeOutcome::Superseded`].
//!
//! Observers get immutable [`CacheSnapshot`]s through a `watch` channel; a new
//! snapshot is published after every mutation.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use scrollback_types::{ConversationId, FeedError, FeedResult, Message, WindowSpec};

use crate::constants::ViewConfig;
use crate::page_cache::{CacheSnapshot, CacheState, MergeOutcome, PageCache, UnchangedReason};
use crate::source::WindowSource;

/// Which fetch currently owns the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Idle,
    First,
    Older,
    Refresh,
}

#[derive(Debug)]
struct ViewState {
    cache: PageCache,
    in_flight: InFlight,
    /// Bumped whenever a fetch starts. A fetch whose generation is no longer
    /// current has been superseded.
    generation: u64,
}

/// Clears `in_flight` when the fetch that set it ends, including when its
/// future is dropped mid-await.
struct FetchGuard<'a> {
    state: &'a Mutex<ViewState>,
    generation: u64,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.generation == self.generation {
            state.in_flight = InFlight::Idle;
        }
    }
}

/// A paginated, locally cached view over one conversation.
pub struct FeedView {
    source: Arc<dyn WindowSource>,
    conversation: ConversationId,
    config: ViewConfig,
    state: Mutex<ViewState>,
    snapshot_tx: watch::Sender<Arc<CacheSnapshot>>,
}

impl FeedView {
    pub fn new(source: Arc<dyn WindowSource>, conversation: ConversationId, config: ViewConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(CacheSnapshot::default()));
        Self {
            source,
            conversation,
            config,
            state: Mutex::new(ViewState {
                cache: PageCache::new(),
                in_flight: InFlight::Idle,
                generation: 0,
            }),
            snapshot_tx,
        }
    }

    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receive a new snapshot after every cache mutation.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Fetch the newest page into an empty cache.
    pub async fn load_first(&self) -> FeedResult<MergeOutcome> {
        let count = self.config.page_size;
        let generation = {
            let mut state = self.state.lock();
            if state.in_flight != InFlight::Idle {
                return Err(busy(state.in_flight, InFlight::First));
            }
            if state.cache.state() == CacheState::Loaded {
                return Ok(MergeOutcome::Unchanged { reason: UnchangedReason::AlreadyLoaded });
            }
            start(&mut state, InFlight::First)
        };
        let _guard = FetchGuard { state: &self.state, generation };

        let window = self
            .source
            .fetch(self.conversation, WindowSpec::newest(count))
            .await
            .inspect_err(|e| self.log_fetch_failure("load_first", e))?;

        self.apply(|cache| cache.apply_initial(count, window))
    }

    /// Extend the run below its oldest edge.
    ///
    /// Makes no request when the last known `hasNextPage` was false. A failed
    /// fetch leaves the cache as it was, still reporting more available.
    pub async fn load_older(&self) -> FeedResult<MergeOutcome> {
        let (spec, generation) = {
            let mut state = self.state.lock();
            if state.in_flight != InFlight::Idle {
                return Err(busy(state.in_flight, InFlight::Older));
            }
            let spec = match state.cache.plan_older(self.config.page_size) {
                Ok(spec) => spec,
                Err(reason) => {
                    debug!(conversation = %self.conversation, ?reason, "load_older skipped");
                    return Ok(MergeOutcome::Unchanged { reason });
                }
            };
            (spec, start(&mut state, InFlight::Older))
        };
        let _guard = FetchGuard { state: &self.state, generation };

        let Some(anchor) = spec.cursor().cloned() else {
            return Err(FeedError::invariant("older page planned without a cursor"));
        };
        let window = self
            .source
            .fetch(self.conversation, spec)
            .await
            .inspect_err(|e| self.log_fetch_failure("load_older", e))?;

        self.apply(|cache| cache.apply_older(&anchor, window))
    }

    /// Refetch the newest end with the first page's count and merge it in.
    ///
    /// Issuing another refresh before this one completes supersedes it.
    pub async fn refresh(&self) -> FeedResult<MergeOutcome> {
        let (spec, generation) = {
            let mut state = self.state.lock();
            if !matches!(state.in_flight, InFlight::Idle | InFlight::Refresh) {
                return Err(busy(state.in_flight, InFlight::Refresh));
            }
            if state.in_flight == InFlight::Refresh {
                debug!(conversation = %self.conversation, "superseding in-flight refresh");
            }
            let spec = state.cache.plan_refresh(self.config.page_size);
            (spec, start(&mut state, InFlight::Refresh))
        };
        let _guard = FetchGuard { state: &self.state, generation };

        let result = self.source.fetch(self.conversation, spec).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            info!(conversation = %self.conversation, "refresh superseded, dropping result");
            return Ok(MergeOutcome::Superseded);
        }
        let window = result.inspect_err(|e| self.log_fetch_failure("refresh", e))?;
        let outcome = state.cache.apply_refresh(window)?;
        self.publish(&state.cache);
        Ok(outcome)
    }

    /// Prepend a message this client just created.
    ///
    /// Allowed at any time, including while a fetch is in flight.
    pub fn insert_local(&self, message: Message) -> FeedResult<MergeOutcome> {
        if message.conversation_id != self.conversation {
            return Err(FeedError::invalid_argument(format!(
                "message belongs to {}, view is over {}",
                message.conversation_id, self.conversation
            )));
        }
        let mut state = self.state.lock();
        let outcome = state.cache.insert_local(message);
        if outcome == MergeOutcome::Inserted {
            self.publish(&state.cache);
        }
        Ok(outcome)
    }

    /// Run a merge against the cache and publish if it changed anything.
    fn apply(
        &self,
        merge: impl FnOnce(&mut PageCache) -> FeedResult<MergeOutcome>,
    ) -> FeedResult<MergeOutcome> {
        let mut state = self.state.lock();
        let version = state.cache.version();
        let outcome = merge(&mut state.cache)?;
        if state.cache.version() != version {
            self.publish(&state.cache);
        }
        Ok(outcome)
    }

    fn publish(&self, cache: &PageCache) {
        self.snapshot_tx.send_replace(Arc::new(cache.snapshot()));
    }

    fn log_fetch_failure(&self, op: &str, error: &FeedError) {
        warn!(
            conversation = %self.conversation,
            op,
            retryable = error.is_retryable(),
            error = %error,
            "fetch failed, cache unchanged"
        );
    }
}

fn start(state: &mut ViewState, kind: InFlight) -> u64 {
    state.generation = state.generation.wrapping_add(1);
    state.in_flight = kind;
    state.generation
}

fn busy(current: InFlight, requested: InFlight) -> FeedError {
    FeedError::busy(format!("{requested:?} requested while {current:?} in flight"))
}
