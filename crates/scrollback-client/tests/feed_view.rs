//! FeedView behavior against an in-process feed.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use scrollback_client::{CacheState, FeedView, MergeOutcome, UnchangedReason, ViewConfig, WindowSource};
use scrollback_kernel::{Feed, FeedConfig, MemoryFeedStore};
use scrollback_types::{Connection, ConversationId, FeedError, FeedResult, Message, WindowSpec};

// ============================================================================
// Sources
// ============================================================================

/// Answers from a real feed, optionally failing, optionally gated.
struct TestSource {
    feed: Feed<MemoryFeedStore>,
    fail: AtomicBool,
    calls: AtomicUsize,
    /// When set, every fetch waits for one permit before answering.
    gate: Option<Semaphore>,
    waiting: AtomicUsize,
    /// Resolve the window before waiting at the gate, so the answer reflects
    /// the store when the request arrived rather than when it is delivered.
    resolve_early: AtomicBool,
}

impl TestSource {
    fn new(gated: bool) -> Self {
        Self {
            feed: Feed::new(Arc::new(MemoryFeedStore::new()), FeedConfig::default()),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            gate: gated.then(|| Semaphore::new(0)),
            waiting: AtomicUsize::new(0),
            resolve_early: AtomicBool::new(false),
        }
    }

    fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    async fn wait_for_waiters(&self, n: usize) {
        while self.waiting.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WindowSource for TestSource {
    async fn fetch(&self, conversation: ConversationId, spec: WindowSpec) -> FeedResult<Connection> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let early = self
            .resolve_early
            .load(Ordering::SeqCst)
            .then(|| self.feed.resolve(conversation, &spec));
        if let Some(gate) = &self.gate {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            gate.acquire().await.unwrap().forget();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedError::unavailable("connection reset"));
        }
        // Otherwise resolve after the gate so the window reflects the store
        // at answer time.
        early.unwrap_or_else(|| self.feed.resolve(conversation, &spec))
    }
}

struct Fixture {
    source: Arc<TestSource>,
    conversation: ConversationId,
}

impl Fixture {
    fn new(items: usize, gated: bool) -> Self {
        let source = Arc::new(TestSource::new(gated));
        let conversation = source.feed.create_conversation("chat").unwrap().id;
        let fixture = Self { source, conversation };
        fixture.post(items);
        fixture
    }

    fn post(&self, n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| self.source.feed.post_message(self.conversation, "amy", &format!("msg {i}")).unwrap())
            .collect()
    }

    fn view(&self, page_size: u32) -> Arc<FeedView> {
        Arc::new(FeedView::new(
            self.source.clone(),
            self.conversation,
            ViewConfig::with_page_size(page_size),
        ))
    }
}

fn seqs(view: &FeedView) -> Vec<u64> {
    view.snapshot().messages().map(|m| m.sequence_id.get()).collect()
}

fn range(hi: u64, lo: u64) -> Vec<u64> {
    (lo..=hi).rev().collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_walk_to_oldest_end() {
    let fx = Fixture::new(50, false);
    let view = fx.view(10);

    assert_eq!(view.load_first().await.unwrap(), MergeOutcome::Loaded { count: 10 });
    for _ in 0..4 {
        assert_eq!(view.load_older().await.unwrap(), MergeOutcome::Extended { added: 10 });
    }
    assert_eq!(seqs(&view), range(50, 1));
    assert!(!view.snapshot().has_next_page);

    let calls = fx.source.calls();
    assert_eq!(
        view.load_older().await.unwrap(),
        MergeOutcome::Unchanged { reason: UnchangedReason::AtEnd }
    );
    assert_eq!(fx.source.calls(), calls, "no request once at the end");
}

#[tokio::test]
async fn test_load_first_twice_is_unchanged() {
    let fx = Fixture::new(3, false);
    let view = fx.view(10);
    view.load_first().await.unwrap();
    assert_eq!(
        view.load_first().await.unwrap(),
        MergeOutcome::Unchanged { reason: UnchangedReason::AlreadyLoaded }
    );
    assert_eq!(fx.source.calls(), 1);
}

#[tokio::test]
async fn test_insert_local_prepends_new_message() {
    let fx = Fixture::new(20, false);
    let view = fx.view(20);
    view.load_first().await.unwrap();

    let item21 = fx.post(1).remove(0);
    assert_eq!(view.insert_local(item21).unwrap(), MergeOutcome::Inserted);

    let snap = view.snapshot();
    assert_eq!(snap.edges[0].node.sequence_id.get(), 21);
    assert_eq!(snap.edges[1].node.sequence_id.get(), 20);
    assert_ne!(snap.edges[0].cursor, snap.edges[1].cursor);
    assert!(!snap.has_previous_page);
    assert!(!snap.has_next_page);
}

#[tokio::test]
async fn test_insert_local_rejects_other_conversation() {
    let fx = Fixture::new(2, false);
    let view = fx.view(5);
    view.load_first().await.unwrap();

    let other = fx.source.feed.create_conversation("other").unwrap();
    let stray = fx.source.feed.post_message(other.id, "amy", "wrong room").unwrap();
    let err = view.insert_local(stray).unwrap_err();
    assert!(matches!(err, FeedError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_refresh_stitches_onto_run() {
    let fx = Fixture::new(20, false);
    let view = fx.view(5);
    view.load_first().await.unwrap();
    view.load_older().await.unwrap();
    assert_eq!(seqs(&view), range(20, 11));

    fx.post(2);
    assert_eq!(view.refresh().await.unwrap(), MergeOutcome::Stitched { kept: 7 });
    assert_eq!(seqs(&view), range(22, 11));
    assert!(view.snapshot().has_next_page);

    let cursors: HashSet<_> = view.snapshot().edges.iter().map(|e| e.cursor.clone()).collect();
    assert_eq!(cursors.len(), 12);
}

#[tokio::test]
async fn test_refresh_without_overlap_replaces() {
    let fx = Fixture::new(20, false);
    let view = fx.view(5);
    view.load_first().await.unwrap();

    fx.post(10);
    assert_eq!(view.refresh().await.unwrap(), MergeOutcome::Replaced);
    assert_eq!(seqs(&view), range(30, 26));
    assert!(view.snapshot().has_next_page);
}

#[tokio::test]
async fn test_refresh_after_insert_local_does_not_duplicate() {
    let fx = Fixture::new(10, false);
    let view = fx.view(5);
    view.load_first().await.unwrap();

    let mine = fx.post(1).remove(0);
    view.insert_local(mine).unwrap();
    view.refresh().await.unwrap();

    assert_eq!(seqs(&view), range(11, 6));
}

#[tokio::test]
async fn test_insert_during_refresh_survives_older_window() {
    let fx = Fixture::new(10, true);
    let view = fx.view(5);
    fx.source.release(1);
    view.load_first().await.unwrap();

    fx.source.resolve_early.store(true, Ordering::SeqCst);
    let pending = tokio::spawn({
        let view = view.clone();
        async move { view.refresh().await }
    });
    fx.source.wait_for_waiters(2).await;

    // The refresh window ([10..6]) is already resolved; post and insert 11.
    let mine = fx.post(1).remove(0);
    assert_eq!(view.insert_local(mine).unwrap(), MergeOutcome::Inserted);
    assert_eq!(seqs(&view), range(11, 6));

    fx.source.release(1);
    assert_eq!(pending.await.unwrap().unwrap(), MergeOutcome::Stitched { kept: 0 });
    assert_eq!(seqs(&view), range(11, 6));
    assert!(view.snapshot().has_next_page);
}

#[tokio::test]
async fn test_failed_fetches_leave_cache_unchanged() {
    let fx = Fixture::new(30, false);
    let view = fx.view(10);
    view.load_first().await.unwrap();
    let before = view.snapshot();

    fx.source.fail.store(true, Ordering::SeqCst);
    let err = view.load_older().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(*view.snapshot(), *before);
    assert!(view.snapshot().has_next_page, "still reports more available");

    fx.post(3);
    assert!(view.refresh().await.is_err());
    assert_eq!(*view.snapshot(), *before);

    // The failed calls released the view.
    fx.source.fail.store(false, Ordering::SeqCst);
    assert_eq!(view.load_older().await.unwrap(), MergeOutcome::Extended { added: 10 });
}

#[tokio::test]
async fn test_concurrent_extension_is_busy() {
    let fx = Fixture::new(30, true);
    let view = fx.view(10);

    fx.source.release(1);
    view.load_first().await.unwrap();

    let pending = tokio::spawn({
        let view = view.clone();
        async move { view.load_older().await }
    });
    fx.source.wait_for_waiters(2).await;

    assert!(matches!(view.load_older().await, Err(FeedError::Busy(_))));
    assert!(matches!(view.refresh().await, Err(FeedError::Busy(_))));

    // Local inserts are never blocked by a fetch.
    let mine = fx.post(1).remove(0);
    assert_eq!(view.insert_local(mine).unwrap(), MergeOutcome::Inserted);

    fx.source.release(1);
    assert_eq!(pending.await.unwrap().unwrap(), MergeOutcome::Extended { added: 10 });
    assert_eq!(seqs(&view), range(31, 11));
}

#[tokio::test]
async fn test_second_refresh_supersedes_first() {
    let fx = Fixture::new(10, true);
    let view = fx.view(5);
    fx.source.release(1);
    view.load_first().await.unwrap();

    let first = tokio::spawn({
        let view = view.clone();
        async move { view.refresh().await }
    });
    fx.source.wait_for_waiters(2).await;

    let second = tokio::spawn({
        let view = view.clone();
        async move { view.refresh().await }
    });
    fx.source.wait_for_waiters(3).await;

    assert!(matches!(view.load_older().await, Err(FeedError::Busy(_))));

    fx.source.release(1);
    assert_eq!(first.await.unwrap().unwrap(), MergeOutcome::Superseded);

    fx.post(1);
    fx.source.release(1);
    assert_eq!(second.await.unwrap().unwrap(), MergeOutcome::Stitched { kept: 1 });
    assert_eq!(seqs(&view), range(11, 6));
}

#[tokio::test]
async fn test_subscribers_see_each_mutation() {
    let fx = Fixture::new(15, false);
    let view = fx.view(5);
    let mut rx = view.subscribe();
    assert_eq!(rx.borrow().state, CacheState::Empty);

    view.load_first().await.unwrap();
    rx.changed().await.unwrap();
    let v1 = rx.borrow_and_update().version;

    view.load_older().await.unwrap();
    rx.changed().await.unwrap();
    let snap = rx.borrow_and_update().clone();
    assert!(snap.version > v1);
    assert_eq!(snap.len(), 10);

    view.load_older().await.unwrap();
    rx.changed().await.unwrap();
    assert!(!rx.borrow_and_update().has_next_page);

    // At the end nothing is published.
    assert_eq!(
        view.load_older().await.unwrap(),
        MergeOutcome::Unchanged { reason: UnchangedReason::AtEnd }
    );
    assert!(!rx.has_changed().unwrap());
}
