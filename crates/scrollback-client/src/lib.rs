//! Client library for scrollback feeds.
//!
//! A [`FeedView`] keeps one contiguous, newest-first run of a conversation in
//! memory and grows it on demand:
//!
//! - `load_first` fetches the newest page
//! - `load_older` appends the page below the oldest cached edge
//! - `refresh` refetches the newest end and stitches it onto the run
//! - `insert_local` prepends a message this client just posted
//!
//! The merge rules themselves live in [`PageCache`], which has no async or
//! I/O dependencies. Windows come from any [`WindowSource`].

pub mod constants;
pub mod feed_view;
pub mod page_cache;
pub mod source;

pub use constants::{ViewConfig, DEFAULT_PAGE_SIZE};
pub use feed_view::FeedView;
pub use page_cache::{CacheSnapshot, CacheState, MergeOutcome, PageCache, UnchangedReason};
pub use source::WindowSource;
