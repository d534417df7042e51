//! # scrollback-kernel
//!
//! Server side of scrollback: where messages live and how windows over them
//! are resolved.
//!
//! A request flows through three stages:
//! - [`WindowSpec::from_args`](scrollback_types::WindowSpec::from_args) validates
//!   `first`/`after`/`last`/`before`
//! - [`resolve_window`] fetches the slice and probes both ends inside one
//!   [`FeedStore::read`] snapshot
//! - [`assemble`] pairs items with cursors and attaches page info
//!
//! [`Feed`] strings these together behind the configured limits. Two stores
//! implement [`FeedStore`]: [`FeedDb`] on SQLite and [`MemoryFeedStore`].

pub mod assemble;
pub mod config;
pub mod feed;
pub mod feed_db;
pub mod memory;
pub mod store;
pub mod window;

pub use assemble::assemble;
pub use config::{ConfigError, FeedConfig, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
pub use feed::Feed;
pub use feed_db::FeedDb;
pub use memory::MemoryFeedStore;
pub use store::{Boundary, BoundaryOp, Direction, FeedStore, SnapshotReader};
pub use window::{resolve_window, Window};
