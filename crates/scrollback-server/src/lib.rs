//! Local host for scrollback feeds.
//!
//! Wires a SQLite-backed [`Feed`](scrollback_kernel::Feed) to the client
//! library so the `scrollback` binary can both answer window requests and
//! browse them through a [`FeedView`](scrollback_client::FeedView).

pub mod paths;
pub mod source;

pub use source::LocalSource;
