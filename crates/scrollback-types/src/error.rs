//! Error taxonomy shared by the store, resolver, and client cache.

use thiserror::Error;

use crate::ids::ConversationId;

/// Errors from window resolution and page-cache maintenance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The conversation does not exist.
    #[error("conversation not found: {0}")]
    NotFound(ConversationId),

    /// Malformed window request (bad count, conflicting arguments).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Cursor failed to decode or decoded outside the sequence id domain.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// Another extension or refresh is already in flight for this view.
    #[error("busy: {0}")]
    Busy(String),

    /// Ordering or uniqueness broken upstream. Never retried, never swallowed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Store or network failure during a fetch or existence probe.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl FeedError {
    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an InvalidCursor error.
    pub fn invalid_cursor(msg: impl Into<String>) -> Self {
        Self::InvalidCursor(msg.into())
    }

    /// Create a Busy error.
    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    /// Create an InvariantViolation error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create an Unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether the caller may reasonably retry the same request later.
    ///
    /// Request-level failures and invariant violations are deterministic and
    /// will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Busy(_))
    }
}

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(FeedError::unavailable("db locked").is_retryable());
        assert!(FeedError::busy("refresh in flight").is_retryable());
        assert!(!FeedError::invalid_argument("first=0").is_retryable());
        assert!(!FeedError::invalid_cursor("garbage").is_retryable());
        assert!(!FeedError::invariant("dup cursor").is_retryable());
        assert!(!FeedError::NotFound(ConversationId::new()).is_retryable());
    }

    #[test]
    fn test_messages_carry_detail() {
        let err = FeedError::invalid_argument("first and last both supplied");
        assert!(err.to_string().contains("first and last"));

        let id = ConversationId::new();
        assert!(FeedError::NotFound(id).to_string().contains(&id.to_string()));
    }
}
