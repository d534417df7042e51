//! Client configuration constants and per-view settings.

/// Window size for the first page and each `load_older` when not configured.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Settings for one [`FeedView`](crate::FeedView).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    /// `first` for the initial page and every older page.
    pub page_size: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE }
    }
}

impl ViewConfig {
    pub fn with_page_size(page_size: u32) -> Self {
        Self { page_size }
    }
}
