use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{LoadOutcome, PagerSnapshot, Threshold};

/// The caller-supplied operation that loads the next page.
pub type LoadMore = Arc<dyn Fn() -> BoxFuture<'static, LoadOutcome> + Send + Sync>;

/// Runs a future to completion on the caller's executor (e.g. `tokio::spawn`).
///
/// The controller never polls futures itself; every triggered load is handed to the spawner.
pub type Spawner = Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>;

/// A callback fired after every controller state change.
pub type OnChangeCallback = Arc<dyn Fn(&PagerSnapshot) + Send + Sync>;

/// Configuration for [`crate::PaginationController`].
#[derive(Clone, Default)]
pub struct PagerOptions {
    pub threshold: Threshold,
    /// Passed through to the watch backend as-is.
    pub root_margin: i64,
    pub on_change: Option<OnChangeCallback>,
}

impl PagerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, fraction: f32) -> Self {
        self.threshold = Threshold::new(fraction);
        self
    }

    pub fn with_root_margin(mut self, root_margin: i64) -> Self {
        self.root_margin = root_margin;
        self
    }

    pub fn with_on_change(
        mut self,
        on_change: Option<impl Fn(&PagerSnapshot) + Send + Sync + 'static>,
    ) -> Self {
        self.on_change = on_change.map(|f| Arc::new(f) as _);
        self
    }
}

impl core::fmt::Debug for PagerOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PagerOptions")
            .field("threshold", &self.threshold)
            .field("root_margin", &self.root_margin)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}
