use std::fmt;
use std::sync::Arc;

use crate::{IntersectionEntry, WatchOptions};

/// Callback invoked by a [`VisibilityWatch`] when the observed target crosses its threshold.
pub type VisibilityCallback = Arc<dyn Fn(IntersectionEntry) + Send + Sync>;

/// A backend that reports visibility changes of UI elements.
///
/// This is the seam between the controller and whatever decides visibility: a browser
/// intersection observer, a terminal viewport, or a test double.
///
/// Contract:
/// - `observe` must not invoke `callback` synchronously. The first notification for a new
///   observation is delivered on the backend's next dispatch.
/// - Notifications are delivered on threshold crossings only, not continuously.
/// - Dropping (or disposing) the returned subscription stops all further notifications for it.
pub trait VisibilityWatch<E>: Send + Sync {
    fn observe(
        &self,
        target: &E,
        options: WatchOptions,
        callback: VisibilityCallback,
    ) -> WatchSubscription;
}

impl<E, W: VisibilityWatch<E> + ?Sized> VisibilityWatch<E> for Arc<W> {
    fn observe(
        &self,
        target: &E,
        options: WatchOptions,
        callback: VisibilityCallback,
    ) -> WatchSubscription {
        (**self).observe(target, options, callback)
    }
}

/// An owned observation returned by [`VisibilityWatch::observe`].
///
/// The release action runs exactly once: on [`WatchSubscription::dispose`] or on drop,
/// whichever comes first.
#[must_use = "dropping a subscription stops the observation immediately"]
pub struct WatchSubscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchSubscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn inert() -> Self {
        Self { release: None }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    pub fn dispose(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}
