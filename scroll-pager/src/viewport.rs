use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{IntersectionEntry, VisibilityCallback, VisibilityWatch, WatchOptions, WatchSubscription};

/// Position of one laid-out element along the scroll axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemExtent {
    pub start: u64,
    pub size: u32,
}

impl ItemExtent {
    pub fn new(start: u64, size: u32) -> Self {
        Self { start, size }
    }

    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size as u64)
    }
}

/// A headless [`VisibilityWatch`] over a one-dimensional scroll viewport.
///
/// Your adapter feeds it the layout of rendered elements plus the viewport geometry, and drives
/// it with scroll events. Observers are notified only when their "meets threshold" state flips,
/// so scrolling within the same state produces no callbacks.
///
/// Notifications are delivered outside the internal lock: callbacks may freely dispose their own
/// subscription or create new ones.
///
/// A new observation does not fire from inside `observe`; its first notification is delivered by
/// the next mutation or [`ViewportWatch::flush`].
pub struct ViewportWatch<E> {
    inner: Arc<Mutex<Viewport<E>>>,
}

struct Viewport<E> {
    viewport_size: u32,
    scroll_offset: u64,
    layout: Vec<(E, ItemExtent)>,
    observations: Vec<Observation<E>>,
    next_id: u64,
}

struct Observation<E> {
    id: u64,
    target: E,
    options: WatchOptions,
    callback: VisibilityCallback,
    // `None` until the first notification has been delivered.
    last: Option<bool>,
}

impl<E> Viewport<E> {
    fn total_size(&self) -> u64 {
        self.layout
            .iter()
            .map(|(_, extent)| extent.end())
            .max()
            .unwrap_or(0)
    }

    fn max_scroll_offset(&self) -> u64 {
        self.total_size()
            .saturating_sub(self.viewport_size as u64)
    }

    fn clamp_scroll_offset(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
    }
}

impl<E> ViewportWatch<E>
where
    E: Clone + PartialEq + Send + 'static,
{
    pub fn new(viewport_size: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Viewport {
                viewport_size,
                scroll_offset: 0,
                layout: Vec::new(),
                observations: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Viewport<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn viewport_size(&self) -> u32 {
        self.lock().viewport_size
    }

    pub fn scroll_offset(&self) -> u64 {
        self.lock().scroll_offset
    }

    pub fn total_size(&self) -> u64 {
        self.lock().total_size()
    }

    pub fn max_scroll_offset(&self) -> u64 {
        self.lock().max_scroll_offset()
    }

    pub fn observed_count(&self) -> usize {
        self.lock().observations.len()
    }

    /// Returns whether `target` is currently observed by any subscription.
    pub fn is_observing(&self, target: &E) -> bool {
        self.lock().observations.iter().any(|o| o.target == *target)
    }

    /// Replaces the element layout. The scroll offset is re-clamped to the new content size.
    ///
    /// Returns the number of notifications delivered.
    pub fn set_layout(&self, layout: impl IntoIterator<Item = (E, ItemExtent)>) -> usize {
        {
            let mut vp = self.lock();
            vp.layout = layout.into_iter().collect();
            vp.clamp_scroll_offset();
        }
        self.dispatch()
    }

    /// Returns the number of notifications delivered.
    pub fn set_viewport_size(&self, viewport_size: u32) -> usize {
        {
            let mut vp = self.lock();
            vp.viewport_size = viewport_size;
            vp.clamp_scroll_offset();
        }
        self.dispatch()
    }

    /// Scrolls to `offset` (clamped to the content) and returns the applied offset.
    pub fn scroll_to(&self, offset: u64) -> u64 {
        let applied = {
            let mut vp = self.lock();
            vp.scroll_offset = offset;
            vp.clamp_scroll_offset();
            vp.scroll_offset
        };
        self.dispatch();
        applied
    }

    pub fn scroll_by(&self, delta: i64) -> u64 {
        let current = self.scroll_offset();
        self.scroll_to(current.saturating_add_signed(delta))
    }

    pub fn scroll_to_end(&self) -> u64 {
        self.scroll_to(u64::MAX)
    }

    /// Delivers pending notifications (e.g. the first one of a new observation).
    ///
    /// Returns the number of notifications delivered.
    pub fn flush(&self) -> usize {
        self.dispatch()
    }

    /// Computes the current entry for `target`, or `None` if it is not laid out.
    pub fn entry_for(&self, target: &E, options: WatchOptions) -> Option<IntersectionEntry> {
        let vp = self.lock();
        let extent = vp
            .layout
            .iter()
            .find(|(key, _)| key == target)
            .map(|(_, extent)| *extent)?;
        let ratio = visible_ratio(
            extent,
            vp.scroll_offset,
            vp.viewport_size,
            options.root_margin,
        );
        Some(IntersectionEntry::new(ratio, options.threshold))
    }

    fn dispatch(&self) -> usize {
        let pending: Vec<(VisibilityCallback, IntersectionEntry)> = {
            let mut vp = self.lock();
            let Viewport {
                layout,
                observations,
                scroll_offset,
                viewport_size,
                ..
            } = &mut *vp;

            let mut pending = Vec::new();
            for obs in observations.iter_mut() {
                let Some(extent) = layout
                    .iter()
                    .find(|(key, _)| *key == obs.target)
                    .map(|(_, extent)| *extent)
                else {
                    continue;
                };
                let ratio = visible_ratio(
                    extent,
                    *scroll_offset,
                    *viewport_size,
                    obs.options.root_margin,
                );
                let entry = IntersectionEntry::new(ratio, obs.options.threshold);
                if obs.last == Some(entry.is_intersecting) {
                    continue;
                }
                obs.last = Some(entry.is_intersecting);
                pending.push((Arc::clone(&obs.callback), entry));
            }
            pending
        };

        let delivered = pending.len();
        for (callback, entry) in pending {
            callback(entry);
        }
        delivered
    }
}

impl<E> VisibilityWatch<E> for ViewportWatch<E>
where
    E: Clone + PartialEq + Send + 'static,
{
    fn observe(
        &self,
        target: &E,
        options: WatchOptions,
        callback: VisibilityCallback,
    ) -> WatchSubscription {
        let id = {
            let mut vp = self.lock();
            let id = vp.next_id;
            vp.next_id = vp.next_id.wrapping_add(1);
            vp.observations.push(Observation {
                id,
                target: target.clone(),
                options,
                callback,
                last: None,
            });
            id
        };

        let inner = Arc::downgrade(&self.inner);
        WatchSubscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                let mut vp = inner.lock().unwrap_or_else(PoisonError::into_inner);
                vp.observations.retain(|o| o.id != id);
            }
        })
    }
}

impl<E> Clone for ViewportWatch<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for ViewportWatch<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vp = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ViewportWatch")
            .field("viewport_size", &vp.viewport_size)
            .field("scroll_offset", &vp.scroll_offset)
            .field("items", &vp.layout.len())
            .field("observations", &vp.observations.len())
            .finish()
    }
}

/// Visible fraction of `extent` inside `[offset - margin, offset + viewport + margin)`.
///
/// Zero-sized elements count as fully visible when their start lies inside the viewport.
pub(crate) fn visible_ratio(extent: ItemExtent, offset: u64, viewport: u32, margin: i64) -> f32 {
    let view_start = offset.saturating_add_signed(margin.saturating_neg());
    let view_end = offset
        .saturating_add(viewport as u64)
        .saturating_add_signed(margin);
    if view_end <= view_start {
        return 0.0;
    }

    if extent.size == 0 {
        return if extent.start >= view_start && extent.start < view_end {
            1.0
        } else {
            0.0
        };
    }

    let lo = extent.start.max(view_start);
    let hi = extent.end().min(view_end);
    let overlap = hi.saturating_sub(lo);
    overlap as f32 / extent.size as f32
}
