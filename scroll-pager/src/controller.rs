use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt};

use crate::{
    IntersectionEntry, LoadMore, LoadOutcome, LoadState, OnChangeCallback, PagerOptions,
    PagerSnapshot, Spawner, Threshold, VisibilityCallback, VisibilityWatch, WatchOptions,
    WatchSubscription,
};

/// A headless infinite-scroll controller.
///
/// It decouples "the sentinel became visible" from "fetch the next page":
/// - The consumer registers a sentinel element (usually the last rendered item).
/// - The controller keeps exactly one visibility watch on it, through the [`VisibilityWatch`]
///   backend it was built with.
/// - When the watch reports the sentinel as intersecting, and the pushed [`LoadState`] allows it,
///   the controller invokes the load operation once and hands the resulting future to the
///   spawner.
///
/// While a load is outstanding (either `is_loading` pushed by the consumer or the controller's
/// own `is_fetching`), no watch exists at all, so at most one visibility-triggered load is ever
/// in flight. The fetching flag is cleared when the load future settles, whatever its outcome,
/// and also when the future is dropped before completing.
///
/// Dropping the controller disposes the active watch. Loads still in flight run to completion;
/// their flag clear becomes a no-op.
pub struct PaginationController<E, W> {
    shared: Arc<Shared<E, W>>,
}

impl<E, W> PaginationController<E, W>
where
    E: Clone + PartialEq + Send + Sync + 'static,
    W: VisibilityWatch<E> + 'static,
{
    pub fn new(
        watch: W,
        spawner: impl Fn(BoxFuture<'static, ()>) + Send + Sync + 'static,
        options: PagerOptions,
    ) -> Self {
        pdebug!(
            threshold = options.threshold.get(),
            root_margin = options.root_margin,
            "PaginationController::new"
        );
        let PagerOptions {
            threshold,
            root_margin,
            on_change,
        } = options;
        let shared = Arc::new_cyclic(|this| Shared {
            this: this.clone(),
            watch,
            spawner: Arc::new(spawner) as Spawner,
            root_margin,
            on_change,
            state: Mutex::new(PagerState {
                sentinel: None,
                load_state: LoadState::default(),
                threshold,
                is_fetching: false,
                load_more: None,
                subscription: None,
                generation: 0,
                torn_down: false,
            }),
        });
        Self { shared }
    }

    /// Installs (or replaces) the operation invoked when the sentinel becomes visible.
    pub fn set_load_more<F, Fut>(&self, load_more: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoadOutcome> + Send + 'static,
    {
        let load_more: LoadMore = Arc::new(move || load_more().boxed());
        self.shared.lock().load_more = Some(load_more);
    }

    /// Replaces the observed element. `None` stops observing.
    pub fn register_sentinel(&self, sentinel: Option<E>) {
        self.shared.register_sentinel(sentinel);
    }

    pub fn set_load_state(&self, load_state: LoadState) {
        self.shared.set_load_state(load_state);
    }

    pub fn set_threshold(&self, fraction: f32) {
        self.shared.set_threshold(Threshold::new(fraction));
    }

    pub fn is_fetching(&self) -> bool {
        self.shared.lock().is_fetching
    }

    pub fn is_watching(&self) -> bool {
        self.shared.lock().subscription.is_some()
    }

    pub fn load_state(&self) -> LoadState {
        self.shared.lock().load_state
    }

    pub fn threshold(&self) -> Threshold {
        self.shared.lock().threshold
    }

    pub fn sentinel(&self) -> Option<E> {
        self.shared.lock().sentinel.clone()
    }

    pub fn snapshot(&self) -> PagerSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn watch(&self) -> &W {
        &self.shared.watch
    }

    /// Returns a weak handle for use inside load operations and orchestrators.
    pub fn handle(&self) -> PagerHandle<E> {
        let weak: Weak<dyn Control<E>> = self.shared.this.clone();
        PagerHandle { inner: weak }
    }
}

impl<E, W> Drop for PaginationController<E, W> {
    fn drop(&mut self) {
        let subscription = {
            let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.torn_down = true;
            state.generation = state.generation.wrapping_add(1);
            state.subscription.take()
        };
        pdebug!("PaginationController::drop");
        drop(subscription);
    }
}

impl<E: fmt::Debug, W> fmt::Debug for PaginationController<E, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("PaginationController")
            .field("sentinel", &state.sentinel)
            .field("load_state", &state.load_state)
            .field("threshold", &state.threshold)
            .field("is_fetching", &state.is_fetching)
            .field("is_watching", &state.subscription.is_some())
            .finish_non_exhaustive()
    }
}

/// A weak, type-erased handle to a [`PaginationController`].
///
/// Every setter is a no-op once the controller has been dropped; getters return `None`.
pub struct PagerHandle<E> {
    inner: Weak<dyn Control<E>>,
}

impl<E> PagerHandle<E> {
    /// A handle that is not attached to any controller.
    pub fn detached() -> Self
    where
        E: Clone + PartialEq + Send + Sync + 'static,
    {
        let inner: Weak<dyn Control<E>> = Weak::<Detached>::new();
        Self { inner }
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn register_sentinel(&self, sentinel: Option<E>) {
        if let Some(control) = self.inner.upgrade() {
            control.register_sentinel(sentinel);
        }
    }

    pub fn set_load_state(&self, load_state: LoadState) {
        if let Some(control) = self.inner.upgrade() {
            control.set_load_state(load_state);
        }
    }

    pub fn set_threshold(&self, fraction: f32) {
        if let Some(control) = self.inner.upgrade() {
            control.set_threshold(Threshold::new(fraction));
        }
    }

    pub fn is_fetching(&self) -> Option<bool> {
        self.snapshot().map(|s| s.is_fetching)
    }

    pub fn snapshot(&self) -> Option<PagerSnapshot> {
        self.inner.upgrade().map(|control| control.snapshot())
    }
}

impl<E> Clone for PagerHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for PagerHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

trait Control<E>: Send + Sync {
    fn register_sentinel(&self, sentinel: Option<E>);
    fn set_load_state(&self, load_state: LoadState);
    fn set_threshold(&self, threshold: Threshold);
    fn snapshot(&self) -> PagerSnapshot;
    fn finish_fetch(&self);
}

/// Placeholder type behind [`PagerHandle::detached`]; never instantiated.
struct Detached;

impl<E> Control<E> for Detached {
    fn register_sentinel(&self, _sentinel: Option<E>) {}
    fn set_load_state(&self, _load_state: LoadState) {}
    fn set_threshold(&self, _threshold: Threshold) {}
    fn finish_fetch(&self) {}
    fn snapshot(&self) -> PagerSnapshot {
        PagerSnapshot {
            is_fetching: false,
            load_state: LoadState::default(),
            threshold: Threshold::default(),
            is_watching: false,
        }
    }
}

struct PagerState<E> {
    sentinel: Option<E>,
    load_state: LoadState,
    threshold: Threshold,
    is_fetching: bool,
    load_more: Option<LoadMore>,
    subscription: Option<WatchSubscription>,
    // Bumped on every rebuild; callbacks carrying an older value are stale.
    generation: u64,
    torn_down: bool,
}

impl<E> PagerState<E> {
    fn snapshot(&self) -> PagerSnapshot {
        PagerSnapshot {
            is_fetching: self.is_fetching,
            load_state: self.load_state,
            threshold: self.threshold,
            is_watching: self.subscription.is_some(),
        }
    }
}

struct Shared<E, W> {
    this: Weak<Self>,
    watch: W,
    spawner: Spawner,
    root_margin: i64,
    on_change: Option<OnChangeCallback>,
    state: Mutex<PagerState<E>>,
}

impl<E, W> Shared<E, W>
where
    E: Clone + PartialEq + Send + Sync + 'static,
    W: VisibilityWatch<E> + 'static,
{
    fn lock(&self) -> MutexGuard<'_, PagerState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, snapshot: &PagerSnapshot) {
        if let Some(cb) = &self.on_change {
            cb(snapshot);
        }
    }

    /// Applies `f`; when it reports a change, rebuilds the watch and notifies `on_change`.
    fn update(&self, f: impl FnOnce(&mut PagerState<E>) -> bool) {
        let snapshot = {
            let mut state = self.lock();
            if state.torn_down || !f(&mut *state) {
                return;
            }
            self.rebuild(&mut state);
            state.snapshot()
        };
        self.emit(&snapshot);
    }

    /// Disposes the current watch, then creates a new one when observing is allowed.
    fn rebuild(&self, state: &mut PagerState<E>) {
        if let Some(mut old) = state.subscription.take() {
            old.dispose();
        }
        state.generation = state.generation.wrapping_add(1);

        if state.torn_down || state.is_fetching || state.load_state.is_loading {
            ptrace!(
                is_fetching = state.is_fetching,
                is_loading = state.load_state.is_loading,
                "rebuild: watch suspended"
            );
            return;
        }
        let Some(target) = state.sentinel.as_ref() else {
            ptrace!("rebuild: no sentinel");
            return;
        };

        let generation = state.generation;
        let this = self.this.clone();
        let callback: VisibilityCallback = Arc::new(move |entry: IntersectionEntry| {
            if let Some(shared) = this.upgrade() {
                shared.notify_visible(generation, entry);
            }
        });
        let options = WatchOptions {
            threshold: state.threshold,
            root_margin: self.root_margin,
        };
        state.subscription = Some(self.watch.observe(target, options, callback));
        ptrace!(generation, "rebuild: watching sentinel");
    }

    fn notify_visible(&self, generation: u64, entry: IntersectionEntry) {
        let (load_more, snapshot) = {
            let mut state = self.lock();
            if state.torn_down || state.generation != generation {
                ptrace!(generation, "notify_visible: stale watch");
                return;
            }
            if !entry.is_intersecting {
                return;
            }
            if !state.load_state.allows_load() || state.is_fetching {
                ptrace!(
                    has_more = state.load_state.has_more,
                    is_loading = state.load_state.is_loading,
                    is_fetching = state.is_fetching,
                    "notify_visible: load not allowed"
                );
                return;
            }
            let Some(load_more) = state.load_more.clone() else {
                pwarn!("notify_visible: sentinel visible but no load operation installed");
                return;
            };

            state.is_fetching = true;
            self.rebuild(&mut state);
            (load_more, state.snapshot())
        };

        pdebug!(ratio = entry.ratio, "notify_visible: triggering load");
        self.emit(&snapshot);

        // Created before the load operation runs so a panicking loader still clears the flag.
        let shared: Weak<dyn Control<E>> = self.this.clone();
        let guard = FetchGuard {
            shared,
            released: false,
        };
        let load = load_more();
        (self.spawner)(
            async move {
                let outcome = load.await;
                guard.settle(outcome);
            }
            .boxed(),
        );
    }
}

impl<E, W> Control<E> for Shared<E, W>
where
    E: Clone + PartialEq + Send + Sync + 'static,
    W: VisibilityWatch<E> + 'static,
{
    fn register_sentinel(&self, sentinel: Option<E>) {
        self.update(|state| {
            if state.sentinel == sentinel {
                return false;
            }
            state.sentinel = sentinel;
            true
        });
    }

    fn set_load_state(&self, load_state: LoadState) {
        self.update(|state| {
            if state.load_state == load_state {
                return false;
            }
            state.load_state = load_state;
            true
        });
    }

    fn set_threshold(&self, threshold: Threshold) {
        self.update(|state| {
            if state.threshold == threshold {
                return false;
            }
            state.threshold = threshold;
            true
        });
    }

    fn snapshot(&self) -> PagerSnapshot {
        self.lock().snapshot()
    }

    fn finish_fetch(&self) {
        self.update(|state| {
            if !state.is_fetching {
                return false;
            }
            state.is_fetching = false;
            true
        });
    }
}

/// Clears the fetching flag exactly once: when the load settles or when its future is dropped.
struct FetchGuard<E> {
    shared: Weak<dyn Control<E>>,
    released: bool,
}

impl<E> FetchGuard<E> {
    fn settle(mut self, outcome: LoadOutcome) {
        if outcome.is_failed() {
            pdebug!("load settled: failed");
        } else {
            ptrace!("load settled: loaded");
        }
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.shared.upgrade() {
            Some(shared) => shared.finish_fetch(),
            None => {
                pdebug!("load settled after controller drop; nothing to clear");
            }
        }
    }
}

impl<E> Drop for FetchGuard<E> {
    fn drop(&mut self) {
        self.release();
    }
}
