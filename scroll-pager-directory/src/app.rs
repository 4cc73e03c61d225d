use std::sync::Arc;

use scroll_pager::{
    LoadOutcome, LoadState, PagerOptions, PagerSnapshot, PaginationController, ViewportWatch,
};
use tokio::{runtime::Handle, sync::watch};
use tracing::{debug, info};

use crate::api::UserSource;
use crate::config::Settings;
use crate::error::Result;
use crate::list::{ListView, UserList};
use crate::view::{self, Frame, RenderOptions};

/// The directory page: a user list driven by a pagination controller over a terminal viewport.
///
/// Drive it with [`Directory::mount`] once, then [`Directory::scroll_by`] per user scroll. Both
/// return after any loads they triggered have settled.
pub struct Directory {
    list: Arc<UserList>,
    pager: PaginationController<String, ViewportWatch<String>>,
    watch: ViewportWatch<String>,
    changes: watch::Receiver<PagerSnapshot>,
    render: RenderOptions,
    fill_rounds: usize,
}

impl Directory {
    /// Must be called from within a tokio runtime; triggered loads are spawned onto it.
    pub fn new(source: Arc<dyn UserSource>, settings: &Settings) -> Result<Self> {
        let runtime = Handle::try_current()?;
        let viewport = ViewportWatch::new(settings.viewport_rows);

        let options = PagerOptions::new().with_threshold(settings.threshold);
        let (tx, changes) = watch::channel(PagerSnapshot {
            is_fetching: false,
            load_state: LoadState::default(),
            threshold: options.threshold,
            is_watching: false,
        });
        let options = options.with_on_change(Some(move |snapshot: &PagerSnapshot| {
            tx.send_replace(*snapshot);
        }));

        let pager = PaginationController::new(
            viewport.clone(),
            move |fut| {
                runtime.spawn(fut);
            },
            options,
        );

        let list = Arc::new(UserList::new(source, pager.handle(), settings.page_size));
        let weak = Arc::downgrade(&list);
        pager.set_load_more(move || {
            let list = weak.upgrade();
            async move {
                match list {
                    Some(list) => list.load_users().await,
                    None => LoadOutcome::Failed,
                }
            }
        });

        Ok(Self {
            list,
            pager,
            watch: viewport,
            changes,
            render: RenderOptions {
                width: settings.width,
                skeleton_count: settings.skeleton_count,
            },
            fill_rounds: settings.fill_rounds,
        })
    }

    /// Performs the initial load, then settles any prefetch the first layout triggers.
    pub async fn mount(&self) -> Frame {
        info!("mounting user directory");
        self.list.load_users().await;
        self.settle().await
    }

    /// Scrolls the viewport by `rows` and waits for any load this triggers.
    pub async fn scroll_by(&self, rows: i64) -> Frame {
        self.relayout();
        let offset = self.watch.scroll_by(rows);
        debug!(offset, "scrolled");
        self.settle().await
    }

    /// Re-lays out the current list, delivers pending visibility notifications, and waits for
    /// triggered loads, up to `fill_rounds` loads in a row.
    pub async fn settle(&self) -> Frame {
        for _ in 0..self.fill_rounds {
            self.relayout();
            self.watch.flush();
            if !self.pager.is_fetching() {
                break;
            }
            let mut changes = self.changes.clone();
            if changes.wait_for(|s| !s.is_fetching).await.is_err() {
                break;
            }
        }
        self.relayout()
    }

    fn relayout(&self) -> Frame {
        let frame = view::render(&self.list.view(), &self.render);
        self.watch.set_layout(frame.layout.iter().cloned());
        frame
    }

    /// The rows of `frame` currently inside the viewport.
    pub fn visible_lines<'a>(&self, frame: &'a Frame) -> &'a [String] {
        frame.window(self.watch.scroll_offset(), self.watch.viewport_size())
    }

    pub fn view(&self) -> ListView {
        self.list.view()
    }

    pub fn list(&self) -> &UserList {
        &self.list
    }

    pub fn snapshot(&self) -> PagerSnapshot {
        self.pager.snapshot()
    }

    pub fn scroll_offset(&self) -> u64 {
        self.watch.scroll_offset()
    }

    pub fn viewport_rows(&self) -> u32 {
        self.watch.viewport_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::tests::ScriptedSource;

    fn settings(viewport_rows: u32) -> Settings {
        Settings {
            viewport_rows,
            page_size: 2,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn mount_loads_first_page_and_prefetches_when_sentinel_is_visible() {
        let source = Arc::new(ScriptedSource::new(vec![
            ScriptedSource::page(&["a", "b"]),
            ScriptedSource::page(&["c", "d"]),
        ]));
        // Title (2 rows) + two cards (10 rows) fill the 12-row viewport: the last card is visible.
        let directory = Directory::new(source.clone(), &settings(12)).unwrap();
        let frame = directory.mount().await;

        assert_eq!(directory.list().len(), 4);
        assert_eq!(source.requested(), vec![(1, 2), (2, 2)]);
        assert!(!directory.snapshot().is_fetching);
        assert!(!frame.lines.is_empty());
    }

    #[tokio::test]
    async fn scrolling_to_the_sentinel_loads_the_next_page_once() {
        let source = Arc::new(ScriptedSource::new(vec![
            ScriptedSource::page(&["a", "b", "c", "d"]),
            ScriptedSource::page(&["e", "f"]),
        ]));
        let directory = Directory::new(source.clone(), &settings(8)).unwrap();
        directory.mount().await;
        assert_eq!(directory.list().len(), 4);

        // Card "d" spans rows [17, 22); at offset 11 the viewport shows two of its rows.
        directory.scroll_by(11).await;
        assert_eq!(directory.list().len(), 6);
        assert_eq!(source.requested(), vec![(1, 2), (2, 2)]);
        assert_eq!(directory.snapshot().load_state, LoadState::new(true, false));
    }

    #[tokio::test]
    async fn exhausted_source_stops_loading() {
        let source = Arc::new(ScriptedSource::new(vec![
            ScriptedSource::page(&["a"]),
            ScriptedSource::page(&["b"]),
            Ok(Vec::new()),
        ]));
        let directory = Directory::new(source.clone(), &settings(40)).unwrap();
        directory.mount().await;
        for _ in 0..5 {
            directory.scroll_by(5).await;
        }

        assert!(!directory.list().has_more());
        assert_eq!(directory.list().len(), 2);
        assert_eq!(source.requested().len(), 3);
    }

    #[tokio::test]
    async fn failed_page_keeps_items_and_retries_once_the_sentinel_is_seen_again() {
        let source = Arc::new(ScriptedSource::new(vec![
            ScriptedSource::page(&["a", "b", "c", "d"]),
            ScriptedSource::failure(),
            ScriptedSource::page(&["e"]),
        ]));
        let directory = Directory::new(source.clone(), &settings(8)).unwrap();
        directory.mount().await;

        // Card "d" spans rows [17, 22); at offset 11 two of its rows are visible.
        directory.scroll_by(11).await;
        let view = directory.view();
        assert_eq!(view.users.len(), 4);
        assert_eq!(view.error.as_deref(), Some("Failed to fetch users"));
        assert!(directory.list().has_more());
        assert!(!view.show_skeletons);

        // The error box pushed "d" down to [20, 25), out of the viewport: no retry yet.
        assert_eq!(
            directory.visible_lines(&directory.settle().await).len(),
            8
        );
        assert_eq!(source.requested(), vec![(1, 2), (2, 2)]);
        assert!(!directory.snapshot().is_fetching);

        // Bringing it back into view retries page 2 exactly once.
        directory.scroll_by(3).await;
        assert_eq!(directory.list().len(), 5);
        assert_eq!(source.requested(), vec![(1, 2), (2, 2), (2, 2)]);
        assert_eq!(directory.list().next_page(), 3);
        assert_eq!(
            directory.view().error.as_deref(),
            Some("Failed to fetch users")
        );
    }

    #[tokio::test]
    async fn users_without_unique_keys_still_watch_the_last_card() {
        let source = Arc::new(ScriptedSource::new(vec![
            ScriptedSource::page(&["", ""]),
            ScriptedSource::page(&["", ""]),
            ScriptedSource::page(&["", ""]),
        ]));
        // Title (2 rows) and the first card fit; the second card sits at rows [7, 12).
        let directory = Directory::new(source.clone(), &settings(7)).unwrap();
        directory.mount().await;

        assert_eq!(source.requested(), vec![(1, 2)]);
        assert_eq!(directory.list().len(), 2);

        directory.scroll_by(5).await;
        assert_eq!(source.requested(), vec![(1, 2), (2, 2)]);
        assert_eq!(directory.list().len(), 4);
    }
}
