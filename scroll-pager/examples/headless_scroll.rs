// Example: a headless list that loads a new page whenever its last row scrolls into view.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scroll_pager::{
    ItemExtent, LoadOutcome, LoadState, PagerOptions, PaginationController, ViewportWatch,
};

const PAGE_SIZE: usize = 5;
const ROW_HEIGHT: u32 = 3;
const LAST_PAGE: usize = 4;

fn main() {
    let rows: Arc<Mutex<Vec<usize>>> = Arc::default();
    let pages = Arc::new(AtomicUsize::new(0));
    let watch = ViewportWatch::new(12);

    // The "executor" runs each load inline; a real adapter would hand it to tokio or the browser.
    let pager = PaginationController::new(
        watch.clone(),
        futures::executor::block_on,
        PagerOptions::new().with_threshold(0.2),
    );

    let handle = pager.handle();
    pager.set_load_more({
        let rows = Arc::clone(&rows);
        let pages = Arc::clone(&pages);
        move || {
            let rows = Arc::clone(&rows);
            let pages = Arc::clone(&pages);
            let handle = handle.clone();
            async move {
                let page = pages.fetch_add(1, Ordering::SeqCst);
                let mut rows = rows.lock().unwrap();
                if page < LAST_PAGE {
                    rows.extend((0..PAGE_SIZE).map(|i| page * PAGE_SIZE + i));
                } else {
                    handle.set_load_state(LoadState::new(false, false));
                }
                handle.register_sentinel(rows.last().copied());
                LoadOutcome::Loaded
            }
        }
    });

    // Initial page, loaded by the list itself.
    rows.lock().unwrap().extend(0..PAGE_SIZE);
    pages.store(1, Ordering::SeqCst);
    pager.register_sentinel(Some(PAGE_SIZE - 1));

    for step in 0..12 {
        let layout: Vec<(usize, ItemExtent)> = rows
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, row)| (*row, ItemExtent::new(i as u64 * ROW_HEIGHT as u64, ROW_HEIGHT)))
            .collect();
        watch.set_layout(layout);
        watch.scroll_by(6);

        println!(
            "step={step} offset={} rows={} has_more={} watching={}",
            watch.scroll_offset(),
            rows.lock().unwrap().len(),
            pager.load_state().has_more,
            pager.is_watching(),
        );
    }
}
