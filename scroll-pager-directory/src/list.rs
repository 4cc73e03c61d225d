use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scroll_pager::{LoadOutcome, LoadState, PagerHandle};
use tracing::{debug, info, warn};

use crate::api::UserSource;
use crate::user::User;

/// What the presentation layer needs to draw one frame of the list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListView {
    pub users: Vec<User>,
    pub show_spinner: bool,
    pub error: Option<String>,
    /// Trailing placeholders while a visibility-triggered load is outstanding.
    pub show_skeletons: bool,
}

#[derive(Debug)]
struct ListState {
    users: Vec<User>,
    page: u32,
    error: Option<String>,
    has_more: bool,
    is_loading: bool,
}

/// Layout key of the card at `index`.
///
/// User keys are not unique (partial payloads decode with an empty uuid), so the position is part
/// of the key.
pub fn card_key(index: usize, user: &User) -> String {
    format!("{index}:{}", user.key())
}

/// Owns the loaded users and the paging flags, and feeds them to the pagination controller.
///
/// The last loaded user is always registered as the controller's sentinel.
pub struct UserList {
    source: Arc<dyn UserSource>,
    pager: PagerHandle<String>,
    page_size: u32,
    state: Mutex<ListState>,
}

impl UserList {
    pub fn new(source: Arc<dyn UserSource>, pager: PagerHandle<String>, page_size: u32) -> Self {
        Self {
            source,
            pager,
            page_size: page_size.max(1),
            state: Mutex::new(ListState {
                users: Vec::new(),
                page: 1,
                error: None,
                has_more: true,
                is_loading: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches the next page and appends it.
    ///
    /// On failure the error message is recorded, and the page counter and `has_more` stay
    /// unchanged, so the next call retries the same page. A recorded error stays until a later
    /// failure replaces it.
    pub async fn load_users(&self) -> LoadOutcome {
        let (page, has_more) = {
            let mut state = self.lock();
            if state.is_loading {
                debug!(page = state.page, "load skipped: a load is already running");
                return LoadOutcome::Failed;
            }
            state.is_loading = true;
            (state.page, state.has_more)
        };
        self.pager.set_load_state(LoadState::new(has_more, true));

        let result = self.source.fetch_page(page, self.page_size).await;

        let (outcome, sentinel, load_state) = {
            let mut state = self.lock();
            let outcome = match result {
                Ok(users) => {
                    info!(page, count = users.len(), "loaded users page");
                    state.has_more = !users.is_empty();
                    state.users.extend(users);
                    state.page += 1;
                    LoadOutcome::Loaded
                }
                Err(err) => {
                    warn!(page, error = %err, "failed to load users page");
                    state.error = Some(err.to_string());
                    LoadOutcome::Failed
                }
            };
            state.is_loading = false;
            let sentinel = state
                .users
                .len()
                .checked_sub(1)
                .map(|last| card_key(last, &state.users[last]));
            (outcome, sentinel, LoadState::new(state.has_more, false))
        };

        self.pager.register_sentinel(sentinel);
        self.pager.set_load_state(load_state);
        outcome
    }

    pub fn view(&self) -> ListView {
        let show_skeletons = self
            .pager
            .snapshot()
            .is_some_and(|s| s.shows_placeholders());
        let state = self.lock();
        ListView {
            users: state.users.clone(),
            show_spinner: state.is_loading,
            error: state.error.clone(),
            show_skeletons,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().users.is_empty()
    }

    /// The next page number to fetch.
    pub fn next_page(&self) -> u32 {
        self.lock().page
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::{DirectoryError, Result};
    use crate::user::Login;

    pub(crate) fn user(key: &str) -> User {
        User {
            email: format!("{key}@example.com"),
            login: Login {
                uuid: key.to_owned(),
                username: key.to_owned(),
            },
            ..User::default()
        }
    }

    /// Scripted source: each call pops the next response.
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        pub(crate) responses: Mutex<VecDeque<Result<Vec<User>>>>,
        pub(crate) requested: Mutex<Vec<(u32, u32)>>,
        pub(crate) calls: AtomicU32,
    }

    impl ScriptedSource {
        pub(crate) fn new(responses: Vec<Result<Vec<User>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        pub(crate) fn page(keys: &[&str]) -> Result<Vec<User>> {
            Ok(keys.iter().map(|k| user(k)).collect())
        }

        pub(crate) fn failure() -> Result<Vec<User>> {
            Err(DirectoryError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            })
        }

        pub(crate) fn requested(&self) -> Vec<(u32, u32)> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserSource for ScriptedSource {
        async fn fetch_page(&self, page: u32, results: u32) -> Result<Vec<User>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push((page, results));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn list(responses: Vec<Result<Vec<User>>>) -> (Arc<ScriptedSource>, UserList) {
        let source = Arc::new(ScriptedSource::new(responses));
        let list = UserList::new(source.clone(), PagerHandle::detached(), 5);
        (source, list)
    }

    #[tokio::test]
    async fn appends_pages_and_advances() {
        let (source, list) = list(vec![
            ScriptedSource::page(&["a", "b"]),
            ScriptedSource::page(&["c"]),
        ]);
        assert_eq!(list.load_users().await, LoadOutcome::Loaded);
        assert_eq!(list.load_users().await, LoadOutcome::Loaded);

        let view = list.view();
        let keys: Vec<&str> = view.users.iter().map(|u| u.key()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(list.next_page(), 3);
        assert!(list.has_more());
        assert!(!view.show_spinner);
        assert_eq!(source.requested(), vec![(1, 5), (2, 5)]);
    }

    #[tokio::test]
    async fn empty_page_marks_exhaustion() {
        let (_source, list) = list(vec![ScriptedSource::page(&["a"]), Ok(Vec::new())]);
        list.load_users().await;
        list.load_users().await;
        assert!(!list.has_more());
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_items_page_and_has_more() {
        let (source, list) = list(vec![
            ScriptedSource::page(&["a"]),
            ScriptedSource::failure(),
            ScriptedSource::page(&["b"]),
        ]);
        list.load_users().await;
        assert_eq!(list.load_users().await, LoadOutcome::Failed);

        assert_eq!(list.len(), 1);
        assert_eq!(list.next_page(), 2);
        assert!(list.has_more());
        assert_eq!(list.error().as_deref(), Some("Failed to fetch users"));
        assert!(!list.is_loading());

        // The retry asks for the same page; the inline error is left in place.
        assert_eq!(list.load_users().await, LoadOutcome::Loaded);
        assert_eq!(source.requested(), vec![(1, 5), (2, 5), (2, 5)]);
        assert_eq!(list.error().as_deref(), Some("Failed to fetch users"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn card_keys_stay_unique_for_duplicate_user_keys() {
        let blank = user("");
        assert_eq!(card_key(0, &blank), "0:");
        assert_ne!(card_key(0, &blank), card_key(1, &blank));
        assert_eq!(card_key(3, &user("a")), "3:a");
    }
}
