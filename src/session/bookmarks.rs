use crate::api::models::BookmarkFlags;
use crate::api::ReaderApi;
use crate::error::ReaderError;
use crate::session::epoch::EpochGuard;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::rc::Rc;
use tracing::{debug, warn};

/// Verses per status page; the visible set is the page holding the cursor.
pub const BOOKMARK_PAGE_SIZE: u32 = 10;

pub fn visible_page(cursor: u32, verse_count: u32) -> RangeInclusive<u32> {
    if verse_count == 0 {
        return 1..=0;
    }
    let cursor = cursor.clamp(1, verse_count);
    let start = (cursor - 1) / BOOKMARK_PAGE_SIZE * BOOKMARK_PAGE_SIZE + 1;
    start..=(start + BOOKMARK_PAGE_SIZE - 1).min(verse_count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkToggle {
    Bookmark,
    Favorite,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// Another toggle for the verse was still pending.
    Ignored,
    Applied(BookmarkFlags),
    Failed(ReaderError),
}

/// Server-backed bookmark/favorite flags.
///
/// Local flags change only when the server confirms a toggle; there is no
/// optimistic update to roll back.
pub struct BookmarkSync {
    api: Rc<dyn ReaderApi>,
    statuses: RefCell<HashMap<String, BookmarkFlags>>,
    requested: RefCell<HashSet<String>>,
    pending: RefCell<HashSet<String>>,
    on_change: RefCell<Option<Rc<dyn Fn()>>>,
}

impl BookmarkSync {
    pub fn new(api: Rc<dyn ReaderApi>) -> Self {
        Self {
            api,
            statuses: RefCell::new(HashMap::new()),
            requested: RefCell::new(HashSet::new()),
            pending: RefCell::new(HashSet::new()),
            on_change: RefCell::new(None),
        }
    }

    /// Called whenever a verse enters or leaves the pending state.
    pub fn set_on_change(&self, listener: Rc<dyn Fn()>) {
        *self.on_change.borrow_mut() = Some(listener);
    }

    pub fn status(&self, verse_id: &str) -> Option<BookmarkFlags> {
        self.statuses.borrow().get(verse_id).copied()
    }

    pub fn is_pending(&self, verse_id: &str) -> bool {
        self.pending.borrow().contains(verse_id)
    }

    /// Requests flags for every id not yet known or in flight, in one batch.
    /// Returns whether new statuses were applied.
    pub async fn load_statuses(&self, verse_ids: &[String], guard: &EpochGuard) -> bool {
        let missing: Vec<String> = {
            let statuses = self.statuses.borrow();
            let mut requested = self.requested.borrow_mut();
            verse_ids
                .iter()
                .filter(|id| !statuses.contains_key(id.as_str()))
                .filter(|id| requested.insert((*id).clone()))
                .cloned()
                .collect()
        };
        if missing.is_empty() {
            return false;
        }

        let result = self.api.bookmark_statuses(&missing).await;
        {
            let mut requested = self.requested.borrow_mut();
            for id in &missing {
                requested.remove(id);
            }
        }
        if !guard.is_current() {
            debug!(count = missing.len(), "dropping bookmark statuses for a previous chapter");
            return false;
        }

        match result {
            Ok(found) => {
                let mut statuses = self.statuses.borrow_mut();
                for id in missing {
                    let flags = found.get(&id).copied().unwrap_or_default();
                    statuses.entry(id).or_insert(flags);
                }
                true
            }
            Err(err) => {
                warn!(%err, "bookmark status request failed");
                false
            }
        }
    }

    pub async fn toggle(&self, verse_id: &str, which: BookmarkToggle) -> ToggleOutcome {
        if !self.pending.borrow_mut().insert(verse_id.to_string()) {
            debug!(verse_id, "toggle ignored while pending");
            return ToggleOutcome::Ignored;
        }
        self.notify();

        let result = match which {
            BookmarkToggle::Bookmark => self.api.toggle_bookmark(verse_id).await,
            BookmarkToggle::Favorite => self.api.toggle_favorite(verse_id).await,
        };
        self.pending.borrow_mut().remove(verse_id);

        let outcome = match result {
            Ok(flags) => {
                self.statuses
                    .borrow_mut()
                    .insert(verse_id.to_string(), flags);
                ToggleOutcome::Applied(flags)
            }
            Err(err) => {
                warn!(%err, verse_id, ?which, "toggle failed");
                ToggleOutcome::Failed(err)
            }
        };
        self.notify();
        outcome
    }

    fn notify(&self) {
        let listener = self.on_change.borrow().clone();
        if let Some(listener) = listener {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::epoch::ChapterEpoch;
    use crate::session::testing::FakeApi;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn visible_page_tracks_cursor() {
        assert_eq!(visible_page(1, 7), 1..=7);
        assert_eq!(visible_page(10, 286), 1..=10);
        assert_eq!(visible_page(11, 286), 11..=20);
        assert_eq!(visible_page(285, 286), 281..=286);
        assert!(visible_page(1, 0).is_empty());
    }

    #[tokio::test]
    async fn statuses_are_batched_and_only_fetched_once() {
        let api = Rc::new(FakeApi::default());
        api.statuses.borrow_mut().insert(
            "2:1".to_string(),
            BookmarkFlags {
                is_bookmarked: true,
                is_favorite: false,
            },
        );
        let sync = BookmarkSync::new(api.clone());
        let epoch = ChapterEpoch::new();

        assert!(sync.load_statuses(&ids(&["2:1", "2:2"]), &epoch.guard()).await);
        assert!(!sync.load_statuses(&ids(&["2:1", "2:2"]), &epoch.guard()).await);

        assert_eq!(api.calls(), vec!["statuses:2:1,2:2"]);
        assert!(sync.status("2:1").is_some_and(|f| f.is_bookmarked));
        assert_eq!(sync.status("2:2"), Some(BookmarkFlags::default()));
    }

    #[tokio::test]
    async fn stale_status_response_is_dropped() {
        let api = Rc::new(FakeApi::default());
        let sync = BookmarkSync::new(api.clone());
        let epoch = ChapterEpoch::new();
        let guard = epoch.guard();
        let wanted = ids(&["1:1"]);

        let (applied, _) = futures_util::join!(sync.load_statuses(&wanted, &guard), async {
            epoch.advance();
        });

        assert!(!applied);
        assert_eq!(sync.status("1:1"), None);
    }

    #[tokio::test]
    async fn failed_batch_leaves_flags_unknown_and_can_be_retried() {
        let api = Rc::new(FakeApi::default());
        let sync = BookmarkSync::new(api.clone());
        let epoch = ChapterEpoch::new();
        let wanted = ids(&["4:1", "4:2"]);
        api.fail_statuses.set(true);

        assert!(!sync.load_statuses(&wanted, &epoch.guard()).await);
        assert_eq!(sync.status("4:1"), None);

        api.fail_statuses.set(false);
        assert!(sync.load_statuses(&wanted, &epoch.guard()).await);
        assert_eq!(api.calls_matching("statuses:4:1,4:2"), 2);
        assert_eq!(sync.status("4:2"), Some(BookmarkFlags::default()));
    }

    #[tokio::test]
    async fn toggle_applies_server_flags() {
        let api = Rc::new(FakeApi::default());
        let sync = BookmarkSync::new(api.clone());

        let outcome = sync.toggle("3:4", BookmarkToggle::Favorite).await;

        let expected = BookmarkFlags {
            is_bookmarked: false,
            is_favorite: true,
        };
        assert_eq!(outcome, ToggleOutcome::Applied(expected));
        assert_eq!(sync.status("3:4"), Some(expected));
        assert!(!sync.is_pending("3:4"));
    }

    #[tokio::test]
    async fn second_toggle_while_pending_is_ignored() {
        let api = Rc::new(FakeApi::default());
        let sync = BookmarkSync::new(api.clone());

        let (first, second) = futures_util::join!(
            sync.toggle("3:4", BookmarkToggle::Bookmark),
            sync.toggle("3:4", BookmarkToggle::Bookmark),
        );

        assert!(matches!(first, ToggleOutcome::Applied(flags) if flags.is_bookmarked));
        assert_eq!(second, ToggleOutcome::Ignored);
        assert_eq!(api.calls_matching("toggle_bookmark:3:4"), 1);
    }

    #[tokio::test]
    async fn pending_state_is_announced() {
        let api = Rc::new(FakeApi::default());
        let sync = Rc::new(BookmarkSync::new(api));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (watched, sink) = (Rc::downgrade(&sync), seen.clone());
        sync.set_on_change(Rc::new(move || {
            if let Some(sync) = watched.upgrade() {
                sink.borrow_mut().push(sync.is_pending("7:1"));
            }
        }));

        sync.toggle("7:1", BookmarkToggle::Bookmark).await;

        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[tokio::test]
    async fn failed_toggle_keeps_prior_flags() {
        let api = Rc::new(FakeApi::default());
        let sync = BookmarkSync::new(api.clone());
        let epoch = ChapterEpoch::new();
        sync.load_statuses(&ids(&["5:1"]), &epoch.guard()).await;
        api.fail_toggles.set(true);

        let outcome = sync.toggle("5:1", BookmarkToggle::Bookmark).await;

        assert!(matches!(outcome, ToggleOutcome::Failed(ReaderError::Network(_))));
        assert_eq!(sync.status("5:1"), Some(BookmarkFlags::default()));
        assert!(!sync.is_pending("5:1"));
    }
}
