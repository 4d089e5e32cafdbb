//! Cursor <-> URL <-> history agreement, plus keyboard shortcut mapping.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

pub fn chapter_path(chapter: u32) -> String {
    format!("/chapter/{chapter}")
}

pub fn verse_path(chapter: u32, verse: u32) -> String {
    format!("/chapter/{chapter}/{verse}")
}

/// Parses `/chapter/{n}` or `/chapter/{n}/{verse}`, ignoring any query,
/// fragment or trailing slash. The verse part is returned raw so callers can
/// decide how to treat malformed values.
pub fn parse_verse_path(path: &str) -> Option<(u32, Option<&str>)> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let mut parts = path.trim_matches('/').split('/');
    if parts.next()? != "chapter" {
        return None;
    }
    let chapter = parts.next()?.parse::<u32>().ok().filter(|c| *c >= 1)?;
    let verse = parts.next().filter(|raw| !raw.is_empty());
    if parts.next().is_some() {
        return None;
    }
    Some((chapter, verse))
}

/// Verse index from raw input if it is a positive integer within the chapter.
pub fn valid_verse(raw: &str, verse_count: u32) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|verse| (1..=verse_count).contains(verse))
}

/// Browser history as seen by the session. `push` adds an entry, `replace`
/// rewrites the current one; neither triggers a page navigation.
pub trait HistoryPort {
    fn current_path(&self) -> String;
    fn push(&self, path: &str);
    fn replace(&self, path: &str);
}

/// In-memory history used natively and in tests.
pub struct MemoryHistory {
    entries: RefCell<Vec<String>>,
    index: Cell<usize>,
}

impl MemoryHistory {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: RefCell::new(vec![initial.to_string()]),
            index: Cell::new(0),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Steps back one entry and returns the path now current, the way a
    /// `popstate` would report it.
    pub fn back(&self) -> Option<String> {
        let index = self.index.get().checked_sub(1)?;
        self.index.set(index);
        self.entries.borrow().get(index).cloned()
    }
}

impl HistoryPort for MemoryHistory {
    fn current_path(&self) -> String {
        self.entries
            .borrow()
            .get(self.index.get())
            .cloned()
            .unwrap_or_default()
    }

    fn push(&self, path: &str) {
        let mut entries = self.entries.borrow_mut();
        entries.truncate(self.index.get() + 1);
        entries.push(path.to_string());
        self.index.set(entries.len() - 1);
    }

    fn replace(&self, path: &str) {
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(self.index.get()) {
            Some(current) => *current = path.to_string(),
            None => entries.push(path.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOrigin {
    /// Initial resolution after a chapter load.
    Initial,
    User,
    /// Back/forward; the URL is already correct.
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorChange {
    pub chapter: u32,
    pub verse: u32,
    pub path: String,
    pub origin: CursorOrigin,
}

pub type CursorObserver = Rc<dyn Fn(&CursorChange)>;

pub struct NavigationSync {
    history: Rc<dyn HistoryPort>,
    observers: RefCell<Vec<CursorObserver>>,
}

impl NavigationSync {
    pub fn new(history: Rc<dyn HistoryPort>) -> Self {
        Self {
            history,
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn current_path(&self) -> String {
        self.history.current_path()
    }

    pub fn observe_cursor_change(&self, observer: CursorObserver) {
        self.observers.borrow_mut().push(observer);
    }

    pub fn set_cursor(&self, chapter: u32, verse: u32, origin: CursorOrigin) {
        let path = verse_path(chapter, verse);
        match origin {
            CursorOrigin::Initial => self.history.replace(&path),
            CursorOrigin::User => self.history.push(&path),
            CursorOrigin::History => {}
        }
        debug!(chapter, verse, ?origin, "cursor synced");

        let change = CursorChange {
            chapter,
            verse,
            path,
            origin,
        };
        let observers = self.observers.borrow().clone();
        for observer in observers {
            observer(&change);
        }
    }

    /// Maps a back/forward path to a verse of the open chapter. Paths for
    /// another chapter or with an invalid verse are ignored.
    pub fn history_target(&self, path: &str, chapter: u32, verse_count: u32) -> Option<u32> {
        let (path_chapter, verse) = parse_verse_path(path)?;
        if path_chapter != chapter {
            return None;
        }
        valid_verse(verse?, verse_count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    TogglePlayback,
    Previous,
    Next,
}

/// Platform-neutral view of a keydown.
#[derive(Debug, Clone, Default)]
pub struct KeyPress {
    pub key: String,
    pub editable_target: bool,
    pub composing: bool,
    pub modifiers: bool,
}

pub fn shortcut_action(press: &KeyPress) -> Option<ShortcutAction> {
    if press.editable_target || press.composing || press.modifiers {
        return None;
    }
    match press.key.as_str() {
        " " | "Spacebar" => Some(ShortcutAction::TogglePlayback),
        "ArrowLeft" => Some(ShortcutAction::Previous),
        "ArrowRight" => Some(ShortcutAction::Next),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: &str) -> KeyPress {
        KeyPress {
            key: key.to_string(),
            ..KeyPress::default()
        }
    }

    #[test]
    fn parses_chapter_and_verse_paths() {
        assert_eq!(parse_verse_path("/chapter/18"), Some((18, None)));
        assert_eq!(parse_verse_path("/chapter/18/45/"), Some((18, Some("45"))));
        assert_eq!(parse_verse_path("/chapter/2/7?x=1#top"), Some((2, Some("7"))));
        assert_eq!(parse_verse_path("/chapter/0/1"), None);
        assert_eq!(parse_verse_path("/search/1"), None);
        assert_eq!(parse_verse_path("/chapter/1/2/3"), None);
    }

    #[test]
    fn user_moves_push_and_initial_replaces() {
        let history = Rc::new(MemoryHistory::new("/chapter/2"));
        let sync = NavigationSync::new(history.clone());

        sync.set_cursor(2, 1, CursorOrigin::Initial);
        sync.set_cursor(2, 2, CursorOrigin::User);
        sync.set_cursor(2, 1, CursorOrigin::History);

        assert_eq!(history.entries(), vec!["/chapter/2/1", "/chapter/2/2"]);
    }

    #[test]
    fn observers_see_every_cursor_change() {
        let history = Rc::new(MemoryHistory::new("/"));
        let sync = NavigationSync::new(history);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        sync.observe_cursor_change(Rc::new(move |change: &CursorChange| {
            sink.borrow_mut().push((change.path.clone(), change.origin));
        }));

        sync.set_cursor(3, 4, CursorOrigin::User);
        sync.set_cursor(3, 3, CursorOrigin::History);

        assert_eq!(
            *seen.borrow(),
            vec![
                ("/chapter/3/4".to_string(), CursorOrigin::User),
                ("/chapter/3/3".to_string(), CursorOrigin::History),
            ]
        );
    }

    #[test]
    fn history_target_rejects_foreign_or_invalid_verses() {
        let sync = NavigationSync::new(Rc::new(MemoryHistory::new("/")));
        assert_eq!(sync.history_target("/chapter/5/3", 5, 7), Some(3));
        assert_eq!(sync.history_target("/chapter/6/3", 5, 7), None);
        assert_eq!(sync.history_target("/chapter/5/8", 5, 7), None);
        assert_eq!(sync.history_target("/chapter/5/-1", 5, 7), None);
        assert_eq!(sync.history_target("/chapter/5/abc", 5, 7), None);
        assert_eq!(sync.history_target("/chapter/5", 5, 7), None);
    }

    #[test]
    fn memory_history_back_reports_previous_entry() {
        let history = MemoryHistory::new("/chapter/1/1");
        history.push("/chapter/1/2");
        assert_eq!(history.back().as_deref(), Some("/chapter/1/1"));
        assert_eq!(history.current_path(), "/chapter/1/1");
        assert_eq!(history.back(), None);
    }

    #[test]
    fn shortcuts_skip_editable_and_modified_keys() {
        assert_eq!(shortcut_action(&press(" ")), Some(ShortcutAction::TogglePlayback));
        assert_eq!(shortcut_action(&press("ArrowRight")), Some(ShortcutAction::Next));
        assert_eq!(shortcut_action(&press("ArrowLeft")), Some(ShortcutAction::Previous));
        assert_eq!(shortcut_action(&press("Enter")), None);

        let typing = KeyPress {
            editable_target: true,
            ..press(" ")
        };
        let chorded = KeyPress {
            modifiers: true,
            ..press("ArrowLeft")
        };
        let composing = KeyPress {
            composing: true,
            ..press("ArrowRight")
        };
        assert_eq!(shortcut_action(&typing), None);
        assert_eq!(shortcut_action(&chorded), None);
        assert_eq!(shortcut_action(&composing), None);
    }
}
