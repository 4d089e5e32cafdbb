//! Session Controller - owns the cursor and chapter lifecycle and wires the
//! audio, footnote, bookmark, position and navigation pieces together.
//!
//! The controller is a cheap `Clone` handle over shared single-threaded
//! state. UI code reads [`SessionView`] snapshots and is told to re-read them
//! through [`SessionController::subscribe`].

use crate::api::models::{BookmarkFlags, ChapterDetail, Verse};
use crate::api::ReaderApi;
use crate::db::{self, KeyValueStore, ReaderSettings, FONT_SIZE_DEFAULT, FONT_SIZE_STEP};
use crate::diagnostics::PerfSpan;
use crate::messages::{text, Locale, Message};
use crate::session::audio::{AudioChannels, ChannelKind, ChannelState, ChannelStatus, MediaBackend};
use crate::session::bookmarks::{visible_page, BookmarkSync, BookmarkToggle, ToggleOutcome};
use crate::session::epoch::{ChapterEpoch, EpochGuard};
use crate::session::footnotes::FootnoteCache;
use crate::session::markup::{parse_translation, plain_text, TranslationSegment};
use crate::session::narrators::{Narrator, NarratorRegistry};
use crate::session::navigation::{
    parse_verse_path, CursorObserver, CursorOrigin, HistoryPort, NavigationSync, ShortcutAction,
};
use crate::session::positions::PositionMemory;
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Brings a verse into view after a cursor move.
pub trait Viewport {
    fn scroll_to_verse(&self, verse: u32);
}

/// Runs detached session work on the UI event loop.
pub trait TaskSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Everything the session needs from its environment.
pub struct SessionPorts {
    pub api: Rc<dyn ReaderApi>,
    pub media: Rc<dyn MediaBackend>,
    pub history: Rc<dyn HistoryPort>,
    pub store: Rc<dyn KeyValueStore>,
    pub viewport: Rc<dyn Viewport>,
    pub spawner: Rc<dyn TaskSpawner>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Nothing requested yet.
    #[default]
    Idle,
    Loading {
        chapter: u32,
    },
    Ready,
    Failed {
        chapter: u32,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub message: Message,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FootnoteAnchor {
    verse: u32,
    footnote_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteView {
    pub verse: u32,
    pub footnote_id: String,
    pub content: Option<String>,
    pub failed: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerseView {
    pub id: String,
    pub number: u32,
    pub arabic_text: String,
    pub segments: Vec<TranslationSegment>,
    pub transliteration: Option<String>,
    pub commentary: Option<String>,
    pub has_audio: bool,
    pub flags: Option<BookmarkFlags>,
    pub bookmark_pending: bool,
}

/// Render snapshot of the whole session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub chapter: Option<u32>,
    pub chapter_name: String,
    pub translated_name: Option<String>,
    pub verse_count: u32,
    pub cursor: u32,
    pub verse: Option<VerseView>,
    pub verse_loading: bool,
    pub font_size: u32,
    pub locale: Locale,
    pub narrators: Vec<Narrator>,
    pub selected_narrator: Option<String>,
    pub chapter_audio_available: bool,
    pub verse_channel: ChannelState,
    pub chapter_channel: ChannelState,
    pub footnote_panel: Option<FootnoteView>,
    pub tooltip: Option<FootnoteView>,
    pub notice: Option<Notice>,
}

impl SessionView {
    pub fn can_go_previous(&self) -> bool {
        self.phase == SessionPhase::Ready && self.cursor > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.phase == SessionPhase::Ready && self.cursor < self.verse_count
    }
}

struct SessionState {
    phase: SessionPhase,
    /// Chapter metadata; its verses live in `verses`.
    chapter: Option<ChapterDetail>,
    requested_verse: Option<String>,
    verses: BTreeMap<u32, Verse>,
    verse_count: u32,
    cursor: u32,
    fetching_verse: Option<u32>,
    narrators: NarratorRegistry,
    settings: ReaderSettings,
    footnote_panel: Option<FootnoteAnchor>,
    tooltip: Option<FootnoteAnchor>,
    notice: Option<Notice>,
    next_notice_id: u64,
}

impl SessionState {
    fn chapter_number(&self) -> Option<u32> {
        self.chapter.as_ref().map(|chapter| chapter.number)
    }
}

type Listener = Rc<dyn Fn()>;

struct SessionInner {
    api: Rc<dyn ReaderApi>,
    audio: AudioChannels,
    footnotes: FootnoteCache,
    bookmarks: BookmarkSync,
    positions: RefCell<PositionMemory>,
    navigation: NavigationSync,
    store: Rc<dyn KeyValueStore>,
    viewport: Rc<dyn Viewport>,
    spawner: Rc<dyn TaskSpawner>,
    epoch: ChapterEpoch,
    state: RefCell<SessionState>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener_id: Cell<u64>,
}

impl SessionInner {
    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }

    fn set_notice(&self, message: Message) {
        let mut state = self.state.borrow_mut();
        state.next_notice_id += 1;
        let notice = Notice {
            id: state.next_notice_id,
            message,
            text: text(state.settings.locale, message).to_string(),
        };
        state.notice = Some(notice);
    }

    fn raise(&self, message: Message) {
        self.set_notice(message);
        self.notify();
    }

    /// Turns a recorded playback failure into a notice.
    fn absorb_audio_failure(&self) {
        if let Some(failure) = self.audio.failure() {
            self.audio.clear_failure();
            self.set_notice(failure.kind.message());
        }
    }

    fn persist_settings(&self) {
        let settings = self.state.borrow().settings.clone();
        if let Err(err) = db::save_settings(self.store.as_ref(), &settings) {
            warn!(%err, "failed to persist reader settings");
        }
    }

    fn footnote_view(&self, anchor: &FootnoteAnchor) -> FootnoteView {
        let entry = self.footnotes.peek(&anchor.footnote_id);
        FootnoteView {
            verse: anchor.verse,
            footnote_id: anchor.footnote_id.clone(),
            failed: entry.as_ref().is_some_and(|entry| entry.failed),
            content: entry.map(|entry| plain_text(&entry.content)),
            loading: self.footnotes.is_loading(&anchor.footnote_id),
        }
    }
}

/// URL verse parameter: positive integers are clamped into the chapter,
/// anything else is ignored.
fn url_verse(raw: &str, verse_count: u32) -> Option<u32> {
    let verse = raw.trim().parse::<u32>().ok().filter(|verse| *verse >= 1)?;
    Some(verse.min(verse_count))
}

#[derive(Clone)]
pub struct SessionController {
    inner: Rc<SessionInner>,
}

impl SessionController {
    pub fn new(ports: SessionPorts) -> Self {
        let settings = db::load_settings(ports.store.as_ref());
        let positions = PositionMemory::new(ports.store.clone(), settings.position_capacity);
        let state = SessionState {
            phase: SessionPhase::Idle,
            chapter: None,
            requested_verse: None,
            verses: BTreeMap::new(),
            verse_count: 0,
            cursor: 0,
            fetching_verse: None,
            narrators: NarratorRegistry::new(settings.narrator_id.clone()),
            footnote_panel: None,
            tooltip: None,
            notice: None,
            next_notice_id: 0,
            settings,
        };
        let locale = state.settings.locale;

        let inner = Rc::new(SessionInner {
            audio: AudioChannels::new(ports.media),
            footnotes: FootnoteCache::new(ports.api.clone(), locale),
            bookmarks: BookmarkSync::new(ports.api.clone()),
            api: ports.api,
            positions: RefCell::new(positions),
            navigation: NavigationSync::new(ports.history),
            store: ports.store,
            viewport: ports.viewport,
            spawner: ports.spawner,
            epoch: ChapterEpoch::new(),
            state: RefCell::new(state),
            listeners: RefCell::new(Vec::new()),
            next_listener_id: Cell::new(0),
        });

        let weak = Rc::downgrade(&inner);
        inner.audio.set_on_change(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.absorb_audio_failure();
                inner.notify();
            }
        }));
        let weak = Rc::downgrade(&inner);
        inner.bookmarks.set_on_change(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.notify();
            }
        }));

        Self { inner }
    }

    pub fn subscribe(&self, listener: Rc<dyn Fn()>) -> u64 {
        let id = self.inner.next_listener_id.get() + 1;
        self.inner.next_listener_id.set(id);
        self.inner.listeners.borrow_mut().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner
            .listeners
            .borrow_mut()
            .retain(|(listener_id, _)| *listener_id != id);
    }

    pub fn observe_cursor_change(&self, observer: CursorObserver) {
        self.inner.navigation.observe_cursor_change(observer);
    }

    /// Spawns `task` with a handle to this session on the UI event loop.
    pub fn run<F, Fut>(&self, task: F)
    where
        F: FnOnce(SessionController) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        self.inner.spawner.spawn(task(self.clone()).boxed_local());
    }

    /// Opens whatever `path` points at; used at startup.
    pub fn open_location(&self, path: String) {
        self.run(move |session| async move { session.follow_location(&path).await });
    }

    pub fn view(&self) -> SessionView {
        let inner = &self.inner;
        let state = inner.state.borrow();
        let verse = state.verses.get(&state.cursor).map(|verse| VerseView {
            id: verse.id.clone(),
            number: verse.verse_number,
            arabic_text: verse.arabic_text.clone(),
            segments: parse_translation(&verse.translation_text),
            transliteration: verse.transliteration.clone(),
            commentary: verse.commentary.clone(),
            has_audio: state.narrators.verse_url(verse).is_some(),
            flags: inner.bookmarks.status(&verse.id),
            bookmark_pending: inner.bookmarks.is_pending(&verse.id),
        });
        let chapter_audio_available = state
            .chapter
            .as_ref()
            .is_some_and(|chapter| state.narrators.chapter_url(chapter).is_some());

        SessionView {
            phase: state.phase.clone(),
            chapter: state.chapter_number(),
            chapter_name: state
                .chapter
                .as_ref()
                .map(|chapter| chapter.name.clone())
                .unwrap_or_default(),
            translated_name: state
                .chapter
                .as_ref()
                .and_then(|chapter| chapter.translated_name.clone()),
            verse_count: state.verse_count,
            cursor: state.cursor,
            verse_loading: verse.is_none() && state.fetching_verse == Some(state.cursor),
            verse,
            font_size: state.settings.font_size,
            locale: state.settings.locale,
            narrators: state.narrators.narrators().to_vec(),
            selected_narrator: state.narrators.selected_id().map(str::to_string),
            chapter_audio_available,
            verse_channel: inner.audio.state(ChannelKind::Verse),
            chapter_channel: inner.audio.state(ChannelKind::Chapter),
            footnote_panel: state
                .footnote_panel
                .as_ref()
                .map(|anchor| inner.footnote_view(anchor)),
            tooltip: state
                .tooltip
                .as_ref()
                .map(|anchor| inner.footnote_view(anchor)),
            notice: state.notice.clone(),
        }
    }

    /// Enters `Loading` for `chapter` and resolves the initial verse:
    /// URL verse, then the remembered position, then the first verse.
    pub async fn load(&self, chapter: u32, url_verse_param: Option<String>) {
        let inner = &self.inner;
        let guard = inner.epoch.advance();
        inner.audio.shutdown();
        {
            let mut state = inner.state.borrow_mut();
            state.phase = SessionPhase::Loading { chapter };
            state.chapter = None;
            state.requested_verse = url_verse_param.clone();
            state.verses.clear();
            state.verse_count = 0;
            state.cursor = 0;
            state.fetching_verse = None;
            state.footnote_panel = None;
            state.tooltip = None;
        }
        inner.notify();

        let span = PerfSpan::start("chapter_load");
        let result = inner.api.chapter(chapter).await;
        if !guard.is_current() {
            debug!(chapter, "discarding superseded chapter load");
            return;
        }
        let mut detail = match result {
            Ok(detail) => detail,
            Err(err) => {
                warn!(%err, chapter, "chapter load failed");
                {
                    let mut state = inner.state.borrow_mut();
                    let message = text(state.settings.locale, Message::ChapterLoadFailed);
                    state.phase = SessionPhase::Failed {
                        chapter,
                        message: message.to_string(),
                    };
                }
                inner.notify();
                return;
            }
        };
        span.finish(&format!("chapter={chapter} verses={}", detail.verses.len()));

        let verse_count = detail.verse_count();
        let initial = url_verse_param
            .as_deref()
            .and_then(|raw| url_verse(raw, verse_count))
            .or_else(|| inner.positions.borrow().recall(chapter, verse_count))
            .unwrap_or(1)
            .min(verse_count);

        let narrator_fell_back = {
            let mut state = inner.state.borrow_mut();
            let changed = state.narrators.refresh(&detail);
            let fallback = state.narrators.selected_id().map(str::to_string);
            if changed && fallback.is_some() {
                state.settings.narrator_id = fallback;
            }
            state.verses = std::mem::take(&mut detail.verses)
                .into_iter()
                .filter(|verse| verse.verse_number >= 1)
                .map(|verse| (verse.verse_number, verse))
                .collect();
            state.chapter = Some(detail);
            state.verse_count = verse_count;
            state.cursor = initial;
            state.phase = SessionPhase::Ready;
            changed && state.settings.narrator_id.is_some()
        };
        if narrator_fell_back {
            inner.persist_settings();
        }
        info!(chapter, verse = initial, verse_count, "chapter ready");

        if initial >= 1 {
            inner.positions.borrow_mut().remember(chapter, initial);
            inner
                .navigation
                .set_cursor(chapter, initial, CursorOrigin::Initial);
            inner.viewport.scroll_to_verse(initial);
        }
        inner.notify();
        self.settle_cursor(initial, &guard).await;
    }

    pub async fn retry(&self) {
        let (chapter, requested) = {
            let state = self.inner.state.borrow();
            match &state.phase {
                SessionPhase::Failed { chapter, .. } => (*chapter, state.requested_verse.clone()),
                _ => return,
            }
        };
        self.load(chapter, requested).await;
    }

    /// Home: the chapter read most recently, else the first one.
    pub async fn load_home(&self) {
        let chapter = self.inner.positions.borrow().most_recent().unwrap_or(1);
        self.load(chapter, None).await;
    }

    /// Handles a location reported by the browser (startup or back/forward).
    /// Inside the open chapter only valid verses move the cursor; any other
    /// chapter is loaded.
    pub async fn follow_location(&self, path: &str) {
        let Some((chapter, verse)) = parse_verse_path(path) else {
            self.load_home().await;
            return;
        };
        let (current, verse_count, ready) = {
            let state = self.inner.state.borrow();
            (
                state.chapter_number(),
                state.verse_count,
                state.phase == SessionPhase::Ready,
            )
        };
        if ready && current == Some(chapter) {
            match self
                .inner
                .navigation
                .history_target(path, chapter, verse_count)
            {
                Some(target) => {
                    self.go_to_from_history(target).await;
                }
                None => debug!(path, "ignoring history entry"),
            }
            return;
        }
        self.load(chapter, verse.map(str::to_string)).await;
    }

    /// Back/forward: follows the entry the history now points at.
    pub async fn follow_history(&self) {
        let path = self.inner.navigation.current_path();
        self.follow_location(&path).await;
    }

    pub async fn go_to(&self, verse: u32) -> bool {
        self.move_cursor(verse, CursorOrigin::User).await
    }

    pub async fn next(&self) -> bool {
        let cursor = self.inner.state.borrow().cursor;
        self.move_cursor(cursor.saturating_add(1), CursorOrigin::User)
            .await
    }

    pub async fn previous(&self) -> bool {
        let cursor = self.inner.state.borrow().cursor;
        self.move_cursor(cursor.saturating_sub(1), CursorOrigin::User)
            .await
    }

    pub async fn go_to_from_history(&self, verse: u32) -> bool {
        self.move_cursor(verse, CursorOrigin::History).await
    }

    async fn move_cursor(&self, target: u32, origin: CursorOrigin) -> bool {
        let inner = &self.inner;
        let chapter = {
            let mut state = inner.state.borrow_mut();
            if state.phase != SessionPhase::Ready
                || target < 1
                || target > state.verse_count
                || target == state.cursor
            {
                return false;
            }
            let Some(chapter) = state.chapter_number() else {
                return false;
            };
            state.cursor = target;
            state.footnote_panel = None;
            state.tooltip = None;
            chapter
        };

        inner.audio.stop(ChannelKind::Verse);
        inner.positions.borrow_mut().remember(chapter, target);
        inner.navigation.set_cursor(chapter, target, origin);
        inner.viewport.scroll_to_verse(target);
        inner.notify();

        let guard = inner.epoch.guard();
        self.settle_cursor(target, &guard).await;
        true
    }

    /// Completes a cursor move: fetches the verse when the chapter payload was
    /// partial, then the bookmark statuses of its page.
    async fn settle_cursor(&self, verse: u32, guard: &EpochGuard) {
        self.ensure_verse(verse, guard).await;
        self.load_visible_statuses(guard).await;
    }

    async fn ensure_verse(&self, verse: u32, guard: &EpochGuard) {
        let inner = &self.inner;
        let chapter = {
            let mut state = inner.state.borrow_mut();
            if verse == 0
                || state.verses.contains_key(&verse)
                || state.fetching_verse == Some(verse)
            {
                return;
            }
            let Some(chapter) = state.chapter_number() else {
                return;
            };
            state.fetching_verse = Some(verse);
            chapter
        };
        inner.notify();

        let result = inner.api.verse(chapter, verse).await;
        if !guard.is_current() {
            return;
        }
        {
            let mut state = inner.state.borrow_mut();
            if state.fetching_verse == Some(verse) {
                state.fetching_verse = None;
            }
            match result {
                Ok(fetched) => {
                    state.verses.insert(verse, fetched);
                }
                Err(err) => warn!(%err, chapter, verse, "verse fetch failed"),
            }
        }
        inner.notify();
    }

    async fn load_visible_statuses(&self, guard: &EpochGuard) {
        let ids: Vec<String> = {
            let state = self.inner.state.borrow();
            if state.phase != SessionPhase::Ready {
                return;
            }
            visible_page(state.cursor, state.verse_count)
                .filter_map(|number| state.verses.get(&number).map(|verse| verse.id.clone()))
                .collect()
        };
        if self.inner.bookmarks.load_statuses(&ids, guard).await {
            self.inner.notify();
        }
    }

    pub fn increase_font(&self) {
        self.set_font_size(|size| size.saturating_add(FONT_SIZE_STEP));
    }

    pub fn decrease_font(&self) {
        self.set_font_size(|size| size.saturating_sub(FONT_SIZE_STEP));
    }

    pub fn reset_font(&self) {
        self.set_font_size(|_| FONT_SIZE_DEFAULT);
    }

    /// Switches the message language. Notices already shown keep their text;
    /// footnote placeholders use the new locale from the next failure on.
    pub fn set_locale(&self, locale: Locale) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let changed = state.settings.locale != locale;
            state.settings.locale = locale;
            changed
        };
        if changed {
            self.inner.footnotes.set_locale(locale);
            self.inner.persist_settings();
            self.inner.notify();
        }
    }

    fn set_font_size(&self, next: impl FnOnce(u32) -> u32) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let size = db::clamp_font_size(next(state.settings.font_size));
            let changed = size != state.settings.font_size;
            state.settings.font_size = size;
            changed
        };
        if changed {
            self.inner.persist_settings();
            self.inner.notify();
        }
    }

    /// Switches narrator. A loading or playing channel restarts the same verse
    /// or chapter with the new narrator; a paused one is stopped.
    pub async fn select_narrator(&self, narrator_id: &str) {
        let inner = &self.inner;
        let changed = {
            let mut state = inner.state.borrow_mut();
            if state.narrators.selected_id() == Some(narrator_id)
                || !state.narrators.select(narrator_id)
            {
                false
            } else {
                state.settings.narrator_id = Some(narrator_id.to_string());
                true
            }
        };
        if !changed {
            return;
        }
        inner.persist_settings();
        info!(narrator = narrator_id, "narrator selected");

        let mut restart = None;
        for kind in [ChannelKind::Verse, ChannelKind::Chapter] {
            let channel = inner.audio.state(kind);
            if channel.is_active() {
                restart = Some((kind, channel.associated_id));
            }
            if channel.status != ChannelStatus::Idle {
                inner.audio.stop(kind);
            }
        }
        inner.notify();

        let Some((kind, associated_id)) = restart else {
            return;
        };
        let url = {
            let state = inner.state.borrow();
            match kind {
                ChannelKind::Verse => state
                    .verses
                    .values()
                    .find(|verse| associated_id.as_deref() == Some(verse.id.as_str()))
                    .and_then(|verse| state.narrators.verse_url(verse))
                    .map(str::to_string),
                ChannelKind::Chapter => state
                    .chapter
                    .as_ref()
                    .and_then(|chapter| state.narrators.chapter_url(chapter))
                    .map(str::to_string),
            }
        };
        match url {
            Some(url) => inner.audio.play(kind, &url, associated_id.as_deref()).await,
            None => inner.raise(Message::AudioUnavailable),
        }
    }

    pub async fn toggle_verse_audio(&self) {
        let target = {
            let state = self.inner.state.borrow();
            if state.phase != SessionPhase::Ready {
                return;
            }
            state.verses.get(&state.cursor).map(|verse| {
                (
                    verse.id.clone(),
                    state.narrators.verse_url(verse).map(str::to_string),
                )
            })
        };
        let Some((verse_id, url)) = target else {
            return;
        };
        match url {
            Some(url) => {
                self.inner
                    .audio
                    .play(ChannelKind::Verse, &url, Some(&verse_id))
                    .await
            }
            None => self.inner.raise(Message::AudioUnavailable),
        }
    }

    pub async fn toggle_chapter_audio(&self) {
        let target = {
            let state = self.inner.state.borrow();
            if state.phase != SessionPhase::Ready {
                return;
            }
            state.chapter.as_ref().map(|chapter| {
                (
                    chapter.number.to_string(),
                    state.narrators.chapter_url(chapter).map(str::to_string),
                )
            })
        };
        let Some((chapter_id, url)) = target else {
            return;
        };
        match url {
            Some(url) => {
                self.inner
                    .audio
                    .play(ChannelKind::Chapter, &url, Some(&chapter_id))
                    .await
            }
            None => self.inner.raise(Message::AudioUnavailable),
        }
    }

    pub fn stop_audio(&self) {
        self.inner.audio.stop(ChannelKind::Verse);
        self.inner.audio.stop(ChannelKind::Chapter);
    }

    pub fn seek_chapter(&self, seconds: f64) {
        self.inner.audio.seek(ChannelKind::Chapter, seconds);
    }

    /// Whether keyboard shortcuts currently do anything. Hosts leave the
    /// key's default action alone otherwise.
    pub fn accepts_shortcuts(&self) -> bool {
        self.inner.state.borrow().phase == SessionPhase::Ready
    }

    pub async fn handle_shortcut(&self, action: ShortcutAction) {
        match action {
            ShortcutAction::TogglePlayback => {
                // A paused recitation is resumed, not replaced by verse audio.
                if self.inner.audio.state(ChannelKind::Chapter).status != ChannelStatus::Idle {
                    self.toggle_chapter_audio().await;
                } else {
                    self.toggle_verse_audio().await;
                }
            }
            ShortcutAction::Previous => {
                self.previous().await;
            }
            ShortcutAction::Next => {
                self.next().await;
            }
        }
    }

    /// Click on a footnote marker: opens the inline panel, or closes it when
    /// the same marker is clicked again.
    pub async fn toggle_inline_footnote(&self, verse: u32, footnote_id: &str) {
        let anchor = FootnoteAnchor {
            verse,
            footnote_id: footnote_id.to_string(),
        };
        let opened = {
            let mut state = self.inner.state.borrow_mut();
            if state.footnote_panel.as_ref() == Some(&anchor) {
                state.footnote_panel = None;
                false
            } else {
                state.footnote_panel = Some(anchor);
                true
            }
        };
        self.inner.notify();
        if opened {
            self.load_footnote(footnote_id).await;
        }
    }

    pub async fn hover_footnote(&self, verse: u32, footnote_id: &str) {
        self.inner.state.borrow_mut().tooltip = Some(FootnoteAnchor {
            verse,
            footnote_id: footnote_id.to_string(),
        });
        self.inner.notify();
        self.load_footnote(footnote_id).await;
    }

    pub fn leave_footnote(&self) {
        let closed = self.inner.state.borrow_mut().tooltip.take().is_some();
        if closed {
            self.inner.notify();
        }
    }

    async fn load_footnote(&self, footnote_id: &str) {
        if self.inner.footnotes.peek(footnote_id).is_some() {
            return;
        }
        let guard = self.inner.epoch.guard();
        self.inner.footnotes.fetch(footnote_id).await;
        if guard.is_current() {
            self.inner.notify();
        }
    }

    pub async fn toggle_bookmark(&self, verse_id: &str) {
        self.toggle_flag(verse_id, BookmarkToggle::Bookmark).await;
    }

    pub async fn toggle_favorite(&self, verse_id: &str) {
        self.toggle_flag(verse_id, BookmarkToggle::Favorite).await;
    }

    async fn toggle_flag(&self, verse_id: &str, which: BookmarkToggle) {
        if let ToggleOutcome::Failed(_) = self.inner.bookmarks.toggle(verse_id, which).await {
            self.inner.raise(Message::BookmarkFailed);
        }
    }

    pub fn dismiss_notice(&self, id: u64) {
        let dismissed = {
            let mut state = self.inner.state.borrow_mut();
            if state.notice.as_ref().is_some_and(|notice| notice.id == id) {
                state.notice = None;
                true
            } else {
                false
            }
        };
        if dismissed {
            self.inner.notify();
        }
    }

    /// Tears down audio and detaches every subscriber; pending async work
    /// turns into no-ops.
    pub fn shutdown(&self) {
        self.inner.epoch.advance();
        self.inner.audio.shutdown();
        self.inner.listeners.borrow_mut().clear();
    }
}
