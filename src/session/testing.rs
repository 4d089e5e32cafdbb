//! Test doubles for the session seams.

use crate::api::models::{BookmarkFlags, ChapterDetail, Verse};
use crate::api::ReaderApi;
use crate::error::{ReaderError, ReaderResult};
use crate::session::audio::{MediaBackend, MediaElement, MediaErrorKind, MediaEvent, MediaListener};
use crate::session::controller::{TaskSpawner, Viewport};
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Backend double. Every call yields once before answering so concurrent
/// callers genuinely overlap.
#[derive(Default)]
pub struct FakeApi {
    pub chapters: RefCell<HashMap<u32, ChapterDetail>>,
    pub verses: RefCell<HashMap<(u32, u32), Verse>>,
    pub footnotes: RefCell<HashMap<String, String>>,
    pub statuses: RefCell<HashMap<String, BookmarkFlags>>,
    pub fail_toggles: Cell<bool>,
    pub fail_statuses: Cell<bool>,
    calls: RefCell<Vec<String>>,
}

impl FakeApi {
    pub fn with_chapter(chapter: ChapterDetail) -> Self {
        let api = Self::default();
        api.chapters.borrow_mut().insert(chapter.number, chapter);
        api
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl ReaderApi for FakeApi {
    fn chapter(&self, chapter: u32) -> LocalBoxFuture<'_, ReaderResult<ChapterDetail>> {
        self.record(format!("chapter:{chapter}"));
        async move {
            tokio::task::yield_now().await;
            self.chapters
                .borrow()
                .get(&chapter)
                .cloned()
                .ok_or(ReaderError::Status(404))
        }
        .boxed_local()
    }

    fn verse(&self, chapter: u32, verse: u32) -> LocalBoxFuture<'_, ReaderResult<Verse>> {
        self.record(format!("verse:{chapter}:{verse}"));
        async move {
            tokio::task::yield_now().await;
            self.verses
                .borrow()
                .get(&(chapter, verse))
                .cloned()
                .ok_or(ReaderError::Status(404))
        }
        .boxed_local()
    }

    fn footnote(&self, footnote_id: &str) -> LocalBoxFuture<'_, ReaderResult<String>> {
        self.record(format!("footnote:{footnote_id}"));
        let id = footnote_id.to_string();
        async move {
            tokio::task::yield_now().await;
            self.footnotes
                .borrow()
                .get(&id)
                .cloned()
                .ok_or(ReaderError::Status(404))
        }
        .boxed_local()
    }

    fn bookmark_statuses(
        &self,
        verse_ids: &[String],
    ) -> LocalBoxFuture<'_, ReaderResult<HashMap<String, BookmarkFlags>>> {
        self.record(format!("statuses:{}", verse_ids.join(",")));
        let ids = verse_ids.to_vec();
        async move {
            tokio::task::yield_now().await;
            if self.fail_statuses.get() {
                return Err(ReaderError::Network("offline".to_string()));
            }
            let statuses = self.statuses.borrow();
            Ok(ids
                .into_iter()
                .map(|id| {
                    let flags = statuses.get(&id).copied().unwrap_or_default();
                    (id, flags)
                })
                .collect())
        }
        .boxed_local()
    }

    fn toggle_bookmark(&self, verse_id: &str) -> LocalBoxFuture<'_, ReaderResult<BookmarkFlags>> {
        self.record(format!("toggle_bookmark:{verse_id}"));
        let id = verse_id.to_string();
        async move {
            tokio::task::yield_now().await;
            if self.fail_toggles.get() {
                return Err(ReaderError::Network("connection reset".to_string()));
            }
            let mut statuses = self.statuses.borrow_mut();
            let flags = statuses.entry(id).or_default();
            flags.is_bookmarked = !flags.is_bookmarked;
            if !flags.is_bookmarked {
                flags.is_favorite = false;
            }
            Ok(*flags)
        }
        .boxed_local()
    }

    fn toggle_favorite(&self, verse_id: &str) -> LocalBoxFuture<'_, ReaderResult<BookmarkFlags>> {
        self.record(format!("toggle_favorite:{verse_id}"));
        let id = verse_id.to_string();
        async move {
            tokio::task::yield_now().await;
            if self.fail_toggles.get() {
                return Err(ReaderError::Network("connection reset".to_string()));
            }
            let mut statuses = self.statuses.borrow_mut();
            let flags = statuses.entry(id).or_default();
            flags.is_favorite = !flags.is_favorite;
            Ok(*flags)
        }
        .boxed_local()
    }
}

/// Chapter fixture: `count` verses, each with audio for narrators 1 and 5,
/// plus chapter-level recitations for the same narrators.
pub fn chapter_fixture(number: u32, count: u32) -> ChapterDetail {
    let verses: Vec<serde_json::Value> = (1..=count)
        .map(|verse| {
            json!({
                "id": format!("{number}:{verse}"),
                "chapterNumber": number,
                "verseNumber": verse,
                "arabicText": format!("arabic {number}:{verse}"),
                "translationText": format!("translation {number}:{verse}<sup foot_note=\"f{verse}\">1</sup>"),
                "audioByNarrator": {
                    "1": format!("https://cdn/1/{number:03}{verse:03}.mp3"),
                    "5": format!("https://cdn/5/{number:03}{verse:03}.mp3"),
                }
            })
        })
        .collect();
    serde_json::from_value(json!({
        "number": number,
        "name": format!("Chapter {number}"),
        "versesCount": count,
        "verses": verses,
        "audioByNarrator": {
            "1": format!("https://cdn/1/full/{number:03}.mp3"),
            "5": format!("https://cdn/5/full/{number:03}.mp3"),
        }
    }))
    .expect("chapter fixture parses")
}

pub struct FakeElement {
    index: usize,
    log: Rc<RefCell<Vec<String>>>,
    listener: RefCell<Option<MediaListener>>,
    paused: Cell<bool>,
    position: Cell<f64>,
    play_error: Cell<Option<MediaErrorKind>>,
}

impl FakeElement {
    pub fn emit(&self, event: MediaEvent) {
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(event);
        }
    }

    pub fn listener_snapshot(&self) -> Option<MediaListener> {
        self.listener.borrow().clone()
    }

    pub fn is_detached(&self) -> bool {
        self.listener.borrow().is_none()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }

    pub fn position(&self) -> f64 {
        self.position.get()
    }
}

impl MediaElement for FakeElement {
    fn play(&self) -> LocalBoxFuture<'static, Result<(), MediaErrorKind>> {
        self.paused.set(false);
        let outcome = match self.play_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        };
        async move {
            tokio::task::yield_now().await;
            outcome
        }
        .boxed_local()
    }

    fn pause(&self) {
        self.paused.set(true);
    }

    fn seek(&self, seconds: f64) {
        self.position.set(seconds);
    }

    fn set_listener(&self, listener: Option<MediaListener>) {
        if listener.is_none() {
            self.log.borrow_mut().push(format!("detach {}", self.index));
        }
        *self.listener.borrow_mut() = listener;
    }
}

/// Media backend double that keeps every element it hands out.
#[derive(Default)]
pub struct FakeMedia {
    elements: RefCell<Vec<Rc<FakeElement>>>,
    log: Rc<RefCell<Vec<String>>>,
    next_play_error: Cell<Option<MediaErrorKind>>,
}

impl FakeMedia {
    pub fn element(&self, index: usize) -> Rc<FakeElement> {
        self.elements.borrow()[index].clone()
    }

    pub fn created_count(&self) -> usize {
        self.elements.borrow().len()
    }

    /// Elements still wired to a channel.
    pub fn live_count(&self) -> usize {
        self.elements
            .borrow()
            .iter()
            .filter(|element| !element.is_detached())
            .count()
    }

    pub fn reject_next_play(&self, error: MediaErrorKind) {
        self.next_play_error.set(Some(error));
    }

    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl MediaBackend for FakeMedia {
    fn load(&self, url: &str) -> Rc<dyn MediaElement> {
        self.log.borrow_mut().push(format!("load {url}"));
        let element = Rc::new(FakeElement {
            index: self.elements.borrow().len(),
            log: self.log.clone(),
            listener: RefCell::new(None),
            paused: Cell::new(true),
            position: Cell::new(0.0),
            play_error: Cell::new(self.next_play_error.take()),
        });
        self.elements.borrow_mut().push(element.clone());
        element
    }
}

#[derive(Default)]
pub struct RecordingViewport {
    pub scrolled_to: RefCell<Vec<u32>>,
}

impl Viewport for RecordingViewport {
    fn scroll_to_verse(&self, verse: u32) {
        self.scrolled_to.borrow_mut().push(verse);
    }
}

/// Collects spawned session work until the test drains it.
#[derive(Default)]
pub struct QueuedSpawner {
    tasks: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
}

impl QueuedSpawner {
    /// Runs queued tasks, including any they spawn, to completion.
    pub async fn drain(&self) {
        loop {
            let batch = std::mem::take(&mut *self.tasks.borrow_mut());
            if batch.is_empty() {
                break;
            }
            futures_util::future::join_all(batch).await;
        }
    }
}

impl TaskSpawner for QueuedSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.tasks.borrow_mut().push(task);
    }
}
