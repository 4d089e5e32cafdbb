//! Audio Channel Manager - owns the verse and chapter playback channels.
//! Only this module touches media resources; everything else goes through
//! play/pause/resume/stop/seek on a channel.

use crate::messages::Message;
use futures_util::future::LocalBoxFuture;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Verse,
    Chapter,
}

impl ChannelKind {
    pub fn other(self) -> Self {
        match self {
            Self::Verse => Self::Chapter,
            Self::Chapter => Self::Verse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelState {
    pub status: ChannelStatus,
    pub source_url: Option<String>,
    pub associated_id: Option<String>,
    pub current_time: f64,
    pub duration: f64,
}

impl ChannelState {
    /// Loading or playing: the channel is producing (or about to produce) sound.
    pub fn is_active(&self) -> bool {
        matches!(self.status, ChannelStatus::Loading | ChannelStatus::Playing)
    }
}

/// Media failure classes, keyed by the platform `MediaError.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    Aborted,
    Network,
    Decode,
    Unsupported,
    Unknown,
}

impl MediaErrorKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Aborted,
            2 => Self::Network,
            3 => Self::Decode,
            4 => Self::Unsupported,
            _ => Self::Unknown,
        }
    }

    /// Classifies a rejected `play()` promise by its DOMException name.
    pub fn from_exception_name(name: &str) -> Self {
        match name {
            "AbortError" | "NotAllowedError" => Self::Aborted,
            "NotSupportedError" => Self::Unsupported,
            "NetworkError" => Self::Network,
            "EncodingError" => Self::Decode,
            _ => Self::Unknown,
        }
    }

    pub fn message(self) -> Message {
        match self {
            Self::Aborted => Message::AudioAborted,
            Self::Network => Message::AudioNetwork,
            Self::Decode => Message::AudioDecode,
            Self::Unsupported => Message::AudioUnsupported,
            Self::Unknown => Message::AudioUnknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    Playing,
    Paused,
    Ended,
    Failed(MediaErrorKind),
    Progress { current_time: f64, duration: f64 },
}

pub type MediaListener = Rc<dyn Fn(MediaEvent)>;

/// One underlying audio resource bound to a single source URL.
pub trait MediaElement {
    fn play(&self) -> LocalBoxFuture<'static, Result<(), MediaErrorKind>>;
    fn pause(&self);
    fn seek(&self, seconds: f64);
    /// Replaces the event callback; `None` detaches it.
    fn set_listener(&self, listener: Option<MediaListener>);
}

pub trait MediaBackend {
    fn load(&self, url: &str) -> Rc<dyn MediaElement>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackFailure {
    pub channel: ChannelKind,
    pub kind: MediaErrorKind,
    pub url: Option<String>,
}

struct ActiveMedia {
    token: u64,
    element: Rc<dyn MediaElement>,
}

#[derive(Default)]
struct Channel {
    state: ChannelState,
    media: Option<ActiveMedia>,
}

impl Channel {
    fn holds(&self, token: u64) -> bool {
        self.media.as_ref().is_some_and(|media| media.token == token)
    }

    fn element(&self) -> Option<Rc<dyn MediaElement>> {
        self.media.as_ref().map(|media| media.element.clone())
    }

    /// Detaches the resource; the caller releases it outside any borrow.
    fn take(&mut self) -> Option<ActiveMedia> {
        self.state = ChannelState::default();
        self.media.take()
    }
}

#[derive(Default)]
struct ChannelsInner {
    verse: Channel,
    chapter: Channel,
    next_token: u64,
    failure: Option<PlaybackFailure>,
}

impl ChannelsInner {
    fn channel(&self, kind: ChannelKind) -> &Channel {
        match kind {
            ChannelKind::Verse => &self.verse,
            ChannelKind::Chapter => &self.chapter,
        }
    }

    fn channel_mut(&mut self, kind: ChannelKind) -> &mut Channel {
        match kind {
            ChannelKind::Verse => &mut self.verse,
            ChannelKind::Chapter => &mut self.chapter,
        }
    }
}

/// Teardown order: callbacks first, then pause, then rewind. The resource
/// has already been removed from its channel, so anything still in flight
/// for it fails the token check.
fn release(media: Option<ActiveMedia>) {
    if let Some(media) = media {
        media.element.set_listener(None);
        media.element.pause();
        media.element.seek(0.0);
    }
}

enum PlayPlan {
    Pause,
    Resume,
    Ignore,
    Fresh,
}

type ChangeListener = Rc<RefCell<Option<Rc<dyn Fn()>>>>;

#[derive(Clone)]
pub struct AudioChannels {
    inner: Rc<RefCell<ChannelsInner>>,
    backend: Rc<dyn MediaBackend>,
    on_change: ChangeListener,
}

impl AudioChannels {
    pub fn new(backend: Rc<dyn MediaBackend>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChannelsInner::default())),
            backend,
            on_change: Rc::new(RefCell::new(None)),
        }
    }

    pub fn set_on_change(&self, listener: Rc<dyn Fn()>) {
        *self.on_change.borrow_mut() = Some(listener);
    }

    pub fn state(&self, kind: ChannelKind) -> ChannelState {
        self.inner.borrow().channel(kind).state.clone()
    }

    pub fn failure(&self) -> Option<PlaybackFailure> {
        self.inner.borrow().failure.clone()
    }

    pub fn clear_failure(&self) {
        self.inner.borrow_mut().failure = None;
    }

    /// Plays `url` on `kind`. When `url` is already loaded on that channel this
    /// toggles instead: playing pauses, paused resumes, loading is left alone.
    pub async fn play(&self, kind: ChannelKind, url: &str, associated_id: Option<&str>) {
        let plan = {
            let inner = self.inner.borrow();
            let channel = inner.channel(kind);
            if channel.media.is_some() && channel.state.source_url.as_deref() == Some(url) {
                match channel.state.status {
                    ChannelStatus::Playing => PlayPlan::Pause,
                    ChannelStatus::Paused => PlayPlan::Resume,
                    ChannelStatus::Loading => PlayPlan::Ignore,
                    ChannelStatus::Idle => PlayPlan::Fresh,
                }
            } else {
                PlayPlan::Fresh
            }
        };

        match plan {
            PlayPlan::Pause => self.pause(kind),
            PlayPlan::Resume => self.resume(kind).await,
            PlayPlan::Ignore => debug!(?kind, "play ignored while source is loading"),
            PlayPlan::Fresh => self.start(kind, url, associated_id).await,
        }
    }

    async fn start(&self, kind: ChannelKind, url: &str, associated_id: Option<&str>) {
        let (other, previous, token) = {
            let mut inner = self.inner.borrow_mut();
            let other = inner.channel_mut(kind.other()).take();
            let previous = inner.channel_mut(kind).take();
            inner.failure = None;
            inner.next_token += 1;
            (other, previous, inner.next_token)
        };
        release(other);
        release(previous);

        let element = self.backend.load(url);
        element.set_listener(Some(self.listener(kind, token)));
        {
            let mut inner = self.inner.borrow_mut();
            let channel = inner.channel_mut(kind);
            channel.media = Some(ActiveMedia {
                token,
                element: element.clone(),
            });
            channel.state = ChannelState {
                status: ChannelStatus::Loading,
                source_url: Some(url.to_string()),
                associated_id: associated_id.map(str::to_string),
                current_time: 0.0,
                duration: 0.0,
            };
        }
        debug!(?kind, url, "audio source attached");
        self.notify();
        self.await_play(kind, token, element).await;
    }

    pub fn pause(&self, kind: ChannelKind) {
        let element = {
            let mut inner = self.inner.borrow_mut();
            let channel = inner.channel_mut(kind);
            if !channel.state.is_active() {
                return;
            }
            channel.state.status = ChannelStatus::Paused;
            channel.element()
        };
        if let Some(element) = element {
            element.pause();
        }
        self.notify();
    }

    pub async fn resume(&self, kind: ChannelKind) {
        let (other, resumed) = {
            let mut inner = self.inner.borrow_mut();
            let channel = inner.channel(kind);
            if channel.state.status != ChannelStatus::Paused {
                return;
            }
            let Some(media) = channel.media.as_ref() else {
                return;
            };
            let resumed = (media.token, media.element.clone());
            let other = inner.channel_mut(kind.other()).take();
            inner.channel_mut(kind).state.status = ChannelStatus::Loading;
            (other, resumed)
        };
        release(other);
        self.notify();
        let (token, element) = resumed;
        self.await_play(kind, token, element).await;
    }

    pub fn stop(&self, kind: ChannelKind) {
        let media = {
            let mut inner = self.inner.borrow_mut();
            let channel = inner.channel_mut(kind);
            if channel.media.is_none() && channel.state.status == ChannelStatus::Idle {
                return;
            }
            channel.take()
        };
        release(media);
        self.notify();
    }

    /// Moves the live resource's playhead; never reloads the source.
    pub fn seek(&self, kind: ChannelKind, seconds: f64) {
        let (element, target) = {
            let mut inner = self.inner.borrow_mut();
            let channel = inner.channel_mut(kind);
            let Some(element) = channel.element() else {
                return;
            };
            let mut target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
            if channel.state.duration > 0.0 {
                target = target.min(channel.state.duration);
            }
            channel.state.current_time = target;
            (element, target)
        };
        element.seek(target);
        self.notify();
    }

    pub fn shutdown(&self) {
        let (verse, chapter) = {
            let mut inner = self.inner.borrow_mut();
            (inner.verse.take(), inner.chapter.take())
        };
        release(verse);
        release(chapter);
    }

    async fn await_play(&self, kind: ChannelKind, token: u64, element: Rc<dyn MediaElement>) {
        let result = element.play().await;
        let (changed, stale) = {
            let mut inner = self.inner.borrow_mut();
            let channel = inner.channel_mut(kind);
            // Only a still-current, still-loading channel takes the outcome;
            // a pause issued meanwhile makes the rejected promise irrelevant.
            if !channel.holds(token) || channel.state.status != ChannelStatus::Loading {
                (false, None)
            } else {
                match result {
                    Ok(()) => {
                        channel.state.status = ChannelStatus::Playing;
                        (true, None)
                    }
                    Err(error) => {
                        let url = channel.state.source_url.clone();
                        let media = channel.take();
                        warn!(?kind, ?error, "play() rejected");
                        inner.failure = Some(PlaybackFailure {
                            channel: kind,
                            kind: error,
                            url,
                        });
                        (true, media)
                    }
                }
            }
        };
        release(stale);
        if changed {
            self.notify();
        }
    }

    fn listener(&self, kind: ChannelKind, token: u64) -> MediaListener {
        let inner = Rc::downgrade(&self.inner);
        let on_change = self.on_change.clone();
        Rc::new(move |event: MediaEvent| {
            if handle_event(&inner, kind, token, event) {
                let listener = on_change.borrow().clone();
                if let Some(listener) = listener {
                    listener();
                }
            }
        })
    }

    fn notify(&self) {
        let listener = self.on_change.borrow().clone();
        if let Some(listener) = listener {
            listener();
        }
    }
}

/// Applies a media event if it belongs to the channel's current resource.
/// Returns whether observable state changed.
fn handle_event(
    inner: &Weak<RefCell<ChannelsInner>>,
    kind: ChannelKind,
    token: u64,
    event: MediaEvent,
) -> bool {
    let Some(inner) = inner.upgrade() else {
        return false;
    };
    let mut released = Vec::new();
    let changed = {
        let mut guard = inner.borrow_mut();
        if !guard.channel(kind).holds(token) {
            return false;
        }
        let changed = match event {
            MediaEvent::Progress {
                current_time,
                duration,
            } => {
                let state = &mut guard.channel_mut(kind).state;
                state.current_time = current_time;
                if duration.is_finite() && duration > 0.0 {
                    state.duration = duration;
                }
                true
            }
            MediaEvent::Playing => {
                if guard.channel(kind.other()).state.status == ChannelStatus::Playing {
                    released.push(guard.channel_mut(kind.other()).take());
                }
                let state = &mut guard.channel_mut(kind).state;
                let changed = state.status != ChannelStatus::Playing;
                state.status = ChannelStatus::Playing;
                changed
            }
            MediaEvent::Paused => {
                let state = &mut guard.channel_mut(kind).state;
                if state.status == ChannelStatus::Playing {
                    state.status = ChannelStatus::Paused;
                    true
                } else {
                    false
                }
            }
            MediaEvent::Ended => {
                released.push(guard.channel_mut(kind).take());
                true
            }
            MediaEvent::Failed(error) => {
                let url = guard.channel(kind).state.source_url.clone();
                released.push(guard.channel_mut(kind).take());
                warn!(?kind, ?error, "media error");
                guard.failure = Some(PlaybackFailure {
                    channel: kind,
                    kind: error,
                    url,
                });
                true
            }
        };
        changed
    };
    for media in released {
        release(media);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::FakeMedia;

    fn channels() -> (AudioChannels, Rc<FakeMedia>) {
        let media = Rc::new(FakeMedia::default());
        (AudioChannels::new(media.clone()), media)
    }

    fn playing_count(audio: &AudioChannels) -> usize {
        [ChannelKind::Verse, ChannelKind::Chapter]
            .into_iter()
            .filter(|kind| audio.state(*kind).status == ChannelStatus::Playing)
            .count()
    }

    #[tokio::test]
    async fn play_reaches_playing_state() {
        let (audio, media) = channels();
        audio
            .play(ChannelKind::Verse, "https://cdn/1/001001.mp3", Some("1"))
            .await;

        let state = audio.state(ChannelKind::Verse);
        assert_eq!(state.status, ChannelStatus::Playing);
        assert_eq!(state.associated_id.as_deref(), Some("1"));
        assert_eq!(media.live_count(), 1);
    }

    #[tokio::test]
    async fn same_url_toggles_without_second_resource() {
        let (audio, media) = channels();
        let url = "https://cdn/1/001002.mp3";

        audio.play(ChannelKind::Verse, url, Some("2")).await;
        audio.play(ChannelKind::Verse, url, Some("2")).await;
        assert_eq!(audio.state(ChannelKind::Verse).status, ChannelStatus::Paused);

        audio.play(ChannelKind::Verse, url, Some("2")).await;
        assert_eq!(audio.state(ChannelKind::Verse).status, ChannelStatus::Playing);
        assert_eq!(media.created_count(), 1);
        assert_eq!(media.live_count(), 1);
    }

    #[tokio::test]
    async fn rapid_presses_while_loading_create_one_resource() {
        let (audio, media) = channels();
        let url = "https://cdn/1/001003.mp3";

        futures_util::join!(
            audio.play(ChannelKind::Verse, url, Some("3")),
            audio.play(ChannelKind::Verse, url, Some("3")),
            audio.play(ChannelKind::Verse, url, Some("3")),
        );

        assert_eq!(media.created_count(), 1);
        assert_eq!(audio.state(ChannelKind::Verse).status, ChannelStatus::Playing);
    }

    #[tokio::test]
    async fn starting_chapter_stops_verse_first() {
        let (audio, media) = channels();
        audio
            .play(ChannelKind::Verse, "https://cdn/1/001001.mp3", Some("1"))
            .await;
        audio
            .play(ChannelKind::Chapter, "https://cdn/full/001.mp3", Some("1"))
            .await;

        assert_eq!(audio.state(ChannelKind::Verse), ChannelState::default());
        assert_eq!(audio.state(ChannelKind::Chapter).status, ChannelStatus::Playing);
        assert_eq!(playing_count(&audio), 1);

        let verse_element = media.element(0);
        assert!(verse_element.is_detached());
        assert!(verse_element.is_paused());
        assert_eq!(verse_element.position(), 0.0);
        // The verse resource was released before the chapter source existed.
        assert_eq!(media.log()[..2], ["load https://cdn/1/001001.mp3", "detach 0"]);
    }

    #[tokio::test]
    async fn media_error_forces_idle_and_records_failure() {
        let (audio, media) = channels();
        audio
            .play(ChannelKind::Chapter, "https://cdn/full/002.mp3", Some("2"))
            .await;
        media.element(0).emit(MediaEvent::Failed(MediaErrorKind::from_code(3)));

        assert_eq!(audio.state(ChannelKind::Chapter).status, ChannelStatus::Idle);
        let failure = audio.failure().expect("failure recorded");
        assert_eq!(failure.kind, MediaErrorKind::Decode);
        assert_eq!(failure.channel, ChannelKind::Chapter);
    }

    #[tokio::test]
    async fn rejected_play_promise_is_classified() {
        let (audio, media) = channels();
        media.reject_next_play(MediaErrorKind::from_exception_name("NotSupportedError"));
        audio
            .play(ChannelKind::Verse, "https://cdn/x.ogg", Some("1"))
            .await;

        assert_eq!(audio.state(ChannelKind::Verse).status, ChannelStatus::Idle);
        assert_eq!(
            audio.failure().map(|f| f.kind),
            Some(MediaErrorKind::Unsupported)
        );
        assert_eq!(media.live_count(), 0);
    }

    #[tokio::test]
    async fn late_events_from_replaced_resource_are_ignored() {
        let (audio, media) = channels();
        audio
            .play(ChannelKind::Verse, "https://cdn/1/001001.mp3", Some("1"))
            .await;
        let stale_listener = media.element(0).listener_snapshot();
        audio
            .play(ChannelKind::Verse, "https://cdn/1/001002.mp3", Some("2"))
            .await;

        let listener = stale_listener.expect("listener was attached");
        listener(MediaEvent::Ended);
        listener(MediaEvent::Failed(MediaErrorKind::Network));

        let state = audio.state(ChannelKind::Verse);
        assert_eq!(state.status, ChannelStatus::Playing);
        assert_eq!(state.associated_id.as_deref(), Some("2"));
        assert!(audio.failure().is_none());
    }

    #[tokio::test]
    async fn seek_updates_live_resource_in_place() {
        let (audio, media) = channels();
        audio
            .play(ChannelKind::Chapter, "https://cdn/full/036.mp3", Some("36"))
            .await;
        media.element(0).emit(MediaEvent::Progress {
            current_time: 12.0,
            duration: 600.0,
        });

        audio.seek(ChannelKind::Chapter, 240.0);
        audio.seek(ChannelKind::Chapter, 9_000.0);

        assert_eq!(media.element(0).position(), 600.0);
        assert_eq!(audio.state(ChannelKind::Chapter).current_time, 600.0);
        assert_eq!(media.created_count(), 1);
    }

    #[tokio::test]
    async fn verse_after_chapter_keeps_single_playing_channel() {
        let (audio, _media) = channels();
        let verse_url = "https://cdn/1/001001.mp3";
        audio.play(ChannelKind::Verse, verse_url, Some("1")).await;
        audio.pause(ChannelKind::Verse);

        // Chapter start tears the paused verse down entirely.
        audio
            .play(ChannelKind::Chapter, "https://cdn/full/001.mp3", Some("1"))
            .await;
        assert_eq!(audio.state(ChannelKind::Verse).status, ChannelStatus::Idle);

        audio.play(ChannelKind::Verse, verse_url, Some("1")).await;
        assert_eq!(audio.state(ChannelKind::Chapter).status, ChannelStatus::Idle);
        assert_eq!(playing_count(&audio), 1);
    }

    #[tokio::test]
    async fn ended_event_returns_channel_to_idle() {
        let (audio, media) = channels();
        audio
            .play(ChannelKind::Verse, "https://cdn/1/001007.mp3", Some("7"))
            .await;
        media.element(0).emit(MediaEvent::Ended);

        assert_eq!(audio.state(ChannelKind::Verse).status, ChannelStatus::Idle);
        assert!(audio.failure().is_none());
        assert_eq!(media.live_count(), 0);
    }
}
