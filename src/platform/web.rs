// Browser bindings: <audio> playback, History API, keyboard and popstate.
use super::UnsupportedMedia;
use crate::session::audio::{MediaBackend, MediaElement, MediaErrorKind, MediaEvent, MediaListener};
use crate::session::controller::Viewport;
use crate::session::navigation::{shortcut_action, HistoryPort, KeyPress};
use crate::session::SessionController;
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    window, CustomEvent, CustomEventInit, DomException, Event, HtmlAudioElement, KeyboardEvent,
    ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition,
};

/// Fired on `window` after every history write; `detail` is the new path.
pub const NAVIGATE_EVENT: &str = "versereader:navigate";

const MEDIA_EVENTS: [&str; 6] = [
    "playing",
    "pause",
    "ended",
    "error",
    "timeupdate",
    "durationchange",
];

type EventCallback = Closure<dyn FnMut(Event)>;

pub struct AudioBackend;

impl MediaBackend for AudioBackend {
    fn load(&self, url: &str) -> Rc<dyn MediaElement> {
        match HtmlAudioElement::new_with_src(url) {
            Ok(element) => {
                let _ = element.set_attribute("preload", "auto");
                Rc::new(WebAudio {
                    element,
                    callbacks: RefCell::new(Vec::new()),
                })
            }
            Err(err) => {
                warn!(?err, url, "failed to create audio element");
                Rc::new(UnsupportedMedia)
            }
        }
    }
}

struct WebAudio {
    element: HtmlAudioElement,
    callbacks: RefCell<Vec<(&'static str, EventCallback)>>,
}

impl WebAudio {
    fn detach(&self) {
        let callbacks = std::mem::take(&mut *self.callbacks.borrow_mut());
        if callbacks.is_empty() {
            return;
        }
        for (name, callback) in &callbacks {
            let _ = self
                .element
                .remove_event_listener_with_callback(name, callback.as_ref().unchecked_ref());
        }
        // Detaching usually happens inside one of these callbacks; drop them
        // once the current JS task has unwound.
        wasm_bindgen_futures::spawn_local(async move {
            drop(callbacks);
        });
    }
}

impl Drop for WebAudio {
    fn drop(&mut self) {
        self.detach();
    }
}

fn media_event(name: &str, element: &HtmlAudioElement) -> Option<MediaEvent> {
    match name {
        "playing" => Some(MediaEvent::Playing),
        "pause" => Some(MediaEvent::Paused),
        "ended" => Some(MediaEvent::Ended),
        "error" => {
            let code = element.error().map(|error| error.code()).unwrap_or(0);
            Some(MediaEvent::Failed(MediaErrorKind::from_code(code)))
        }
        "timeupdate" | "durationchange" => Some(MediaEvent::Progress {
            current_time: element.current_time(),
            duration: element.duration(),
        }),
        _ => None,
    }
}

fn play_rejection(err: &JsValue) -> MediaErrorKind {
    let name = match err.dyn_ref::<DomException>() {
        Some(exception) => Some(exception.name()),
        // Some engines reject with a plain `Error` carrying the same names.
        None => js_sys::Reflect::get(err, &JsValue::from_str("name"))
            .ok()
            .and_then(|name| name.as_string()),
    };
    name.map(|name| MediaErrorKind::from_exception_name(&name))
        .unwrap_or(MediaErrorKind::Unknown)
}

impl MediaElement for WebAudio {
    fn play(&self) -> LocalBoxFuture<'static, Result<(), MediaErrorKind>> {
        let promise: Result<js_sys::Promise, JsValue> = self.element.play();
        async move {
            let promise = promise.map_err(|err| play_rejection(&err))?;
            wasm_bindgen_futures::JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|err| play_rejection(&err))
        }
        .boxed_local()
    }

    fn pause(&self) {
        let _ = self.element.pause();
    }

    fn seek(&self, seconds: f64) {
        self.element.set_current_time(seconds);
    }

    fn set_listener(&self, listener: Option<MediaListener>) {
        self.detach();
        let Some(listener) = listener else {
            return;
        };
        let mut callbacks = self.callbacks.borrow_mut();
        for name in MEDIA_EVENTS {
            let element = self.element.clone();
            let listener = listener.clone();
            let callback = Closure::wrap(Box::new(move |_event: Event| {
                if let Some(event) = media_event(name, &element) {
                    listener(event);
                }
            }) as Box<dyn FnMut(Event)>);
            let _ = self
                .element
                .add_event_listener_with_callback(name, callback.as_ref().unchecked_ref());
            callbacks.push((name, callback));
        }
    }
}

/// `pushState`/`replaceState` without navigating, announced on `window`.
pub struct BrowserHistory;

impl BrowserHistory {
    fn write(&self, path: &str, push: bool) {
        let Some(win) = window() else {
            return;
        };
        let Ok(history) = win.history() else {
            return;
        };
        let result = if push {
            history.push_state_with_url(&JsValue::NULL, "", Some(path))
        } else {
            history.replace_state_with_url(&JsValue::NULL, "", Some(path))
        };
        if let Err(err) = result {
            warn!(?err, path, "history write failed");
            return;
        }

        let init = CustomEventInit::new();
        init.set_detail(&JsValue::from_str(path));
        if let Ok(event) = CustomEvent::new_with_event_init_dict(NAVIGATE_EVENT, &init) {
            let _ = win.dispatch_event(&event);
        }
    }
}

impl HistoryPort for BrowserHistory {
    fn current_path(&self) -> String {
        window()
            .and_then(|win| win.location().pathname().ok())
            .unwrap_or_else(|| "/".to_string())
    }

    fn push(&self, path: &str) {
        self.write(path, true);
    }

    fn replace(&self, path: &str) {
        self.write(path, false);
    }
}

pub fn history_port() -> Rc<dyn HistoryPort> {
    Rc::new(BrowserHistory)
}

pub struct PageViewport;

impl Viewport for PageViewport {
    fn scroll_to_verse(&self, verse: u32) {
        let Some(element) = window()
            .and_then(|win| win.document())
            .and_then(|doc| doc.get_element_by_id(&format!("verse-{verse}")))
        else {
            return;
        };
        let options = ScrollIntoViewOptions::new();
        options.set_behavior(ScrollBehavior::Smooth);
        options.set_block(ScrollLogicalPosition::Nearest);
        element.scroll_into_view_with_scroll_into_view_options(&options);
    }
}

fn is_editable_target(event: &KeyboardEvent) -> bool {
    let Some(target) = event.target() else {
        return false;
    };

    let mut current = target.dyn_into::<web_sys::Element>().ok();
    while let Some(element) = current {
        let tag = element.tag_name().to_ascii_lowercase();
        if tag == "input" || tag == "textarea" || tag == "select" {
            return true;
        }
        if element
            .get_attribute("contenteditable")
            .is_some_and(|value| value.to_ascii_lowercase() != "false")
        {
            return true;
        }
        current = element.parent_element();
    }

    false
}

fn key_press(event: &KeyboardEvent) -> KeyPress {
    KeyPress {
        key: event.key(),
        editable_target: is_editable_target(event),
        composing: event.is_composing(),
        modifiers: event.ctrl_key() || event.meta_key() || event.alt_key() || event.shift_key(),
    }
}

/// Keyboard shortcuts on `document` and back/forward on `window`. Both live
/// for the rest of the page.
pub fn install_browser_listeners(session: &SessionController) {
    let Some(win) = window() else {
        return;
    };

    if let Some(doc) = win.document() {
        let keys_session = session.clone();
        let key_cb = Closure::wrap(Box::new(move |event: KeyboardEvent| {
            if event.default_prevented() {
                return;
            }
            let Some(action) = shortcut_action(&key_press(&event)) else {
                return;
            };
            if !keys_session.accepts_shortcuts() {
                return;
            }
            event.prevent_default();
            keys_session.run(move |session| async move { session.handle_shortcut(action).await });
        }) as Box<dyn FnMut(KeyboardEvent)>);
        let _ = doc.add_event_listener_with_callback("keydown", key_cb.as_ref().unchecked_ref());
        key_cb.forget();
    }

    let history_session = session.clone();
    let pop_cb = Closure::wrap(Box::new(move |_event: Event| {
        debug!("popstate");
        history_session.run(|session| async move { session.follow_history().await });
    }) as Box<dyn FnMut(Event)>);
    let _ = win.add_event_listener_with_callback("popstate", pop_cb.as_ref().unchecked_ref());
    pop_cb.forget();
}
