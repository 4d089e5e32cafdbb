//! Environment bindings for the session ports.

use crate::api::ReaderClient;
use crate::db::{api_base_url, open_default_store};
use crate::session::audio::{MediaElement, MediaErrorKind, MediaListener};
use crate::session::{SessionPorts, TaskSpawner};
use dioxus::core::{spawn_forever, Runtime, RuntimeGuard};
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::*;

#[cfg(not(target_arch = "wasm32"))]
mod native;
#[cfg(not(target_arch = "wasm32"))]
pub use native::*;

/// Spawns session work on the Dioxus runtime that created it, so callers
/// outside a component scope (DOM listeners, media callbacks) can use it too.
pub struct DioxusSpawner {
    runtime: Rc<Runtime>,
}

impl DioxusSpawner {
    pub fn current() -> Self {
        Self {
            runtime: Runtime::current(),
        }
    }
}

impl TaskSpawner for DioxusSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        let _guard = RuntimeGuard::new(self.runtime.clone());
        let _ = spawn_forever(task);
    }
}

/// Stand-in resource for a source that cannot be played at all.
pub struct UnsupportedMedia;

impl MediaElement for UnsupportedMedia {
    fn play(&self) -> LocalBoxFuture<'static, Result<(), MediaErrorKind>> {
        async { Err(MediaErrorKind::Unsupported) }.boxed_local()
    }

    fn pause(&self) {}

    fn seek(&self, _seconds: f64) {}

    fn set_listener(&self, _listener: Option<MediaListener>) {}
}

/// Production ports for the current target. Must run inside the Dioxus
/// runtime.
pub fn default_ports() -> SessionPorts {
    SessionPorts {
        api: Rc::new(ReaderClient::new(api_base_url())),
        media: Rc::new(AudioBackend),
        history: history_port(),
        store: open_default_store(),
        viewport: Rc::new(PageViewport),
        spawner: Rc::new(DioxusSpawner::current()),
    }
}
