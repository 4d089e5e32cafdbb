// Desktop builds have no DOM access from Rust: audio reports every source as
// unsupported and history lives in memory.
use super::UnsupportedMedia;
use crate::session::audio::{MediaBackend, MediaElement};
use crate::session::controller::Viewport;
use crate::session::navigation::{HistoryPort, MemoryHistory};
use crate::session::SessionController;
use std::rc::Rc;
use tracing::debug;

pub struct AudioBackend;

impl MediaBackend for AudioBackend {
    fn load(&self, url: &str) -> Rc<dyn MediaElement> {
        debug!(url, "audio playback is not available on this target");
        Rc::new(UnsupportedMedia)
    }
}

pub struct PageViewport;

impl Viewport for PageViewport {
    fn scroll_to_verse(&self, _verse: u32) {}
}

pub fn history_port() -> Rc<dyn HistoryPort> {
    Rc::new(MemoryHistory::new("/"))
}

pub fn install_browser_listeners(_session: &SessionController) {}
