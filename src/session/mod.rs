//! The reading session: everything between the backend and the view.

pub mod audio;
pub mod bookmarks;
pub mod controller;
pub mod epoch;
pub mod footnotes;
pub mod markup;
pub mod narrators;
pub mod navigation;
pub mod positions;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    FootnoteView, Notice, SessionController, SessionPhase, SessionPorts, TaskSpawner, VerseView,
};
