//! Routes of the reader. Every route renders the same reader; the path only
//! decides what the session opens first.

use crate::components::{AppShell, ReaderEntry};
use crate::session::navigation::chapter_path;
use dioxus::prelude::*;

#[derive(Routable, Clone, PartialEq, Debug)]
#[rustfmt::skip]
pub enum AppView {
    #[layout(AppShell)]
        #[route("/")]
        Home {},
        #[route("/chapter/:chapter")]
        Chapter { chapter: u32 },
        #[route("/chapter/:chapter/:verse")]
        ChapterVerse { chapter: u32, verse: String },
        #[route("/:..segments")]
        Unknown { segments: Vec<String> },
}

#[component]
fn Home() -> Element {
    rsx! {
        ReaderEntry { path: "/".to_string() }
    }
}

#[component]
fn Chapter(chapter: u32) -> Element {
    rsx! {
        ReaderEntry { path: chapter_path(chapter) }
    }
}

#[component]
fn ChapterVerse(chapter: u32, verse: String) -> Element {
    // The verse segment stays raw; the session clamps or ignores it.
    rsx! {
        ReaderEntry { path: format!("{}/{verse}", chapter_path(chapter)) }
    }
}

#[component]
fn Unknown(segments: Vec<String>) -> Element {
    tracing::debug!(path = %segments.join("/"), "unknown route, opening home");
    rsx! {
        ReaderEntry { path: "/".to_string() }
    }
}
