use crate::components::{Icon, SessionRevision};
use crate::messages::{text, Locale, Message};
use crate::session::audio::ChannelState;
use crate::session::markup::TranslationSegment;
use crate::session::{FootnoteView, Notice, SessionController, SessionPhase, VerseView};
use crate::utils::format_timestamp;
use dioxus::prelude::*;

const NOTICE_TIMEOUT_MS: u32 = 6_000;

/// Mounted by every route. Opens `path` the first time the session is asked
/// for anything; later route changes come from the session itself.
#[component]
pub fn ReaderEntry(path: String) -> Element {
    let session = use_context::<SessionController>();
    use_hook(|| {
        if session.view().phase == SessionPhase::Idle {
            session.open_location(path.clone());
        }
    });

    rsx! {
        ReaderView {}
    }
}

#[component]
pub fn ReaderView() -> Element {
    let session = use_context::<SessionController>();
    let revision = use_context::<SessionRevision>().0;
    let _ = revision();
    let view = session.view();
    let locale = view.locale;
    let (other_locale, other_locale_label) = match locale {
        Locale::En => (Locale::Ar, "ع"),
        Locale::Ar => (Locale::En, "EN"),
    };

    let body = match view.phase.clone() {
        SessionPhase::Idle | SessionPhase::Loading { .. } => rsx! {
            div { class: "reader-status",
                Icon { name: "loader".to_string(), class: "w-8 h-8".to_string() }
            }
        },
        SessionPhase::Failed { chapter, message } => rsx! {
            div { class: "reader-status reader-status--error",
                Icon { name: "alert".to_string(), class: "w-10 h-10".to_string() }
                p { class: "reader-status__message", "{message}" }
                button {
                    class: "reader-button",
                    onclick: {
                        let session = session.clone();
                        move |_| {
                            tracing::debug!(chapter, "retrying chapter load");
                            session.run(|s| async move { s.retry().await });
                        }
                    },
                    "{text(locale, Message::Retry)}"
                }
            }
        },
        SessionPhase::Ready => {
            let can_go_previous = view.can_go_previous();
            let can_go_next = view.can_go_next();
            let verse_playing = view.verse_channel.is_active();
            rsx! {
                header { class: "reader-header",
                    div {
                        h1 { class: "reader-title", "{view.chapter_name}" }
                        if let Some(translated) = view.translated_name.clone() {
                            p { class: "reader-subtitle", "{translated}" }
                        }
                    }
                    span { class: "reader-progress", "{view.cursor} / {view.verse_count}" }
                    FontControls { locale }
                    button {
                        class: "reader-icon-button",
                        aria_label: text(locale, Message::Language),
                        onclick: {
                            let session = session.clone();
                            move |_| session.set_locale(other_locale)
                        },
                        "{other_locale_label}"
                    }
                    if !view.narrators.is_empty() {
                        select {
                            class: "narrator-select",
                            aria_label: text(locale, Message::Narrator),
                            onchange: {
                                let session = session.clone();
                                move |e: Event<FormData>| {
                                    let narrator_id = e.value();
                                    session.run(move |s| async move {
                                        s.select_narrator(&narrator_id).await;
                                    });
                                }
                            },
                            for narrator in view.narrators.iter() {
                                option {
                                    key: "{narrator.id}",
                                    value: "{narrator.id}",
                                    selected: view.selected_narrator.as_deref() == Some(narrator.id.as_str()),
                                    "{narrator.display_name}"
                                }
                            }
                        }
                    }
                }

                match view.verse.clone() {
                    Some(verse) => rsx! {
                        VerseCard {
                            verse,
                            locale,
                            font_size: view.font_size,
                            footnote_panel: view.footnote_panel.clone(),
                            tooltip: view.tooltip.clone(),
                        }
                    },
                    None => rsx! {
                        div { class: "verse-card verse-card--loading",
                            if view.verse_loading {
                                Icon { name: "loader".to_string(), class: "w-6 h-6".to_string() }
                            }
                        }
                    },
                }

                nav { class: "verse-controls",
                    button {
                        class: "reader-icon-button",
                        aria_label: text(locale, Message::PreviousVerse),
                        disabled: !can_go_previous,
                        onclick: {
                            let session = session.clone();
                            move |_| session.run(|s| async move {
                                s.previous().await;
                            })
                        },
                        Icon { name: "prev".to_string(), class: "w-5 h-5".to_string() }
                    }
                    button {
                        class: "reader-icon-button reader-icon-button--primary",
                        aria_label: text(locale, Message::PlayVerse),
                        disabled: !view.verse.as_ref().is_some_and(|verse| verse.has_audio),
                        onclick: {
                            let session = session.clone();
                            move |_| session.run(|s| async move { s.toggle_verse_audio().await })
                        },
                        if verse_playing {
                            Icon { name: "pause".to_string(), class: "w-6 h-6".to_string() }
                        } else {
                            Icon { name: "play".to_string(), class: "w-6 h-6".to_string() }
                        }
                    }
                    button {
                        class: "reader-icon-button",
                        aria_label: text(locale, Message::NextVerse),
                        disabled: !can_go_next,
                        onclick: {
                            let session = session.clone();
                            move |_| session.run(|s| async move {
                                s.next().await;
                            })
                        },
                        Icon { name: "next".to_string(), class: "w-5 h-5".to_string() }
                    }
                }

                if view.chapter_audio_available {
                    ChapterAudioBar { channel: view.chapter_channel.clone(), locale }
                }
            }
        }
    };

    rsx! {
        section { class: "reader",
            {body}
            if let Some(notice) = view.notice.clone() {
                NoticeToast { key: "{notice.id}", notice, locale }
            }
        }
    }
}

#[component]
fn FontControls(locale: Locale) -> Element {
    let session = use_context::<SessionController>();
    rsx! {
        div { class: "font-controls",
            button {
                class: "reader-icon-button",
                aria_label: text(locale, Message::SmallerText),
                onclick: {
                    let session = session.clone();
                    move |_| session.decrease_font()
                },
                Icon { name: "minus".to_string(), class: "w-4 h-4".to_string() }
            }
            button {
                class: "reader-icon-button",
                aria_label: text(locale, Message::DefaultTextSize),
                onclick: {
                    let session = session.clone();
                    move |_| session.reset_font()
                },
                "A"
            }
            button {
                class: "reader-icon-button",
                aria_label: text(locale, Message::LargerText),
                onclick: move |_| session.increase_font(),
                Icon { name: "plus".to_string(), class: "w-4 h-4".to_string() }
            }
        }
    }
}

#[component]
fn VerseCard(
    verse: VerseView,
    locale: Locale,
    font_size: u32,
    footnote_panel: Option<FootnoteView>,
    tooltip: Option<FootnoteView>,
) -> Element {
    let session = use_context::<SessionController>();
    let number = verse.number;
    let flags = verse.flags.unwrap_or_default();
    let dir = if locale.is_rtl() { "rtl" } else { "ltr" };
    let panel = footnote_panel.filter(|note| note.verse == number);
    let tooltip = tooltip.filter(|note| note.verse == number);

    rsx! {
        article {
            id: "verse-{number}",
            class: "verse-card",
            style: "font-size: {font_size}px",
            p { class: "verse-arabic", dir: "rtl", lang: "ar", "{verse.arabic_text}" }
            if let Some(transliteration) = verse.transliteration.clone() {
                p { class: "verse-transliteration", "{transliteration}" }
            }
            p { class: "verse-translation", dir,
                for segment in verse.segments.iter().cloned() {
                    match segment {
                        TranslationSegment::Text(content) => rsx! {
                            span { "{content}" }
                        },
                        TranslationSegment::Footnote { id, label } => rsx! {
                            FootnoteMarker { verse: number, footnote_id: id, label }
                        },
                    }
                }
            }
            if let Some(note) = tooltip {
                FootnoteNote { note, locale, class: "footnote-tooltip".to_string() }
            }
            if let Some(note) = panel {
                FootnoteNote { note, locale, class: "footnote-panel".to_string() }
            }
            if let Some(commentary) = verse.commentary.clone() {
                details { class: "verse-commentary",
                    summary { "{text(locale, Message::Commentary)}" }
                    p { "{commentary}" }
                }
            }
            footer { class: "verse-actions",
                span { class: "verse-number", "{number}" }
                if verse.bookmark_pending {
                    Icon { name: "loader".to_string(), class: "w-4 h-4".to_string() }
                }
                button {
                    class: "reader-icon-button",
                    aria_label: text(locale, Message::Bookmark),
                    aria_pressed: "{flags.is_bookmarked}",
                    disabled: verse.bookmark_pending,
                    onclick: {
                        let session = session.clone();
                        let verse_id = verse.id.clone();
                        move |_| {
                            let verse_id = verse_id.clone();
                            session.run(move |s| async move { s.toggle_bookmark(&verse_id).await })
                        }
                    },
                    if flags.is_bookmarked {
                        Icon { name: "bookmark-filled".to_string(), class: "w-5 h-5".to_string() }
                    } else {
                        Icon { name: "bookmark".to_string(), class: "w-5 h-5".to_string() }
                    }
                }
                button {
                    class: "reader-icon-button",
                    aria_label: text(locale, Message::Favorite),
                    aria_pressed: "{flags.is_favorite}",
                    disabled: verse.bookmark_pending,
                    onclick: {
                        let verse_id = verse.id.clone();
                        move |_| {
                            let verse_id = verse_id.clone();
                            session.run(move |s| async move { s.toggle_favorite(&verse_id).await })
                        }
                    },
                    if flags.is_favorite {
                        Icon { name: "heart-filled".to_string(), class: "w-5 h-5".to_string() }
                    } else {
                        Icon { name: "heart".to_string(), class: "w-5 h-5".to_string() }
                    }
                }
            }
        }
    }
}

#[component]
fn FootnoteMarker(verse: u32, footnote_id: String, label: String) -> Element {
    let session = use_context::<SessionController>();
    rsx! {
        sup {
            class: "footnote-marker",
            role: "button",
            tabindex: "0",
            onclick: {
                let session = session.clone();
                let footnote_id = footnote_id.clone();
                move |_| {
                    let footnote_id = footnote_id.clone();
                    session.run(move |s| async move {
                        s.toggle_inline_footnote(verse, &footnote_id).await
                    })
                }
            },
            onmouseenter: {
                let session = session.clone();
                move |_| {
                    let footnote_id = footnote_id.clone();
                    session.run(move |s| async move { s.hover_footnote(verse, &footnote_id).await })
                }
            },
            onmouseleave: move |_| session.leave_footnote(),
            "{label}"
        }
    }
}

#[component]
fn FootnoteNote(note: FootnoteView, locale: Locale, class: String) -> Element {
    let dir = if locale.is_rtl() { "rtl" } else { "ltr" };
    rsx! {
        aside { class: "{class}", dir, role: "note",
            match note.content {
                Some(content) => rsx! {
                    p { class: if note.failed { "footnote-text footnote-text--failed" } else { "footnote-text" }, "{content}" }
                },
                None if note.loading => rsx! {
                    Icon { name: "loader".to_string(), class: "w-4 h-4".to_string() }
                },
                None => rsx! {
                    p { class: "footnote-text footnote-text--failed",
                        "{text(locale, Message::FootnoteUnavailable)}"
                    }
                },
            }
        }
    }
}

#[component]
fn ChapterAudioBar(channel: ChannelState, locale: Locale) -> Element {
    let session = use_context::<SessionController>();
    let playing = channel.is_active();
    let position = format_timestamp(channel.current_time);
    let duration = format_timestamp(channel.duration);
    let max = if channel.duration.is_finite() && channel.duration > 0.0 {
        channel.duration
    } else {
        0.0
    };

    let on_seek_input = {
        let session = session.clone();
        move |e: Event<FormData>| {
            if let Ok(seconds) = e.value().parse::<f64>() {
                session.seek_chapter(seconds);
            }
        }
    };

    rsx! {
        div { class: "chapter-audio",
            button {
                class: "reader-icon-button reader-icon-button--primary",
                aria_label: text(locale, Message::PlayChapter),
                onclick: {
                    let session = session.clone();
                    move |_| session.run(|s| async move { s.toggle_chapter_audio().await })
                },
                if playing {
                    Icon { name: "pause".to_string(), class: "w-5 h-5".to_string() }
                } else {
                    Icon { name: "play".to_string(), class: "w-5 h-5".to_string() }
                }
            }
            span { class: "chapter-audio__time", "{position}" }
            input {
                r#type: "range",
                class: "chapter-audio__seek",
                min: "0",
                max: "{max}",
                step: "1",
                value: "{channel.current_time}",
                disabled: max <= 0.0,
                oninput: on_seek_input,
            }
            span { class: "chapter-audio__time", "{duration}" }
            button {
                class: "reader-icon-button",
                aria_label: text(locale, Message::StopAudio),
                onclick: move |_| session.stop_audio(),
                Icon { name: "stop".to_string(), class: "w-4 h-4".to_string() }
            }
        }
    }
}

#[component]
fn NoticeToast(notice: Notice, locale: Locale) -> Element {
    let session = use_context::<SessionController>();
    let id = notice.id;

    use_hook({
        let session = session.clone();
        move || {
            spawn(async move {
                notice_delay().await;
                session.dismiss_notice(id);
            });
        }
    });

    rsx! {
        div { class: "notice", role: "alert",
            Icon { name: "alert".to_string(), class: "w-5 h-5".to_string() }
            span { class: "notice__text", "{notice.text}" }
            button {
                class: "reader-icon-button",
                aria_label: text(locale, Message::Dismiss),
                onclick: move |_| session.dismiss_notice(id),
                Icon { name: "x".to_string(), class: "w-4 h-4".to_string() }
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
async fn notice_delay() {
    gloo_timers::future::TimeoutFuture::new(NOTICE_TIMEOUT_MS).await;
}

#[cfg(not(target_arch = "wasm32"))]
async fn notice_delay() {
    tokio::time::sleep(std::time::Duration::from_millis(u64::from(NOTICE_TIMEOUT_MS))).await;
}
