use crate::api::ReaderApi;
use crate::messages::{text, Locale, Message};
use chrono::{DateTime, Utc};
use futures_util::future::{LocalBoxFuture, Shared};
use futures_util::FutureExt;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteEntry {
    pub id: String,
    pub content: String,
    pub fetched_at: DateTime<Utc>,
    /// The request failed and `content` is the localized placeholder.
    pub failed: bool,
}

type PendingFetch = Shared<LocalBoxFuture<'static, FootnoteEntry>>;

/// Session-wide footnote cache shared by the inline panel and the tooltip.
///
/// Concurrent callers for the same id await one shared request. Failures are
/// cached too, so a burst of hovers over a broken footnote costs a single
/// request per session.
pub struct FootnoteCache {
    api: Rc<dyn ReaderApi>,
    locale: Cell<Locale>,
    entries: RefCell<HashMap<String, FootnoteEntry>>,
    in_flight: RefCell<HashMap<String, PendingFetch>>,
}

impl FootnoteCache {
    pub fn new(api: Rc<dyn ReaderApi>, locale: Locale) -> Self {
        Self {
            api,
            locale: Cell::new(locale),
            entries: RefCell::new(HashMap::new()),
            in_flight: RefCell::new(HashMap::new()),
        }
    }

    pub fn set_locale(&self, locale: Locale) {
        self.locale.set(locale);
    }

    pub fn peek(&self, id: &str) -> Option<FootnoteEntry> {
        self.entries.borrow().get(id).cloned()
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.in_flight.borrow().contains_key(id)
    }

    pub async fn fetch(&self, id: &str) -> FootnoteEntry {
        if let Some(entry) = self.peek(id) {
            return entry;
        }

        let existing = self.in_flight.borrow().get(id).cloned();
        let pending = match existing {
            Some(pending) => pending,
            None => {
                let pending = self.start_request(id);
                self.in_flight
                    .borrow_mut()
                    .insert(id.to_string(), pending.clone());
                pending
            }
        };

        let entry = pending.await;
        self.in_flight.borrow_mut().remove(id);
        self.entries
            .borrow_mut()
            .entry(id.to_string())
            .or_insert_with(|| entry.clone());
        entry
    }

    fn start_request(&self, id: &str) -> PendingFetch {
        let api = self.api.clone();
        let id = id.to_string();
        let placeholder = text(self.locale.get(), Message::FootnoteUnavailable);
        async move {
            match api.footnote(&id).await {
                Ok(content) => FootnoteEntry {
                    id,
                    content,
                    fetched_at: Utc::now(),
                    failed: false,
                },
                Err(err) => {
                    warn!(%err, footnote = %id, "footnote fetch failed");
                    FootnoteEntry {
                        id,
                        content: placeholder.to_string(),
                        fetched_at: Utc::now(),
                        failed: true,
                    }
                }
            }
        }
        .boxed_local()
        .shared()
    }
}
