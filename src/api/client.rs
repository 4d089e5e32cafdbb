// HTTP client for the reading backend.
use crate::api::models::*;
use crate::error::{ReaderError, ReaderResult};
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// Backend operations the reading session depends on.
///
/// Futures are local (`!Send`): the session runs on the browser event loop.
pub trait ReaderApi {
    fn chapter(&self, chapter: u32) -> LocalBoxFuture<'_, ReaderResult<ChapterDetail>>;

    fn verse(&self, chapter: u32, verse: u32) -> LocalBoxFuture<'_, ReaderResult<Verse>>;

    fn footnote(&self, footnote_id: &str) -> LocalBoxFuture<'_, ReaderResult<String>>;

    fn bookmark_statuses(
        &self,
        verse_ids: &[String],
    ) -> LocalBoxFuture<'_, ReaderResult<HashMap<String, BookmarkFlags>>>;

    fn toggle_bookmark(&self, verse_id: &str) -> LocalBoxFuture<'_, ReaderResult<BookmarkFlags>>;

    fn toggle_favorite(&self, verse_id: &str) -> LocalBoxFuture<'_, ReaderResult<BookmarkFlags>>;
}

pub struct ReaderClient {
    base_url: String,
}

/// Status responses arrive as a bare map, a list, or a `{statuses: [..]}` wrapper.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusPayload {
    Wrapped { statuses: Vec<BookmarkStatus> },
    List(Vec<BookmarkStatus>),
    Map(HashMap<String, BookmarkFlags>),
}

impl StatusPayload {
    fn into_map(self) -> HashMap<String, BookmarkFlags> {
        match self {
            Self::Map(map) => map,
            Self::List(list) | Self::Wrapped { statuses: list } => list
                .into_iter()
                .map(|status| (status.verse_id, status.flags))
                .collect(),
        }
    }
}

impl ReaderClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_url(&self, path: &str) -> String {
        let base = if self.base_url.starts_with("http") {
            self.base_url.clone()
        } else {
            format!("{}{}", origin(), self.base_url)
        };
        format!("{base}/{}", path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ReaderResult<T> {
        let url = self.build_url(path);
        debug!(%url, "GET");
        let response = HTTP_CLIENT.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> ReaderResult<T> {
        let url = self.build_url(path);
        debug!(%url, "POST");
        let response = HTTP_CLIENT.post(&url).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ReaderResult<T> {
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %response.url(), "backend request failed");
            return Err(ReaderError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice::<T>(&bytes)?)
    }
}

#[cfg(target_arch = "wasm32")]
fn origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default()
}

#[cfg(not(target_arch = "wasm32"))]
fn origin() -> String {
    "http://localhost:8080".to_string()
}

impl ReaderApi for ReaderClient {
    fn chapter(&self, chapter: u32) -> LocalBoxFuture<'_, ReaderResult<ChapterDetail>> {
        async move { self.get_json(&format!("chapters/{chapter}")).await }.boxed_local()
    }

    fn verse(&self, chapter: u32, verse: u32) -> LocalBoxFuture<'_, ReaderResult<Verse>> {
        async move {
            self.get_json(&format!("chapters/{chapter}/verses/{verse}"))
                .await
        }
        .boxed_local()
    }

    fn footnote(&self, footnote_id: &str) -> LocalBoxFuture<'_, ReaderResult<String>> {
        let path = format!("footnotes/{}", urlencoding::encode(footnote_id));
        async move {
            let payload: FootnotePayload = self.get_json(&path).await?;
            Ok(payload.text)
        }
        .boxed_local()
    }

    fn bookmark_statuses(
        &self,
        verse_ids: &[String],
    ) -> LocalBoxFuture<'_, ReaderResult<HashMap<String, BookmarkFlags>>> {
        let joined = verse_ids
            .iter()
            .map(|id| urlencoding::encode(id).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        async move {
            let payload: StatusPayload =
                self.get_json(&format!("bookmarks/status?ids={joined}")).await?;
            Ok(payload.into_map())
        }
        .boxed_local()
    }

    fn toggle_bookmark(&self, verse_id: &str) -> LocalBoxFuture<'_, ReaderResult<BookmarkFlags>> {
        let path = format!("bookmarks/{}/toggle", urlencoding::encode(verse_id));
        async move { self.post_json(&path).await }.boxed_local()
    }

    fn toggle_favorite(&self, verse_id: &str) -> LocalBoxFuture<'_, ReaderResult<BookmarkFlags>> {
        let path = format!("favorites/{}/toggle", urlencoding::encode(verse_id));
        async move { self.post_json(&path).await }.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_joins_absolute_base() {
        let client = ReaderClient::new("https://api.example.org/v1/");
        assert_eq!(
            client.build_url("/chapters/2"),
            "https://api.example.org/v1/chapters/2"
        );
    }

    #[test]
    fn status_payload_accepts_map_and_list() {
        let map: StatusPayload =
            serde_json::from_str(r#"{"7": {"isBookmarked": true, "isFavorite": false}}"#)
                .expect("map payload");
        assert!(map.into_map()["7"].is_bookmarked);

        let list: StatusPayload = serde_json::from_str(
            r#"[{"verseId": 8, "isBookmarked": false, "isFavorite": true}]"#,
        )
        .expect("list payload");
        assert!(list.into_map()["8"].is_favorite);
    }
}
