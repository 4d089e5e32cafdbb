use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Ordered narrator id → audio URL mapping.
///
/// Backends ship this in several shapes (object keyed by numeric or named id,
/// array of URLs or of `{narrator, url}` records, a single URL string). All of
/// them collapse into this one type at deserialization time so nothing
/// downstream branches on shape. Numeric ids come first in numeric order,
/// named ids follow in the order they were received.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AudioSources(Vec<(String, String)>);

impl AudioSources {
    pub fn from_value(value: &Value) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();
        match value {
            Value::Object(map) => {
                for (key, item) in map {
                    if let Some(url) = url_from_value(item) {
                        entries.push((key.trim().to_string(), url));
                    }
                }
            }
            Value::Array(items) => {
                for (position, item) in items.iter().enumerate() {
                    let Some(url) = url_from_value(item) else {
                        continue;
                    };
                    let id = pick_string(item, &["narrator", "narratorId", "qari", "id"])
                        .unwrap_or_else(|| (position + 1).to_string());
                    entries.push((id, url));
                }
            }
            Value::String(_) => {
                if let Some(url) = url_from_value(value) {
                    entries.push(("default".to_string(), url));
                }
            }
            _ => {}
        }
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<(String, String)>) -> Self {
        let mut numeric: Vec<(u32, (String, String))> = Vec::new();
        let mut named: Vec<(String, String)> = Vec::new();
        for (id, url) in entries {
            if id.is_empty() || named.iter().any(|(seen, _)| *seen == id) {
                continue;
            }
            match id.parse::<u32>() {
                Ok(n) if !numeric.iter().any(|(seen, _)| *seen == n) => {
                    numeric.push((n, (id, url)))
                }
                Ok(_) => {}
                Err(_) => named.push((id, url)),
            }
        }
        numeric.sort_by_key(|(n, _)| *n);
        let mut ordered: Vec<(String, String)> =
            numeric.into_iter().map(|(_, entry)| entry).collect();
        ordered.extend(named);
        Self(ordered)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, narrator_id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(id, _)| id == narrator_id)
            .map(|(_, url)| url.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(id, _)| id.as_str())
    }
}

impl<'de> Deserialize<'de> for AudioSources {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

fn url_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Object(_) => pick_string(value, &["url", "audio_url", "audioUrl", "src"]),
        _ => None,
    }
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    let object = value.as_object()?;
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// Accepts ids sent either as JSON strings or numbers.
pub(crate) fn de_lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text.trim().to_string()),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    #[serde(deserialize_with = "de_lenient_id")]
    pub id: String,
    #[serde(alias = "chapterNumber", alias = "surah")]
    pub chapter_number: u32,
    #[serde(alias = "verseNumber", alias = "ayah")]
    pub verse_number: u32,
    #[serde(default, alias = "arabicText", alias = "text")]
    pub arabic_text: String,
    #[serde(default, alias = "translationText", alias = "translation")]
    pub translation_text: String,
    #[serde(default)]
    pub transliteration: Option<String>,
    #[serde(default, alias = "tafsir")]
    pub commentary: Option<String>,
    #[serde(default, alias = "audioByNarrator", alias = "audio_by_narrator")]
    pub audio: AudioSources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterDetail {
    #[serde(alias = "chapterNumber", alias = "id")]
    pub number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "translatedName")]
    pub translated_name: Option<String>,
    #[serde(default, alias = "versesCount", alias = "numberOfAyahs")]
    pub verses_count: u32,
    #[serde(default)]
    pub verses: Vec<Verse>,
    #[serde(default, alias = "audioByNarrator", alias = "recitations")]
    pub audio: AudioSources,
}

impl ChapterDetail {
    /// Total verses, trusting whichever of the declared count and the payload
    /// is larger; partial payloads are completed verse by verse.
    pub fn verse_count(&self) -> u32 {
        let loaded = self
            .verses
            .iter()
            .map(|verse| verse.verse_number)
            .max()
            .unwrap_or(0);
        self.verses_count.max(loaded)
    }
}

/// Bookmark/favorite flags; the server is authoritative for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookmarkFlags {
    #[serde(default, alias = "isBookmarked")]
    pub is_bookmarked: bool,
    #[serde(default, alias = "isFavorite")]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkStatus {
    #[serde(alias = "verseId", deserialize_with = "de_lenient_id")]
    pub verse_id: String,
    #[serde(flatten)]
    pub flags: BookmarkFlags,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct FootnotePayload {
    #[serde(default, alias = "content", alias = "body")]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_keys_sort_numeric_first() {
        let sources = AudioSources::from_value(&json!({
            "10": "https://cdn/10.mp3",
            "alafasy": "https://cdn/a.mp3",
            "2": "https://cdn/2.mp3",
        }));
        let ids: Vec<&str> = sources.ids().collect();
        assert_eq!(ids, vec!["2", "10", "alafasy"]);
    }

    #[test]
    fn array_of_records_uses_narrator_field() {
        let sources = AudioSources::from_value(&json!([
            { "narrator": "sudais", "url": "https://cdn/s.mp3" },
            { "qari": 5, "audio_url": "https://cdn/5.mp3" },
            "https://cdn/third.mp3",
        ]));
        assert_eq!(sources.get("sudais"), Some("https://cdn/s.mp3"));
        assert_eq!(sources.get("5"), Some("https://cdn/5.mp3"));
        assert_eq!(sources.get("3"), Some("https://cdn/third.mp3"));
    }

    #[test]
    fn single_string_and_blank_urls() {
        let single = AudioSources::from_value(&json!("https://cdn/only.mp3"));
        assert_eq!(single.get("default"), Some("https://cdn/only.mp3"));

        let blank = AudioSources::from_value(&json!({ "1": "  ", "2": null }));
        assert!(blank.is_empty());
    }

    #[test]
    fn verse_accepts_camel_case_and_numeric_id() {
        let verse: Verse = serde_json::from_value(json!({
            "id": 262,
            "chapterNumber": 2,
            "verseNumber": 255,
            "arabicText": "...",
            "translationText": "Allah - there is no deity except Him",
            "audioByNarrator": { "1": "https://cdn/1/002255.mp3" }
        }))
        .expect("verse should parse");
        assert_eq!(verse.id, "262");
        assert_eq!(verse.verse_number, 255);
        assert_eq!(verse.audio.get("1"), Some("https://cdn/1/002255.mp3"));
        assert!(verse.commentary.is_none());
    }

    #[test]
    fn partial_payload_reports_declared_count() {
        let chapter: ChapterDetail = serde_json::from_value(json!({
            "number": 2,
            "name": "Al-Baqarah",
            "versesCount": 286,
            "verses": []
        }))
        .expect("chapter should parse");
        assert_eq!(chapter.verse_count(), 286);
    }
}
