//! Narrator (reciter) resolution for a loaded chapter.

use crate::api::models::{AudioSources, ChapterDetail, Verse};
use crate::utils::title_case;

/// Reciters the backend identifies by number.
const NUMBERED_NARRATORS: &[(u32, &str)] = &[
    (1, "Abdullah Al-Juhany"),
    (2, "Abdul Muhsin Al-Qasim"),
    (3, "Abdurrahman As-Sudais"),
    (4, "Ibrahim Al-Dossari"),
    (5, "Mishary Rashid Alafasy"),
    (6, "Saad Al-Ghamdi"),
    (7, "Maher Al-Muaiqly"),
    (8, "Abdul Basit Abdul Samad"),
    (9, "Mahmoud Khalil Al-Husary"),
    (10, "Muhammad Siddiq Al-Minshawi"),
];

/// Reciters the backend identifies by slug.
const NAMED_NARRATORS: &[(&str, &str)] = &[
    ("alafasy", "Mishary Rashid Alafasy"),
    ("sudais", "Abdurrahman As-Sudais"),
    ("husary", "Mahmoud Khalil Al-Husary"),
    ("minshawi", "Muhammad Siddiq Al-Minshawi"),
    ("abdul_basit", "Abdul Basit Abdul Samad"),
    ("ghamdi", "Saad Al-Ghamdi"),
    ("muaiqly", "Maher Al-Muaiqly"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narrator {
    pub id: String,
    pub display_name: String,
}

pub fn display_name(id: &str) -> String {
    if let Ok(number) = id.parse::<u32>() {
        return NUMBERED_NARRATORS
            .iter()
            .find(|(known, _)| *known == number)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("Narrator #{number}"));
    }
    let key = id.trim().to_ascii_lowercase().replace('-', "_");
    NAMED_NARRATORS
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| title_case(id))
}

pub fn narrators_from(sources: &AudioSources) -> Vec<Narrator> {
    sources
        .ids()
        .map(|id| Narrator {
            id: id.to_string(),
            display_name: display_name(id),
        })
        .collect()
}

/// Narrator list for the current chapter plus the active selection.
#[derive(Debug, Default)]
pub struct NarratorRegistry {
    narrators: Vec<Narrator>,
    selected: Option<String>,
}

impl NarratorRegistry {
    pub fn new(preferred: Option<String>) -> Self {
        Self {
            narrators: Vec::new(),
            selected: preferred,
        }
    }

    /// Rebuilds the list from a freshly loaded chapter. Availability is taken
    /// from the first verse that has audio, then from the chapter-level
    /// recitations. Returns `true` when the selection had to fall back.
    pub fn refresh(&mut self, chapter: &ChapterDetail) -> bool {
        let sources = chapter
            .verses
            .iter()
            .map(|verse| &verse.audio)
            .find(|audio| !audio.is_empty())
            .unwrap_or(&chapter.audio);
        self.narrators = narrators_from(sources);

        let keeps_selection = self
            .selected
            .as_deref()
            .is_some_and(|id| self.narrators.iter().any(|n| n.id == id));
        if keeps_selection {
            return false;
        }
        let fallback = self.narrators.first().map(|n| n.id.clone());
        let changed = fallback != self.selected;
        self.selected = fallback;
        changed
    }

    pub fn select(&mut self, id: &str) -> bool {
        if !self.narrators.iter().any(|n| n.id == id) {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    pub fn narrators(&self) -> &[Narrator] {
        &self.narrators
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn verse_url<'a>(&self, verse: &'a Verse) -> Option<&'a str> {
        verse.audio.get(self.selected.as_deref()?)
    }

    pub fn chapter_url<'a>(&self, chapter: &'a ChapterDetail) -> Option<&'a str> {
        chapter.audio.get(self.selected.as_deref()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chapter_with_audio(audio: serde_json::Value) -> ChapterDetail {
        serde_json::from_value(json!({
            "number": 1,
            "name": "Al-Fatihah",
            "versesCount": 1,
            "verses": [{
                "id": 1,
                "chapterNumber": 1,
                "verseNumber": 1,
                "audioByNarrator": audio
            }]
        }))
        .expect("chapter fixture")
    }

    #[test]
    fn numeric_ids_use_lookup_table_then_fallback() {
        assert_eq!(display_name("5"), "Mishary Rashid Alafasy");
        assert_eq!(display_name("42"), "Narrator #42");
    }

    #[test]
    fn named_ids_are_mapped_or_title_cased() {
        assert_eq!(display_name("Sudais"), "Abdurrahman As-Sudais");
        assert_eq!(display_name("yasser_al-dosari"), "Yasser Al Dosari");
    }

    #[test]
    fn missing_selection_falls_back_to_first() {
        let mut registry = NarratorRegistry::new(Some("9".to_string()));
        let changed = registry.refresh(&chapter_with_audio(json!({
            "3": "https://cdn/3.mp3",
            "1": "https://cdn/1.mp3"
        })));

        assert!(changed);
        assert_eq!(registry.selected_id(), Some("1"));
        assert_eq!(registry.narrators().len(), 2);
    }

    #[test]
    fn present_selection_is_kept() {
        let mut registry = NarratorRegistry::new(Some("3".to_string()));
        let changed = registry.refresh(&chapter_with_audio(json!({
            "1": "https://cdn/1.mp3",
            "3": "https://cdn/3.mp3"
        })));
        assert!(!changed);
        assert_eq!(registry.selected_id(), Some("3"));
    }

    #[test]
    fn empty_audio_clears_selection_without_panicking() {
        let mut registry = NarratorRegistry::new(Some("1".to_string()));
        registry.refresh(&chapter_with_audio(json!({})));
        assert!(registry.selected_id().is_none());
        assert!(!registry.select("1"));
    }
}
