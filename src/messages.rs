//! User-facing strings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    pub fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    AudioAborted,
    AudioNetwork,
    AudioDecode,
    AudioUnsupported,
    AudioUnknown,
    AudioUnavailable,
    FootnoteUnavailable,
    BookmarkFailed,
    ChapterLoadFailed,
    Retry,
    PreviousVerse,
    NextVerse,
    PlayVerse,
    PlayChapter,
    StopAudio,
    Bookmark,
    Favorite,
    Narrator,
    Language,
    SmallerText,
    DefaultTextSize,
    LargerText,
    Commentary,
    Dismiss,
}

pub fn text(locale: Locale, message: Message) -> &'static str {
    match locale {
        Locale::En => match message {
            Message::AudioAborted => {
                "Playback was aborted before the audio loaded. Try another narrator."
            }
            Message::AudioNetwork => {
                "Network error while loading the recitation. Try another narrator."
            }
            Message::AudioDecode => "The recitation could not be decoded. Try another narrator.",
            Message::AudioUnsupported => {
                "This recitation format is not supported. Try another narrator."
            }
            Message::AudioUnknown => "Unable to play this recitation. Try another narrator.",
            Message::AudioUnavailable => "No recitation is available for this narrator.",
            Message::FootnoteUnavailable => "Footnote unavailable.",
            Message::BookmarkFailed => "Could not update the bookmark. Please try again.",
            Message::ChapterLoadFailed => "The chapter could not be loaded.",
            Message::Retry => "Retry",
            Message::PreviousVerse => "Previous verse",
            Message::NextVerse => "Next verse",
            Message::PlayVerse => "Play verse",
            Message::PlayChapter => "Play chapter",
            Message::StopAudio => "Stop audio",
            Message::Bookmark => "Bookmark",
            Message::Favorite => "Favorite",
            Message::Narrator => "Narrator",
            Message::Language => "Language",
            Message::SmallerText => "Smaller text",
            Message::DefaultTextSize => "Default text size",
            Message::LargerText => "Larger text",
            Message::Commentary => "Commentary",
            Message::Dismiss => "Dismiss",
        },
        Locale::Ar => match message {
            Message::AudioAborted => "توقف التشغيل قبل تحميل الصوت. جرّب قارئًا آخر.",
            Message::AudioNetwork => "خطأ في الشبكة أثناء تحميل التلاوة. جرّب قارئًا آخر.",
            Message::AudioDecode => "تعذّر فك ترميز التلاوة. جرّب قارئًا آخر.",
            Message::AudioUnsupported => "صيغة التلاوة غير مدعومة. جرّب قارئًا آخر.",
            Message::AudioUnknown => "تعذّر تشغيل التلاوة. جرّب قارئًا آخر.",
            Message::AudioUnavailable => "لا تتوفر تلاوة لهذا القارئ.",
            Message::FootnoteUnavailable => "الحاشية غير متاحة.",
            Message::BookmarkFailed => "تعذّر تحديث العلامة. حاول مرة أخرى.",
            Message::ChapterLoadFailed => "تعذّر تحميل السورة.",
            Message::Retry => "إعادة المحاولة",
            Message::PreviousVerse => "الآية السابقة",
            Message::NextVerse => "الآية التالية",
            Message::PlayVerse => "تشغيل الآية",
            Message::PlayChapter => "تشغيل السورة",
            Message::StopAudio => "إيقاف الصوت",
            Message::Bookmark => "علامة مرجعية",
            Message::Favorite => "المفضلة",
            Message::Narrator => "القارئ",
            Message::Language => "اللغة",
            Message::SmallerText => "تصغير الخط",
            Message::DefaultTextSize => "حجم الخط الافتراضي",
            Message::LargerText => "تكبير الخط",
            Message::Commentary => "التفسير",
            Message::Dismiss => "إغلاق",
        },
    }
}
