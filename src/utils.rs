/// Utility helpers for VerseReader

/// Title-case an identifier such as `abdul_basit` or `saad-al-ghamdi`.
/// Separators (`_`, `-`, whitespace) become single spaces; each word gets an
/// uppercase first letter and keeps the rest of its letters lowercased.
pub fn title_case<S: AsRef<str>>(s: S) -> String {
    s.as_ref()
        .split(|ch: char| ch == '_' || ch == '-' || ch.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `mm:ss` for the chapter seek bar. Non-finite input renders as `--:--`.
pub fn format_timestamp(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "--:--".to_string();
    }
    let total = seconds.max(0.0).round() as u32;
    let mins = total / 60;
    let secs = total % 60;
    format!("{mins:02}:{secs:02}")
}
