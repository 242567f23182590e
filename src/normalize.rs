use once_cell::sync::Lazy;
use regex::Regex;

/// Edition/format words that mark the start of a trailing annotation.
pub const BOILERPLATE_KEYWORDS: [&str; 10] = [
    "anniversary",
    "edition",
    "illustrated",
    "collector",
    "gift",
    "pack",
    "hardcover",
    "paperback",
    "kindle",
    "ebook",
];

// Everything from the first boilerplate word to the end of the string is dropped.
static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    let words = BOILERPLATE_KEYWORDS.join("|");
    Regex::new(&format!(r"(?s)\b(?:{words})\b.*")).unwrap()
});

/// Canonical comparable form of a title: lowercase, edition annotations cut,
/// punctuation turned into spaces, whitespace collapsed.
///
/// The function is idempotent: feeding its output back in returns the same
/// string.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    if lowered.is_empty() {
        return String::new();
    }
    // Punctuation goes first so that word boundaries seen by the keyword
    // pattern are the same ones a second pass would see.
    let spaced: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    let cut = match BOILERPLATE_RE.find(&spaced) {
        Some(m) => &spaced[..m.start()],
        None => spaced.as_str(),
    };
    cut.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Same as [`normalize_title`] for a table cell that may be missing.
pub fn normalize_cell(cell: Option<&str>) -> String {
    cell.map(normalize_title).unwrap_or_default()
}
