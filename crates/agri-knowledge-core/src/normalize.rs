//! Text cleanup applied to article bodies before chunking.
//!
//! Order matters: whitespace is collapsed first so URL matching sees single
//! spaces, URLs are stripped before punctuation filtering (which would
//! otherwise break them into word-like fragments), and whitespace is
//! collapsed again at the end.

use std::sync::OnceLock;

use regex::Regex;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[a-zA-Z0-9$-_@.&+!*(),\\]+").expect("static regex"))
}

fn disallowed_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s.,!?-]").expect("static regex"))
}

fn collapse_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text.trim(), " ").into_owned()
}

/// Clean raw text for chunking and embedding.
///
/// 1. Collapse whitespace runs to a single space and trim.
/// 2. Strip `http://` / `https://` URLs.
/// 3. Replace characters other than word characters, whitespace and
///    `. , ! ? -` with a space.
/// 4. Collapse whitespace again.
///
/// Pure and total: any input yields a (possibly empty) string.
///
/// ```rust
/// use agri_knowledge_core::normalize::normalize;
///
/// assert_eq!(
///     normalize("  Rice  (Oryza) — see https://example.org/rice  "),
///     "Rice Oryza see"
/// );
/// ```
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = collapse_whitespace(text);
    let text = url_re().replace_all(&text, "");
    let text = disallowed_re().replace_all(&text, " ");
    collapse_whitespace(&text)
}
