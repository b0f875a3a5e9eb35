//! Journal name normalization.
//!
//! Turns a raw journal name as it appears on a Scholar page, in the dataset or in a
//! CrossRef `container-title` into a comparison key. The steps run in a fixed order
//! because the order decides which names collide:
//!
//! 1. uppercase
//! 2. `&` becomes `AND`
//! 3. the stop words `THE`, `OF`, `AND`, `FOR` are removed as whole words
//! 4. ellipsis markers (`…`, `...`) are removed
//! 5. everything outside `A-Z0-9` is removed
//!
//! A couple of helpers for cleaning scraped candidates live here as well.

use once_cell::sync::Lazy;
use regex::Regex;

// ASCII word boundaries: an accented letter does not shield an adjacent stop word
static STOP_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)(?:THE|OF|AND|FOR)(?-u:\b)").expect("valid stop word regex")
});

static ELLIPSIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\u{2026}|\.{3}").expect("valid ellipsis regex"));

static NON_KEY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Z0-9]").expect("valid key charset regex"));

static TRAILING_VOLUME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+(\d+(\s*\(\d+\))?|\(\d+\))$").expect("valid volume regex")
});

static HANGUL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ㄱ-ㅎㅏ-ㅣ가-힣]").expect("valid hangul regex"));

const STOP_WORD_LIST: [&str; 4] = ["THE", "OF", "AND", "FOR"];

/// Canonicalize a journal name into its lookup key.
///
/// Total for any input; empty input yields an empty key, which never matches.
///
/// # Examples
///
/// ```
/// use scholarif::normalize::normalize;
///
/// assert_eq!(normalize("Nature & Science"), normalize("NATURE AND SCIENCE"));
/// assert_eq!(normalize("The Journal of Physics"), "JOURNALPHYSICS");
/// ```
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let upper = raw.to_uppercase().replace('&', "AND");
    let without_stop_words = STOP_WORDS.replace_all(&upper, "");
    let without_ellipsis = ELLIPSIS.replace_all(&without_stop_words, "");
    let key = NON_KEY_CHARS
        .replace_all(&without_ellipsis, "")
        .trim()
        .to_string();

    // A key that spells a stop word on its own ("O.F") would be stripped on a second
    // pass, so it is empty from the start.
    if STOP_WORD_LIST.contains(&key.as_str()) {
        return String::new();
    }

    key
}

/// Whether scraped text was cut off by the page (`…` or `...`)
pub fn is_truncated(text: &str) -> bool {
    text.contains('\u{2026}') || text.contains("...")
}

/// Strip a trailing volume/issue suffix: `"Nature 521"`, `"Nature 521(7553)"`, `"Nature (3)"`
pub fn strip_volume(candidate: &str) -> String {
    TRAILING_VOLUME.replace(candidate, "").trim().to_string()
}

/// Whether the text contains Hangul (jamo or syllables)
pub fn contains_hangul(text: &str) -> bool {
    HANGUL.is_match(text)
}
