// src/tokenize.rs
use once_cell::sync::OnceCell;
use regex::Regex;

/// Split text into lower-cased `[a-z]` word tokens.
///
/// Every maximal run of non-letters becomes a single separator. Text with no
/// letters at all yields no tokens (not a single empty token).
/// No unicode case folding or stemming happens here.
pub fn tokenize(text: &str) -> Vec<String> {
    static RE_NON_ALPHA: OnceCell<Regex> = OnceCell::new();
    let re = RE_NON_ALPHA.get_or_init(|| Regex::new(r"[^a-z]+").unwrap());

    let lowered = text.to_lowercase();
    let spaced = re.replace_all(&lowered, " ");
    spaced
        .trim()
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}
