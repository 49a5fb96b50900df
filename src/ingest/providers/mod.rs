// src/ingest/providers/mod.rs
pub mod mbox;
pub mod rss;

use once_cell::sync::OnceCell;
use regex::Regex;

pub use mbox::MboxFeedSource;
pub use rss::RssFeedSource;

/// Clean feed-supplied text: decode HTML entities, strip tags, ASCII quotes,
/// collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_strips_markup_and_whitespace() {
        let s = "  <p>Hello&nbsp;&nbsp;<b>world</b></p>\n\n &ldquo;ok&rdquo; ";
        assert_eq!(clean_text(s), r#"Hello world "ok""#);
    }
}
