// src/ingest/mod.rs
pub mod content;
pub mod rss;
pub mod types;

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

/// Clean feed/article text: decode entities, strip tags, drop control characters,
/// collapse whitespace.
pub fn sanitize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z!][^>]*>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Control characters out (whitespace ones become spaces below)
    out.retain(|c| !c.is_control() || c.is_whitespace());

    // 5) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// True when `published` falls inside the recency window ending at `now`.
pub fn is_recent(published: DateTime<Utc>, now: DateTime<Utc>, window_days: i64) -> bool {
    published >= now - Duration::days(window_days)
}

/// Truncate to at most `max` chars without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sanitize_strips_markup_and_collapses_ws() {
        let s = "  <p>Hello,&nbsp;&nbsp; <b>world</b></p>\u{0007}\n\t “ok” ";
        assert_eq!(sanitize_text(s), r#"Hello, world "ok""#);
    }

    #[test]
    fn sanitize_keeps_comparison_signs_in_plain_text() {
        assert_eq!(sanitize_text("3 < 5 and 7 > 2"), "3 < 5 and 7 > 2");
    }

    #[test]
    fn recency_window_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        assert!(is_recent(now - Duration::days(3), now, 3));
        assert!(!is_recent(now - Duration::days(3) - Duration::seconds(1), now, 3));
        assert!(is_recent(now, now, 3));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
