// src/dedup.rs
//! Cross-feed deduplication by normalized headline. First occurrence wins.

use std::collections::HashSet;

use crate::article::MatchedArticle;

/// Lowercase + trim. Two headlines are the same story iff these are equal.
pub fn normalize_headline(headline: &str) -> String {
    headline.trim().to_lowercase()
}

/// Verdict for one headline offered to a [`HeadlineDeduper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Fresh,
    Duplicate,
    EmptyHeadline,
}

/// Streaming deduplicator: keeps the set of headlines seen so far plus drop counters.
#[derive(Debug, Default)]
pub struct HeadlineDeduper {
    seen: HashSet<String>,
    pub duplicates: usize,
    pub empty_headlines: usize,
}

impl HeadlineDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, headline: &str) -> Admission {
        let key = normalize_headline(headline);
        if key.is_empty() {
            self.empty_headlines += 1;
            return Admission::EmptyHeadline;
        }
        if self.seen.insert(key) {
            Admission::Fresh
        } else {
            self.duplicates += 1;
            Admission::Duplicate
        }
    }
}

/// Batch result: kept items in input order plus how many were dropped and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupOutcome<T> {
    pub kept: Vec<T>,
    pub duplicates: usize,
    pub empty_headlines: usize,
}

/// Order-preserving dedup over any item with a headline.
pub fn dedupe_by<T, F>(items: Vec<T>, headline: F) -> DedupOutcome<T>
where
    F: Fn(&T) -> &str,
{
    let mut d = HeadlineDeduper::new();
    let mut kept = Vec::with_capacity(items.len());
    for it in items {
        if d.admit(headline(&it)) == Admission::Fresh {
            kept.push(it);
        }
    }
    DedupOutcome {
        kept,
        duplicates: d.duplicates,
        empty_headlines: d.empty_headlines,
    }
}

pub fn dedupe(articles: Vec<MatchedArticle>) -> DedupOutcome<MatchedArticle> {
    dedupe_by(articles, |a| a.headline.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(v: &[&str]) -> DedupOutcome<String> {
        dedupe_by(v.iter().map(|s| s.to_string()).collect(), |s| s.as_str())
    }

    #[test]
    fn case_and_whitespace_variants_collapse_to_first() {
        let out = run(&["Charity Drive Launched", " charity drive launched "]);
        assert_eq!(out.kept, vec!["Charity Drive Launched".to_string()]);
        assert_eq!(out.duplicates, 1);
    }

    #[test]
    fn preserves_first_seen_order() {
        let out = run(&["b", "a", "B", "c", "a "]);
        assert_eq!(out.kept, vec!["b", "a", "c"]);
        assert_eq!(out.duplicates, 2);
    }

    #[test]
    fn empty_headlines_are_dropped_and_counted_separately() {
        let out = run(&["", "   ", "x"]);
        assert_eq!(out.kept, vec!["x"]);
        assert_eq!(out.empty_headlines, 2);
        assert_eq!(out.duplicates, 0);
    }

    #[test]
    fn idempotent() {
        let once = run(&["A", "b", "a", " B", "c", ""]);
        let twice = dedupe_by(once.kept.clone(), |s| s.as_str());
        assert_eq!(once.kept, twice.kept);
        assert_eq!(twice.duplicates, 0);
        assert_eq!(twice.empty_headlines, 0);
    }

    #[test]
    fn streaming_admission() {
        let mut d = HeadlineDeduper::new();
        assert_eq!(d.admit("Hello"), Admission::Fresh);
        assert_eq!(d.admit("HELLO "), Admission::Duplicate);
        assert_eq!(d.admit(" "), Admission::EmptyHeadline);
        assert_eq!((d.duplicates, d.empty_headlines), (1, 1));
    }
}
