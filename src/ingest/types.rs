// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Raw entry as delivered by a feed, already text-sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    /// Best-effort; `None` when the feed had no parseable date.
    pub published: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Entries of one feed. Network failures are errors; malformed XML yields
    /// whatever parsed before the problem.
    async fn fetch_entries(&self, feed_url: &str) -> Result<Vec<FeedEntry>>;
    fn name(&self) -> &'static str;
}

/// Article body and lead image resolved from the article page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchedContent {
    pub text: String,
    pub top_image: Option<String>,
}

#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Never fails: returns an empty [`FetchedContent`] when the page is unavailable.
    async fn fetch(&self, url: &str) -> FetchedContent;
}
