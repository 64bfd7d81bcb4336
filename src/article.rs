// src/article.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::ReportCategory;

/// One feed entry after the recency filter and content resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateArticle {
    pub headline: String,
    pub link: String,
    pub published: DateTime<Utc>,
    /// Fetched full text if it was the longer one, else the feed summary.
    pub body: String,
    pub top_image: Option<String>,
}

/// A relevant, summarized article ready for the audit log and the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedArticle {
    pub headline: String,
    pub link: String,
    pub published: DateTime<Utc>,
    pub summary: String,
    pub matched_keyword: String,
    pub keyword_group: String,
    pub category: ReportCategory,
    pub score: u32,
    pub top_image: Option<String>,
    /// Position of the feed in the run and of the entry in its feed; fixes dedup order.
    pub feed_index: usize,
    pub entry_index: usize,
}
