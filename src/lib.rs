// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod article;
pub mod audit;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod digest;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod relevance;
pub mod summarizer;
pub mod taxonomy;

// ---- Re-exports for stable public API ----
pub use crate::article::{CandidateArticle, MatchedArticle};
pub use crate::classify::{classify, ReportCategory};
pub use crate::dedup::{dedupe, normalize_headline};
pub use crate::digest::{Digest, DigestRenderer, Highlighter, RenderedDigest};
pub use crate::notify::{DigestNotifier, NotifierMux};
pub use crate::pipeline::{Collaborators, EntryOutcome, Pipeline, RunReport};
pub use crate::relevance::{KeywordMatch, RelevanceScorer, ScoreResult};
pub use crate::summarizer::{Summarizer, SummaryOutcome};
pub use crate::taxonomy::{KeywordGroup, Taxonomy, TaxonomyError};
