// src/pipeline.rs
//! Per-run orchestration: feeds in order, entries in order, one call at a time.
//! Entry path: date filter -> content resolution -> scoring -> summary -> accept.

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::article::{CandidateArticle, MatchedArticle};
use crate::audit::{AuditRow, DynAuditLog};
use crate::classify::classify;
use crate::config::monitor::{PacingSettings, PipelineSettings};
use crate::dedup::dedupe;
use crate::ingest::types::{ContentFetcher, FeedEntry, FeedSource};
use crate::ingest::{is_recent, truncate_chars};
use crate::relevance::SharedScorer;
use crate::summarizer::{DynSummarizer, SummaryOutcome};
use crate::taxonomy::Taxonomy;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_entries_total", "Feed entries examined.");
        describe_counter!(
            "pipeline_rejected_total",
            "Entries dropped, labelled by reason."
        );
        describe_counter!("pipeline_accepted_total", "Entries accepted (before dedup).");
        describe_counter!("pipeline_feed_errors_total", "Feeds that failed to load.");
        describe_counter!(
            "pipeline_dedup_dropped_total",
            "Accepted articles removed as duplicate or empty headlines."
        );
        describe_counter!("audit_errors_total", "Audit rows that could not be written.");
        describe_histogram!("pipeline_feed_ms", "Wall time per feed in milliseconds.");
    });
}

/// External services the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub feeds: Arc<dyn FeedSource>,
    pub fetcher: Arc<dyn ContentFetcher>,
    pub summarizer: DynSummarizer,
    pub audit: DynAuditLog,
}

/// Where one entry ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Undated,
    Stale,
    MissingLink,
    ThinContent,
    NoMatch,
    /// Best group has no report category (caught at load time normally).
    Unclassified,
    SummaryRejected(SummaryOutcome),
    Accepted(Box<MatchedArticle>),
}

impl EntryOutcome {
    pub fn reason(&self) -> &'static str {
        match self {
            EntryOutcome::Undated => "undated",
            EntryOutcome::Stale => "stale",
            EntryOutcome::MissingLink => "missing_link",
            EntryOutcome::ThinContent => "thin_content",
            EntryOutcome::NoMatch => "no_match",
            EntryOutcome::Unclassified => "unclassified",
            EntryOutcome::SummaryRejected(_) => "summary_rejected",
            EntryOutcome::Accepted(_) => "accepted",
        }
    }
}

/// Randomized pauses between outbound calls.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    settings: PacingSettings,
}

impl Pacer {
    pub fn new(settings: PacingSettings) -> Self {
        Self { settings }
    }

    fn pick_ms([lo, hi]: [u64; 2]) -> u64 {
        if hi <= lo {
            return lo;
        }
        rand::rng().random_range(lo..=hi)
    }

    async fn pause(range: [u64; 2]) {
        let ms = Self::pick_ms(range);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    pub async fn before_fetch(&self) {
        Self::pause(self.settings.before_fetch_ms).await
    }

    pub async fn before_summary(&self) {
        Self::pause(self.settings.before_summary_ms).await
    }

    pub async fn between_feeds(&self) {
        Self::pause(self.settings.between_feeds_ms).await
    }
}

/// Accepted articles of one feed plus rejection counts by reason.
#[derive(Debug, Default)]
pub struct FeedOutcome {
    pub entries: usize,
    pub accepted: Vec<MatchedArticle>,
    pub rejected: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub feeds_ok: usize,
    pub feeds_failed: usize,
    pub entries: usize,
    /// Accepted before dedup (what the audit log saw).
    pub accepted: usize,
    pub rejected: BTreeMap<&'static str, usize>,
    pub duplicates: usize,
    pub empty_headlines: usize,
    /// Deduplicated, in (feed, entry) order.
    pub articles: Vec<MatchedArticle>,
}

pub struct Pipeline {
    collab: Collaborators,
    taxonomy: Arc<Taxonomy>,
    scorer: SharedScorer,
    settings: PipelineSettings,
    pacer: Pacer,
}

impl Pipeline {
    pub fn new(
        collab: Collaborators,
        taxonomy: Arc<Taxonomy>,
        scorer: SharedScorer,
        settings: PipelineSettings,
        pacing: PacingSettings,
    ) -> Self {
        ensure_metrics_described();
        Self {
            collab,
            taxonomy,
            scorer,
            settings,
            pacer: Pacer::new(pacing),
        }
    }

    /// Take the fetched page text when it is strictly longer than the feed summary.
    fn resolve_content(
        &self,
        entry: &FeedEntry,
        published: DateTime<Utc>,
        fetched: crate::ingest::types::FetchedContent,
    ) -> CandidateArticle {
        let summary_len = entry.summary.trim().chars().count();
        let fetched_len = fetched.text.trim().chars().count();
        let body = if fetched_len > summary_len {
            fetched.text
        } else {
            entry.summary.clone()
        };
        CandidateArticle {
            headline: entry.title.clone(),
            link: entry.link.clone(),
            published,
            body,
            top_image: fetched.top_image,
        }
    }

    /// Run one entry through the filters. Never fails; every drop is an outcome.
    pub async fn process_entry(
        &self,
        entry: &FeedEntry,
        feed_index: usize,
        entry_index: usize,
        now: DateTime<Utc>,
    ) -> EntryOutcome {
        let Some(published) = entry.published else {
            return EntryOutcome::Undated;
        };
        if !is_recent(published, now, self.settings.recency_days) {
            return EntryOutcome::Stale;
        }
        if entry.link.trim().is_empty() {
            return EntryOutcome::MissingLink;
        }

        self.pacer.before_fetch().await;
        let fetched = self.collab.fetcher.fetch(&entry.link).await;
        let candidate = self.resolve_content(entry, published, fetched);
        if candidate.body.trim().chars().count() < self.settings.min_content_chars {
            tracing::debug!(target: "pipeline", link = %candidate.link, "content below floor");
            return EntryOutcome::ThinContent;
        }

        let scored = self.scorer.score(&candidate.headline, &candidate.body);
        let Some(best) = scored.best else {
            return EntryOutcome::NoMatch;
        };
        let category = match classify(&self.taxonomy, &best.group) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(target: "pipeline", error = %e, "matched group has no category");
                return EntryOutcome::Unclassified;
            }
        };
        tracing::info!(
            target: "pipeline",
            headline = %truncate_chars(&candidate.headline, 60),
            keyword = %best.phrase,
            group = %best.group,
            total = scored.total,
            "relevant article"
        );

        self.pacer.before_summary().await;
        let outcome = self
            .collab
            .summarizer
            .summarize(
                &candidate.headline,
                &candidate.body,
                self.settings.summary_content_cap,
            )
            .await;
        let summary = match outcome.text() {
            Some(s) => s.to_string(),
            None => {
                tracing::warn!(
                    target: "pipeline",
                    headline = %truncate_chars(&candidate.headline, 60),
                    outcome = outcome.label(),
                    "summary unavailable; article dropped"
                );
                return EntryOutcome::SummaryRejected(outcome);
            }
        };

        let article = MatchedArticle {
            headline: candidate.headline,
            link: candidate.link,
            published,
            summary,
            matched_keyword: best.phrase,
            keyword_group: best.group,
            category,
            score: scored.total,
            top_image: candidate.top_image,
            feed_index,
            entry_index,
        };

        if let Err(e) = self.collab.audit.append(&AuditRow::from(&article)).await {
            counter!("audit_errors_total").increment(1);
            tracing::warn!(
                target: "pipeline",
                sink = self.collab.audit.name(),
                error = ?e,
                "audit append failed"
            );
        }
        EntryOutcome::Accepted(Box::new(article))
    }

    /// All entries of one feed. A fetch error is returned so the caller can count it.
    pub async fn process_feed(
        &self,
        feed_index: usize,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<FeedOutcome> {
        let entries = self.collab.feeds.fetch_entries(url).await?;
        let mut out = FeedOutcome {
            entries: entries.len(),
            ..Default::default()
        };
        counter!("pipeline_entries_total").increment(entries.len() as u64);

        for (entry_index, entry) in entries.iter().enumerate() {
            match self.process_entry(entry, feed_index, entry_index, now).await {
                EntryOutcome::Accepted(a) => out.accepted.push(*a),
                other => {
                    let reason = other.reason();
                    counter!("pipeline_rejected_total", "reason" => reason).increment(1);
                    *out.rejected.entry(reason).or_default() += 1;
                }
            }
        }
        counter!("pipeline_accepted_total").increment(out.accepted.len() as u64);
        Ok(out)
    }

    /// Every feed in order, then one dedup pass over the concatenation.
    pub async fn run(&self, feeds: &[String], now: DateTime<Utc>) -> RunReport {
        let mut report = RunReport::default();
        let mut accepted = Vec::new();

        for (feed_index, url) in feeds.iter().enumerate() {
            if feed_index > 0 {
                self.pacer.between_feeds().await;
            }
            let t0 = Instant::now();
            tracing::info!(target: "pipeline", feed = %url, source = self.collab.feeds.name(), "processing feed");
            match self.process_feed(feed_index, url, now).await {
                Ok(fo) => {
                    report.feeds_ok += 1;
                    report.entries += fo.entries;
                    for (reason, n) in fo.rejected {
                        *report.rejected.entry(reason).or_default() += n;
                    }
                    tracing::info!(
                        target: "pipeline",
                        feed = %url,
                        entries = fo.entries,
                        accepted = fo.accepted.len(),
                        "feed done"
                    );
                    accepted.extend(fo.accepted);
                }
                Err(e) => {
                    report.feeds_failed += 1;
                    counter!("pipeline_feed_errors_total").increment(1);
                    tracing::error!(target: "pipeline", feed = %url, error = ?e, "feed failed; continuing");
                }
            }
            histogram!("pipeline_feed_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
        }

        report.accepted = accepted.len();
        let d = dedupe(accepted);
        counter!("pipeline_dedup_dropped_total").increment((d.duplicates + d.empty_headlines) as u64);
        report.duplicates = d.duplicates;
        report.empty_headlines = d.empty_headlines;
        report.articles = d.kept;

        tracing::info!(
            target: "pipeline",
            feeds_ok = report.feeds_ok,
            feeds_failed = report.feeds_failed,
            accepted = report.accepted,
            unique = report.articles.len(),
            duplicates = report.duplicates,
            "run complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacer_range_is_inclusive_and_degenerate_ranges_are_fixed() {
        assert_eq!(Pacer::pick_ms([0, 0]), 0);
        assert_eq!(Pacer::pick_ms([7, 3]), 7);
        for _ in 0..50 {
            let ms = Pacer::pick_ms([10, 12]);
            assert!((10..=12).contains(&ms));
        }
    }

    #[test]
    fn outcome_reasons_are_stable_labels() {
        assert_eq!(EntryOutcome::Undated.reason(), "undated");
        assert_eq!(
            EntryOutcome::SummaryRejected(SummaryOutcome::Skipped).reason(),
            "summary_rejected"
        );
    }
}
