//! Media monitor, binary entrypoint.
//! One run: load config, scan feeds, mail and archive the digest, dump metrics.
//!
//! See `README.md` for configuration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use media_monitor::audit::build_audit_log;
use media_monitor::config::{AiConfig, MonitorConfig};
use media_monitor::digest::{Digest, DigestRenderer, Highlighter};
use media_monitor::ingest::content::HttpContentFetcher;
use media_monitor::ingest::rss::HttpFeedSource;
use media_monitor::metrics::{Metrics, ENV_METRICS_TEXTFILE_PATH};
use media_monitor::notify::NotifierMux;
use media_monitor::pipeline::{Collaborators, Pipeline};
use media_monitor::relevance::RelevanceScorer;
use media_monitor::summarizer::build_summarizer;
use media_monitor::taxonomy::Taxonomy;

/// Compact logs by default, JSON lines with LOG_FORMAT=json.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("media_monitor=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            None
        }
    };

    // --- Configuration (any failure here is fatal) ---
    let taxonomy = Arc::new(Taxonomy::from_toml().context("loading keyword taxonomy")?);
    let scorer = Arc::new(RelevanceScorer::new(&taxonomy)?);
    let monitor = MonitorConfig::load_default()?;
    let ai = AiConfig::load_default()?;
    let highlighter = Highlighter::new(taxonomy.all_phrases())?;
    tracing::info!(
        groups = taxonomy.groups().len(),
        threshold = scorer.params().threshold,
        feeds = monitor.feeds.len(),
        summarizer_enabled = ai.enabled,
        "configuration loaded"
    );

    // --- Collaborators ---
    let p = &monitor.pipeline;
    let collab = Collaborators {
        feeds: Arc::new(HttpFeedSource::new(Duration::from_secs(p.feed_timeout_secs))?),
        fetcher: Arc::new(HttpContentFetcher::new(Duration::from_secs(
            p.article_timeout_secs,
        ))?),
        summarizer: build_summarizer(&ai)?,
        audit: build_audit_log(monitor.audit.path.clone())?,
    };
    let notifiers = NotifierMux::from_env(monitor.digest.archive_dir.clone())?;
    if notifiers.is_empty() {
        tracing::warn!("no digest channel configured; digest will only be logged");
    }

    // --- Run ---
    let pipeline = Pipeline::new(
        collab,
        taxonomy.clone(),
        scorer,
        monitor.pipeline,
        monitor.pacing,
    );
    let now = chrono::Utc::now();
    let report = pipeline.run(&monitor.feeds, now).await;

    // --- Digest (delivered even when empty) ---
    let digest = Digest::assemble(report.articles, now, monitor.pipeline.recency_days);
    let rendered = DigestRenderer::new(monitor.digest.clone(), highlighter).render(&digest);
    let delivered = notifiers.deliver(&rendered).await;
    tracing::info!(
        subject = %rendered.subject,
        articles = rendered.article_count,
        channels_ok = delivered,
        channels = notifiers.len(),
        "digest sent"
    );

    if let (Some(m), Ok(path)) = (metrics, std::env::var(ENV_METRICS_TEXTFILE_PATH)) {
        if let Err(e) = m.write_textfile(&PathBuf::from(path)) {
            tracing::warn!(error = ?e, "metrics textfile not written");
        }
    }
    Ok(())
}
