// src/audit.rs
//! Append-only audit log of every accepted article (written before dedup).

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::article::MatchedArticle;

pub const ENV_AUDIT_LOG_WEBHOOK_URL: &str = "AUDIT_LOG_WEBHOOK_URL";

/// One log row: (timestamp, headline, summary, keyword, group, link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow {
    /// Publication time, `YYYY-MM-DD HH:MM:SS` (UTC).
    pub timestamp: String,
    pub headline: String,
    pub summary: String,
    pub keyword: String,
    pub group: String,
    pub link: String,
}

impl From<&MatchedArticle> for AuditRow {
    fn from(a: &MatchedArticle) -> Self {
        Self {
            timestamp: a.published.format("%Y-%m-%d %H:%M:%S").to_string(),
            headline: a.headline.clone(),
            summary: a.summary.clone(),
            keyword: a.matched_keyword.clone(),
            group: a.keyword_group.clone(),
            link: a.link.clone(),
        }
    }
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, row: &AuditRow) -> Result<()>;
    fn name(&self) -> &'static str;
}

pub type DynAuditLog = Arc<dyn AuditLog>;

/// JSON-lines file, one row per line, opened in append mode for every write.
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read all rows back (for tools and tests).
    pub fn read_all(&self) -> Result<Vec<AuditRow>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("reading audit log"),
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).context("parsing audit row"))
            .collect()
    }
}

#[async_trait]
impl AuditLog for JsonlAuditLog {
    async fn append(&self, row: &AuditRow) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let mut line = serde_json::to_string(row).context("serializing audit row")?;
        line.push('\n');
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        f.write_all(line.as_bytes()).await.context("writing audit row")?;
        f.flush().await.context("flushing audit log")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

/// POSTs each row as JSON (e.g. to a spreadsheet's script endpoint).
pub struct WebhookAuditLog {
    url: String,
    client: reqwest::Client,
}

impl WebhookAuditLog {
    pub fn new(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("building audit webhook client")?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl AuditLog for WebhookAuditLog {
    async fn append(&self, row: &AuditRow) -> Result<()> {
        self.client
            .post(&self.url)
            .json(row)
            .send()
            .await
            .context("audit webhook post")?
            .error_for_status()
            .context("audit webhook non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Webhook when `AUDIT_LOG_WEBHOOK_URL` is set, else the JSON-lines file.
pub fn build_audit_log(path: PathBuf) -> Result<DynAuditLog> {
    match std::env::var(ENV_AUDIT_LOG_WEBHOOK_URL) {
        Ok(url) if !url.trim().is_empty() => Ok(Arc::new(WebhookAuditLog::new(url)?)),
        _ => Ok(Arc::new(JsonlAuditLog::new(path))),
    }
}
