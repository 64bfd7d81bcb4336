// src/config/monitor.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MONITOR_CONFIG_PATH: &str = "config/monitor.toml";
pub const ENV_MONITOR_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";

/// Per-run settings: feed list, pipeline limits, pacing, digest and audit output.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_feeds")]
    pub feeds: Vec<String>,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub pacing: PacingSettings,
    #[serde(default)]
    pub digest: DigestSettings,
    #[serde(default)]
    pub audit: AuditSettings,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub recency_days: i64,
    /// Resolved content shorter than this (trimmed chars) is not scored.
    pub min_content_chars: usize,
    /// Max body chars passed to the summarizer.
    pub summary_content_cap: usize,
    pub feed_timeout_secs: u64,
    pub article_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            recency_days: 3,
            min_content_chars: 50,
            summary_content_cap: 3500,
            feed_timeout_secs: 30,
            article_timeout_secs: 20,
        }
    }
}

/// Randomized delays, `[min_ms, max_ms]`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    pub before_fetch_ms: [u64; 2],
    pub before_summary_ms: [u64; 2],
    pub between_feeds_ms: [u64; 2],
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            before_fetch_ms: [500, 1500],
            before_summary_ms: [1000, 3000],
            between_feeds_ms: [1000, 2000],
        }
    }
}

impl PacingSettings {
    pub fn none() -> Self {
        Self {
            before_fetch_ms: [0, 0],
            before_summary_ms: [0, 0],
            between_feeds_ms: [0, 0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestSettings {
    pub title: String,
    pub organization: String,
    /// Link to the audit history shown in the footer (e.g. a spreadsheet).
    pub history_link: Option<String>,
    pub archive_dir: Option<PathBuf>,
    /// Rotating quiz; one item per digest, chosen by date.
    pub quiz: Vec<QuizItem>,
}

/// `[[digest.quiz]]`: question and options in the body, answer in the footer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuizItem {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: String,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            title: "Daily Media Report".to_string(),
            organization: "MTFA".to_string(),
            history_link: None,
            archive_dir: Some(PathBuf::from("out")),
            quiz: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub path: PathBuf,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/audit_log.jsonl"),
        }
    }
}

fn default_feeds() -> Vec<String> {
    [
        "https://www.straitstimes.com/news/singapore/rss.xml",
        "https://www.channelnewsasia.com/api/v1/rss-outbound-feed?_format=xml&category=6311",
        "https://www.todayonline.com/singapore/rss",
        "https://berita.mediacorp.sg/rss/singapura",
        "http://www.asiaone.com/rss/singapore",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            pipeline: PipelineSettings::default(),
            pacing: PacingSettings::default(),
            digest: DigestSettings::default(),
            audit: AuditSettings::default(),
        }
    }
}

impl MonitorConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: MonitorConfig = toml::from_str(s).context("parsing monitor config")?;
        cfg.feeds = clean_feeds(cfg.feeds);
        if cfg.pipeline.recency_days <= 0 {
            return Err(anyhow!("pipeline.recency_days must be positive"));
        }
        if let Some(i) = cfg
            .digest
            .quiz
            .iter()
            .position(|q| q.question.trim().is_empty() || q.answer.trim().is_empty())
        {
            return Err(anyhow!("digest.quiz[{i}] needs a question and an answer"));
        }
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $MONITOR_CONFIG_PATH (must exist)
    /// 2) config/monitor.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_MONITOR_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("MONITOR_CONFIG_PATH points to non-existent path"));
            }
        }
        let p = PathBuf::from(DEFAULT_MONITOR_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        Ok(Self::default())
    }
}

/// Trim, drop blanks and repeats; order is kept because it fixes dedup precedence.
fn clean_feeds(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = MonitorConfig::from_toml_str(
            r#"
feeds = [" https://b/rss ", "", "https://a/rss", "https://b/rss"]

[pipeline]
recency_days = 2

[pacing]
between_feeds_ms = [0, 0]
"#,
        )
        .unwrap();
        assert_eq!(cfg.feeds, vec!["https://b/rss", "https://a/rss"]);
        assert_eq!(cfg.pipeline.recency_days, 2);
        assert_eq!(cfg.pipeline.min_content_chars, 50);
        assert_eq!(cfg.pacing.between_feeds_ms, [0, 0]);
        assert_eq!(cfg.pacing.before_fetch_ms, [500, 1500]);
        assert_eq!(cfg.digest.title, "Daily Media Report");
    }

    #[test]
    fn rejects_non_positive_window() {
        let err = MonitorConfig::from_toml_str("[pipeline]\nrecency_days = 0\n").unwrap_err();
        assert!(err.to_string().contains("recency_days"));
    }

    #[test]
    fn empty_document_is_the_default() {
        let cfg = MonitorConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.feeds.len(), 5);
        assert_eq!(cfg.audit.path, PathBuf::from("data/audit_log.jsonl"));
        assert!(cfg.digest.quiz.is_empty());
    }

    #[test]
    fn quiz_items_load_and_blank_answers_are_rejected() {
        let cfg = MonitorConfig::from_toml_str(
            r#"
[[digest.quiz]]
question = "Which year?"
options = ["A) 1904", "B) 1962"]
answer = "A) 1904"

[[digest.quiz]]
question = "Open question"
answer = "Anything"
"#,
        )
        .unwrap();
        assert_eq!(cfg.digest.quiz.len(), 2);
        assert_eq!(cfg.digest.quiz[0].options, vec!["A) 1904", "B) 1962"]);
        assert!(cfg.digest.quiz[1].options.is_empty());
        assert_eq!(cfg.digest.title, "Daily Media Report");

        let err = MonitorConfig::from_toml_str(
            "[[digest.quiz]]\nquestion = \"Q\"\nanswer = \"  \"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("digest.quiz[0]"));
    }
}
