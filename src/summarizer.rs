// src/summarizer.rs
//! Summarizer boundary: tagged outcomes instead of sentinel strings, an OpenAI
//! chat-completions provider, and disabled/mock variants.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ai::AiConfig;
use crate::ingest::truncate_chars;

/// What the summarizer produced for one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Summary(String),
    /// Service unavailable (disabled, no API key).
    Skipped,
    /// Body below the minimum length worth summarizing.
    TooShort,
    /// Request or response error.
    Failed(String),
}

impl SummaryOutcome {
    /// The summary text for a success with non-blank content.
    pub fn text(&self) -> Option<&str> {
        match self {
            SummaryOutcome::Summary(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SummaryOutcome::Summary(_) => "summary",
            SummaryOutcome::Skipped => "skipped",
            SummaryOutcome::TooShort => "too_short",
            SummaryOutcome::Failed(_) => "failed",
        }
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `headline` + the first `cap` chars of `body`.
    async fn summarize(&self, headline: &str, body: &str, cap: usize) -> SummaryOutcome;
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Factory: `mock` provider, disabled, or OpenAI according to config.
pub fn build_summarizer(cfg: &AiConfig) -> anyhow::Result<DynSummarizer> {
    if !cfg.enabled {
        return Ok(Arc::new(DisabledSummarizer));
    }
    match cfg.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiSummarizer::new(cfg)?)),
        "mock" => Ok(Arc::new(MockSummarizer {
            fixed: "Summary unavailable in mock mode.".to_string(),
        })),
        other => anyhow::bail!("Unsupported summarizer provider in config: {other}"),
    }
}

/// Prompt focused on local charity/community context.
pub fn build_prompt(headline: &str, body: &str, cap: usize) -> String {
    format!(
        "Analyze the following article from a Singaporean context. Summarize its key points in under 100 words. \
Focus on the specific details of any mentioned campaign, event, or initiative (e.g., its goal, who is running it, \
specific activities or outcomes). Prioritize information relevant to charities, social services, or community efforts.\n\n\
Title: {headline}\nContent: {}",
        truncate_chars(body, cap)
    )
}

/// OpenAI chat-completions provider. Requires an API key.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    min_content_chars: usize,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiSummarizer {
    pub fn new(cfg: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("media-monitor/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building summarizer http client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            min_content_chars: cfg.min_content_chars,
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        })
    }

    async fn request(&self, prompt: &str) -> anyhow::Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let body: Resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("summarizer request")?
            .error_for_status()
            .context("summarizer non-2xx")?
            .json()
            .await
            .context("summarizer response json")?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default())
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, headline: &str, body: &str, cap: usize) -> SummaryOutcome {
        if self.api_key.is_empty() {
            return SummaryOutcome::Skipped;
        }
        if body.trim().chars().count() < self.min_content_chars {
            tracing::warn!(target: "summarizer", %headline, "content too short; skipping summary");
            return SummaryOutcome::TooShort;
        }

        let prompt = build_prompt(headline, body, cap);
        match self.request(&prompt).await {
            Ok(text) if !text.is_empty() => {
                tracing::info!(
                    target: "summarizer",
                    headline = %truncate_chars(headline, 50),
                    "generated summary"
                );
                SummaryOutcome::Summary(text)
            }
            Ok(_) => SummaryOutcome::Failed("empty response".to_string()),
            Err(e) => {
                tracing::error!(target: "summarizer", error = ?e, %headline, "summarization error");
                SummaryOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Always `Skipped`; used when summarization is disabled.
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _headline: &str, _body: &str, _cap: usize) -> SummaryOutcome {
        SummaryOutcome::Skipped
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed text for local runs and tests.
#[derive(Clone)]
pub struct MockSummarizer {
    pub fixed: String,
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, _headline: &str, _body: &str, _cap: usize) -> SummaryOutcome {
        SummaryOutcome::Summary(self.fixed.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_non_blank_summaries_have_text() {
        assert_eq!(SummaryOutcome::Summary("ok".into()).text(), Some("ok"));
        assert_eq!(SummaryOutcome::Summary("  ".into()).text(), None);
        assert_eq!(SummaryOutcome::Skipped.text(), None);
        assert_eq!(SummaryOutcome::Failed("x".into()).label(), "failed");
    }

    #[test]
    fn prompt_caps_body() {
        let body = "x".repeat(5000);
        let p = build_prompt("Title", &body, 3500);
        assert!(p.contains("Title: Title"));
        assert!(p.ends_with(&format!("Content: {}", "x".repeat(3500))));
    }

    #[tokio::test]
    async fn missing_key_skips_and_short_body_is_too_short() {
        let mut cfg = AiConfig::default();
        cfg.api_key = String::new();
        let s = OpenAiSummarizer::new(&cfg).unwrap();
        assert_eq!(s.summarize("h", "body", 3500).await, SummaryOutcome::Skipped);

        cfg.api_key = "sk-test".into();
        let s = OpenAiSummarizer::new(&cfg).unwrap();
        assert_eq!(
            s.summarize("h", "too short", 3500).await,
            SummaryOutcome::TooShort
        );
    }

    #[tokio::test]
    async fn factory_respects_enabled_and_provider() {
        let mut cfg = AiConfig::default();
        cfg.enabled = false;
        assert_eq!(build_summarizer(&cfg).unwrap().provider_name(), "disabled");
        cfg.enabled = true;
        cfg.provider = "mock".into();
        let s = build_summarizer(&cfg).unwrap();
        assert!(s.summarize("h", "b", 10).await.text().is_some());
        cfg.provider = "claude".into();
        assert!(build_summarizer(&cfg).is_err());
    }
}
