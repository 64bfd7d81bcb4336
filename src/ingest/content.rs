// src/ingest/content.rs
//! Full-article fetcher: HTML download, paragraph extraction, `og:image` lookup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::ingest::rss::BROWSER_USER_AGENT;
use crate::ingest::sanitize_text;
use crate::ingest::types::{ContentFetcher, FetchedContent};

static SEL_PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("p selector"));
static SEL_BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector"));
static SEL_OG_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#)
        .expect("og:image selector")
});

/// Elements whose text never reaches the reader.
const HIDDEN: &[&str] = &["script", "style", "noscript", "template"];

/// Text nodes under `root`, skipping anything inside a hidden element.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

fn article_text(document: &Html) -> String {
    let paragraphs: Vec<String> = document
        .select(&SEL_PARAGRAPH)
        .map(|p| sanitize_text(&visible_text(p)))
        .filter(|p| !p.is_empty())
        .collect();
    if !paragraphs.is_empty() {
        return paragraphs.join("\n\n");
    }
    let root = document
        .select(&SEL_BODY)
        .next()
        .unwrap_or_else(|| document.root_element());
    sanitize_text(&visible_text(root))
}

fn top_image(document: &Html) -> Option<String> {
    document
        .select(&SEL_OG_IMAGE)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(str::to_string)
}

/// Plain text of an article page: `<p>` paragraphs joined by blank lines, or the
/// whole `<body>` when the page has no paragraphs.
pub fn extract_article_text(html: &str) -> String {
    article_text(&Html::parse_document(html))
}

/// `content` of the first non-empty `og:image` meta tag.
pub fn extract_top_image(html: &str) -> Option<String> {
    top_image(&Html::parse_document(html))
}

/// Text and lead image from one parse of the page.
pub fn extract_content(html: &str) -> FetchedContent {
    let document = Html::parse_document(html);
    FetchedContent {
        text: article_text(&document),
        top_image: top_image(&document),
    }
}

pub struct HttpContentFetcher {
    client: reqwest::Client,
}

impl HttpContentFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("building article http client")?;
        Ok(Self { client })
    }

    async fn try_fetch(&self, url: &str) -> Result<FetchedContent> {
        let html = self
            .client
            .get(url)
            .send()
            .await
            .context("article http get")?
            .error_for_status()
            .context("article http status")?
            .text()
            .await
            .context("article http .text()")?;
        Ok(extract_content(&html))
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> FetchedContent {
        match self.try_fetch(url).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, %url, "failed to fetch article");
                counter!("ingest_fetch_errors_total").increment(1);
                FetchedContent::default()
            }
        }
    }
}
