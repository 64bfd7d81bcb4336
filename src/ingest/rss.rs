// src/ingest/rss.rs
//! HTTP feed source plus a tolerant RSS 2.0 / Atom parser.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::time::Duration;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::sanitize_text;
use crate::ingest::types::{FeedEntry, FeedSource};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Parse RFC 2822 (RSS) or RFC 3339 (Atom) timestamps into UTC.
pub fn parse_feed_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    let unix = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .map(|dt| dt.unix_timestamp())
        .ok()
        // chrono accepts a few legacy zone names `time` rejects
        .or_else(|| {
            chrono::DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.timestamp())
        })?;
    DateTime::<Utc>::from_timestamp(unix, 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    Date,
    Other,
}

/// Maps a direct child of `<item>`/`<entry>` to the slot it fills. Works on the
/// qualified name so `media:title` or `media:content` never land in the
/// headline or body.
fn field_for(qname: &[u8]) -> Field {
    let (prefix, local) = match qname.iter().position(|&b| b == b':') {
        Some(i) => (Some(&qname[..i]), &qname[i + 1..]),
        None => (None, qname),
    };
    let atom = matches!(prefix, None | Some(b"atom"));
    match local {
        b"title" if atom => Field::Title,
        b"link" if atom => Field::Link,
        b"description" | b"summary" if atom => Field::Summary,
        b"content" if atom => Field::Content,
        b"encoded" if matches!(prefix, Some(b"content")) => Field::Content,
        b"pubDate" | b"published" | b"updated" if atom => Field::Date,
        b"date" if matches!(prefix, Some(b"dc")) => Field::Date,
        _ => Field::Other,
    }
}

#[derive(Debug, Default)]
struct Draft {
    title: String,
    link: String,
    href: String,
    summary: String,
    content: String,
    date: String,
    /// Fields already filled by an earlier element; repeats are ignored.
    done: Vec<Field>,
}

impl Draft {
    fn slot(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Title => Some(&mut self.title),
            Field::Link => Some(&mut self.link),
            Field::Summary => Some(&mut self.summary),
            Field::Content => Some(&mut self.content),
            Field::Date => Some(&mut self.date),
            Field::Other => None,
        }
    }

    fn push(&mut self, field: Field, text: &str) {
        if self.done.contains(&field) {
            return;
        }
        if let Some(slot) = self.slot(field) {
            slot.push_str(text);
        }
    }

    /// End of a direct child: a non-empty value is final.
    fn close(&mut self, field: Field) {
        let filled = self.slot(field).is_some_and(|s| !s.trim().is_empty());
        if filled && !self.done.contains(&field) {
            self.done.push(field);
        }
    }

    /// Atom-style `<link href="…" rel="alternate"/>`; first alternate link wins.
    /// A text `<link>` still takes precedence in [`Draft::finish`].
    fn take_href(&mut self, e: &BytesStart<'_>) {
        if !self.href.is_empty() {
            return;
        }
        let rel = e
            .try_get_attribute("rel")
            .ok()
            .flatten()
            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
        if rel.as_deref().is_some_and(|r| r != "alternate") {
            return;
        }
        if let Some(href) = e
            .try_get_attribute("href")
            .ok()
            .flatten()
            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
        {
            self.href = href;
        }
    }

    fn finish(self) -> FeedEntry {
        let title = sanitize_text(&self.title);
        let summary = match sanitize_text(&self.summary) {
            s if s.is_empty() => sanitize_text(&self.content),
            s => s,
        };
        let link = match sanitize_text(&self.link) {
            l if l.is_empty() => sanitize_text(&self.href),
            l => l,
        };
        FeedEntry {
            title: if title.is_empty() {
                "No Title".to_string()
            } else {
                title
            },
            link,
            summary,
            published: parse_feed_date(&self.date),
        }
    }
}

fn is_entry(local: &[u8]) -> bool {
    local == b"item" || local == b"entry"
}

/// Parse an RSS or Atom document. Stops at the first XML error and returns the
/// entries completed before it.
///
/// Only direct children of an item/entry fill its fields; deeper text (inline
/// XHTML bodies, `media:content` captions) belongs to the child it sits in.
pub fn parse_feed(xml: &str) -> Vec<FeedEntry> {
    // untrimmed: inline XHTML keeps its inter-word spaces; sanitize_text collapses the rest
    let mut reader = Reader::from_str(xml);

    let mut out = Vec::new();
    let mut draft: Option<Draft> = None;
    // depth below the open item/entry; `child` is the field of the depth-1 element
    let mut depth = 0usize;
    let mut child = Field::Other;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match draft.as_mut() {
                None => {
                    if is_entry(e.local_name().as_ref()) {
                        draft = Some(Draft::default());
                        depth = 0;
                    }
                }
                Some(d) => {
                    depth += 1;
                    if depth == 1 {
                        child = field_for(e.name().as_ref());
                        if child == Field::Link {
                            d.take_href(&e);
                        }
                    }
                }
            },
            Ok(Event::Empty(e)) => {
                if let Some(d) = draft.as_mut() {
                    if depth == 0 && field_for(e.name().as_ref()) == Field::Link {
                        d.take_href(&e);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(d) = draft.as_mut().filter(|_| depth > 0) {
                    let text = e
                        .unescape()
                        .map(|c| c.into_owned())
                        // unknown HTML entities (&nbsp; …) are decoded later by sanitize_text
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    d.push(child, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(d) = draft.as_mut().filter(|_| depth > 0) {
                    d.push(child, &String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                if depth == 0 {
                    if let Some(d) = draft.take() {
                        out.push(d.finish());
                    }
                } else {
                    if depth == 1 {
                        if let Some(d) = draft.as_mut() {
                            d.close(child);
                        }
                        child = Field::Other;
                    }
                    depth -= 1;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    error = %e,
                    position = reader.buffer_position(),
                    parsed = out.len(),
                    "malformed feed; keeping entries parsed so far"
                );
                break;
            }
            _ => {}
        }
    }
    out
}

/// Fetches feeds over HTTP with a browser-like user agent.
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_entries(&self, feed_url: &str) -> Result<Vec<FeedEntry>> {
        let body = self
            .client
            .get(feed_url)
            .send()
            .await
            .with_context(|| format!("feed http get {feed_url}"))?
            .error_for_status()
            .with_context(|| format!("feed http status {feed_url}"))?
            .text()
            .await
            .context("feed http .text()")?;

        let t0 = std::time::Instant::now();
        let entries = parse_feed(&body);
        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_entries_total").increment(entries.len() as u64);
        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Singapore News</title>
    <item>
      <title>MTFA opens &amp; expands dialysis centre</title>
      <link>https://news.example.sg/a</link>
      <description><![CDATA[<p>Ihsan Kidney Care&nbsp;adds 20 stations.</p>]]></description>
      <pubDate>Tue, 09 Sep 2025 08:30:00 +0800</pubDate>
    </item>
    <item>
      <title></title>
      <link>https://news.example.sg/b</link>
      <content:encoded><![CDATA[Full text body]]></content:encoded>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example</title>
  <entry>
    <title>Charity drive launched</title>
    <link rel="self" href="https://example.org/self"/>
    <link rel="alternate" href="https://example.org/post"/>
    <updated>2025-09-09T01:00:00Z</updated>
    <summary type="html">Volunteers needed</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items() {
        let items = parse_feed(RSS);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "MTFA opens & expands dialysis centre");
        assert_eq!(items[0].link, "https://news.example.sg/a");
        assert_eq!(items[0].summary, "Ihsan Kidney Care adds 20 stations.");
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 9, 9, 0, 30, 0).unwrap())
        );
        assert_eq!(items[1].title, "No Title");
        assert_eq!(items[1].summary, "Full text body");
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn parses_atom_entries_with_alternate_link() {
        let items = parse_feed(ATOM);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.org/post");
        assert_eq!(items[0].summary, "Volunteers needed");
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 9, 9, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn malformed_feed_keeps_completed_entries() {
        let xml = r#"<rss><channel>
<item><title>One</title><link>https://x/1</link></item>
<item><title>Two</wrong></item>
</channel></rss>"#;
        let items = parse_feed(xml);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "One");
    }

    #[test]
    fn atom_entry_with_published_and_updated_uses_published() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>MTFA bursary awards</title>
    <link href="https://example.org/bursary"/>
    <published>2025-09-09T01:00:00Z</published>
    <updated>2025-09-09T02:00:00Z</updated>
    <source><title>Upstream</title><updated>2020-01-01T00:00:00Z</updated></source>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Forty students</p></div></content>
  </entry>
</feed>"#;
        let items = parse_feed(xml);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "MTFA bursary awards");
        assert_eq!(items[0].summary, "Forty students");
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 9, 9, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn media_children_stay_out_of_title_and_summary() {
        let xml = r#"<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
<channel><item>
  <title>MTFA opens centre</title>
  <media:content url="https://cdn.example.sg/p.jpg" medium="image">
    <media:title>Photo caption</media:title>
    <media:description>Caption text</media:description>
  </media:content>
  <media:title>Another caption</media:title>
  <description>Body</description>
  <link>https://news.example.sg/centre</link>
  <pubDate>Tue, 09 Sep 2025 08:30:00 +0800</pubDate>
</item></channel></rss>"#;
        let items = parse_feed(xml);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "MTFA opens centre");
        assert_eq!(items[0].summary, "Body");
        assert_eq!(items[0].link, "https://news.example.sg/centre");
    }

    #[test]
    fn text_link_beats_atom_link_in_rss_items() {
        let xml = r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
<channel><item>
  <atom:link href="https://news.example.sg/amp/x"/>
  <title>Story</title>
  <link>https://news.example.sg/x</link>
  <pubDate>Tue, 09 Sep 2025 08:30:00 +0800</pubDate>
  <dc:date xmlns:dc="http://purl.org/dc/elements/1.1/">2020-01-01T00:00:00Z</dc:date>
</item></channel></rss>"#;
        let items = parse_feed(xml);
        assert_eq!(items[0].link, "https://news.example.sg/x");
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 9, 9, 0, 30, 0).unwrap())
        );
    }

    #[test]
    fn dc_date_alone_is_enough() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:dc="http://purl.org/dc/elements/1.1/">
<item><title>T</title><link>https://x/1</link><dc:date>2025-09-09T08:30:00+08:00</dc:date></item>
</rdf:RDF>"#;
        let items = parse_feed(xml);
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 9, 9, 0, 30, 0).unwrap())
        );
    }

    #[test]
    fn date_formats() {
        assert!(parse_feed_date("Tue, 09 Sep 2025 08:30:00 GMT").is_some());
        assert!(parse_feed_date("2025-09-09T08:30:00+08:00").is_some());
        assert!(parse_feed_date("yesterday").is_none());
        assert!(parse_feed_date("  ").is_none());
    }
}
