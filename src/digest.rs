// src/digest.rs
//! Digest assembly (category sections, newest first) and HTML rendering.

use chrono::{DateTime, Datelike, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::Regex;
use std::fmt::Write as _;

use crate::article::MatchedArticle;
use crate::classify::ReportCategory;
use crate::config::monitor::{DigestSettings, QuizItem};
use crate::relevance::phrase_pattern;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSection {
    pub category: ReportCategory,
    pub articles: Vec<MatchedArticle>,
}

/// Deduplicated articles of one run grouped for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub generated_at: DateTime<Utc>,
    pub recency_days: i64,
    /// Non-empty sections in [`ReportCategory::ALL`] order.
    pub sections: Vec<DigestSection>,
}

impl Digest {
    pub fn assemble(
        articles: Vec<MatchedArticle>,
        generated_at: DateTime<Utc>,
        recency_days: i64,
    ) -> Self {
        let mut sections: Vec<DigestSection> = ReportCategory::ALL
            .iter()
            .map(|&category| DigestSection {
                category,
                articles: Vec::new(),
            })
            .collect();
        for a in articles {
            if let Some(s) = sections.iter_mut().find(|s| s.category == a.category) {
                s.articles.push(a);
            }
        }
        for s in &mut sections {
            // stable: equal timestamps keep run order
            s.articles.sort_by(|a, b| b.published.cmp(&a.published));
        }
        sections.retain(|s| !s.articles.is_empty());
        Self {
            generated_at,
            recency_days,
            sections,
        }
    }

    pub fn total(&self) -> usize {
        self.sections.iter().map(|s| s.articles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, category: ReportCategory) -> Option<&DigestSection> {
        self.sections.iter().find(|s| s.category == category)
    }
}

/// Final message handed to notifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDigest {
    pub subject: String,
    pub html: String,
    pub generated_at: DateTime<Utc>,
    pub article_count: usize,
}

/// Wraps taxonomy phrases found in already-escaped text in a highlight span.
#[derive(Debug)]
pub struct Highlighter {
    re: Option<Regex>,
}

impl Highlighter {
    pub fn new<'a, I: IntoIterator<Item = &'a str>>(phrases: I) -> anyhow::Result<Self> {
        let mut escaped: Vec<String> = phrases
            .into_iter()
            .map(|p| encode_text(p.trim()).into_owned())
            .filter(|p| !p.is_empty())
            .collect();
        if escaped.is_empty() {
            return Ok(Self { re: None });
        }
        // longest first so "MTFA Ihsan Casket" wins over "MTFA"
        escaped.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        escaped.dedup();
        let alternatives: Vec<String> = escaped.iter().map(|p| phrase_pattern(p)).collect();
        let re = Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?;
        Ok(Self { re: Some(re) })
    }

    /// Escape `text` for HTML and highlight phrase matches.
    pub fn highlight(&self, text: &str) -> String {
        let escaped = encode_text(text);
        match &self.re {
            Some(re) => re
                .replace_all(&escaped, r#"<span class="hl">$0</span>"#)
                .into_owned(),
            None => escaped.into_owned(),
        }
    }
}

pub struct DigestRenderer {
    settings: DigestSettings,
    highlighter: Highlighter,
}

impl DigestRenderer {
    pub fn new(settings: DigestSettings, highlighter: Highlighter) -> Self {
        Self {
            settings,
            highlighter,
        }
    }

    pub fn subject(&self, digest: &Digest) -> String {
        format!(
            "{} - {}",
            self.settings.title,
            digest.generated_at.format("%A, %d %B %Y")
        )
    }

    /// Quiz item for the digest date; the same day always gets the same question.
    pub fn quiz_for(&self, at: DateTime<Utc>) -> Option<&QuizItem> {
        let quiz = &self.settings.quiz;
        if quiz.is_empty() {
            return None;
        }
        let day = at.date_naive().num_days_from_ce().rem_euclid(quiz.len() as i32);
        quiz.get(day as usize)
    }

    pub fn render(&self, digest: &Digest) -> RenderedDigest {
        let title = encode_text(&self.settings.title);
        let org = encode_text(&self.settings.organization);
        let date = digest.generated_at.format("%A, %d %B %Y").to_string();
        let quiz = self.quiz_for(digest.generated_at);

        let mut quiz_block = String::new();
        if let Some(q) = quiz {
            let options: Vec<String> = q
                .options
                .iter()
                .map(|o| encode_text(o).into_owned())
                .collect();
            let _ = write!(
                quiz_block,
                r#"<div class="quiz"><h3>{org} Quick Quiz!</h3><p>{}</p>"#,
                encode_text(&q.question)
            );
            if !options.is_empty() {
                let _ = write!(quiz_block, "<p>{}</p>", options.join("<br>"));
            }
            quiz_block.push_str("</div>");
        }

        let mut body = String::new();
        if digest.is_empty() {
            body.push_str(&quiz_block);
            let _ = write!(
                body,
                r#"<p class="empty">No relevant news items found matching core criteria in the last {} days.</p>"#,
                digest.recency_days
            );
        } else {
            let _ = write!(
                body,
                r#"<p class="intro">Key news items related to {org}, competitors, and relevant topics.</p>"#
            );
            body.push_str(&quiz_block);
            for s in &digest.sections {
                let _ = write!(body, "<h2>{}</h2>", encode_text(s.category.section_title()));
                for a in &s.articles {
                    self.render_card(&mut body, a);
                }
            }
        }

        let mut footer = String::new();
        if let Some(q) = quiz {
            let _ = write!(
                footer,
                "<strong>Quiz Answer:</strong> {}<br>",
                encode_text(&q.answer)
            );
        }
        let _ = write!(footer, "Automated report by {org}'s media monitor.");
        if let Some(link) = self.settings.history_link.as_deref().filter(|l| !l.is_empty()) {
            let _ = write!(
                footer,
                r#"<br><a href="{}">View history</a>"#,
                encode_double_quoted_attribute(link)
            );
        }

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>
body {{ font-family: Verdana, Geneva, Tahoma, sans-serif; background: #f4f7f6; color: #495057; }}
.container {{ max-width: 750px; margin: 20px auto; background: #fff; padding: 30px 40px; border-top: 5px solid #006a4e; }}
h2 {{ color: #006a4e; border-bottom: 2px solid #e9ecef; padding-bottom: 10px; }}
.card {{ margin-bottom: 25px; border: 1px solid #e9ecef; border-radius: 8px; padding: 20px 25px; }}
.card img {{ width: 100%; height: auto; border-radius: 6px; }}
.meta {{ font-size: 12px; color: #6c757d; border-top: 1px solid #e9ecef; padding-top: 12px; }}
.hl {{ background-color: #fff1a8; font-weight: 600; }}
.quiz {{ background: #eef7f3; border-left: 4px solid #006a4e; padding: 15px 20px; margin-bottom: 25px; }}
.empty {{ text-align: center; font-style: italic; color: #6c757d; padding: 40px 20px; }}
</style>
</head>
<body>
<div class="container">
<h1>{title}</h1>
<p class="date">{date}</p>
{body}
<hr>
<p class="footer">{footer}</p>
</div>
</body>
</html>
"#
        );

        RenderedDigest {
            subject: self.subject(digest),
            html,
            generated_at: digest.generated_at,
            article_count: digest.total(),
        }
    }

    fn render_card(&self, out: &mut String, a: &MatchedArticle) {
        out.push_str(r#"<div class="card">"#);
        if let Some(img) = a.top_image.as_deref() {
            let _ = write!(
                out,
                r#"<img src="{}" alt="Article image">"#,
                encode_double_quoted_attribute(img)
            );
        }
        let _ = write!(
            out,
            r#"<h3>{}</h3><p>{}</p><p><a href="{}">Read Full Article</a></p><p class="meta"><strong>Published:</strong> {}<br><strong>Group:</strong> {} | <strong>Keyword:</strong> {}</p></div>"#,
            encode_text(&a.headline),
            self.highlighter.highlight(&a.summary),
            encode_double_quoted_attribute(&a.link),
            a.published.format("%d %b %Y"),
            encode_text(&a.keyword_group),
            encode_text(&a.matched_keyword),
        );
    }
}
