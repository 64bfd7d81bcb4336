// src/relevance.rs
//! Relevance scorer: phrase regex compilation, weighted headline/body counting,
//! exclusion suppression and best core-match selection.

use regex::Regex;
use std::sync::Arc;
use tracing::info;

use crate::taxonomy::{ScoringParams, Taxonomy};

// Dev logging gate: RELEVANCE_DEV_LOG=1 AND a debug build (or MONITOR_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("RELEVANCE_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("MONITOR_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short stable id for a headline so dev logs never carry raw text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn dev_log_relevance(event: &str, headline: &str, result: &ScoreResult, threshold: u32) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(headline);
    let best = result.best.as_ref().map(|m| m.group.as_str()).unwrap_or("-");
    let suppressed = truncate_vec(&result.suppressed, 5);
    info!(
        target: "relevance",
        %id, total = result.total, %threshold, event, best,
        suppressed = ?suppressed
    );
}

pub(crate) fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

/// The phrase that labels a relevant article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    pub phrase: String,
    pub group: String,
    /// Contribution of this single phrase (headline + body, weighted).
    pub score: u32,
}

/// Result of scoring one (headline, body) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreResult {
    pub total: u32,
    /// Set only when `total >= threshold` and a core group matched.
    pub best: Option<KeywordMatch>,
    /// `phrase:exclusion` markers for matches dropped by the exclusion list.
    pub suppressed: Vec<String>,
}

impl ScoreResult {
    pub fn is_match(&self) -> bool {
        self.best.is_some()
    }
}

/* ----------------------------
Compiled scorer structures
---------------------------- */

#[derive(Debug)]
struct CompiledPhrase {
    phrase: String,
    re: Regex,
}

#[derive(Debug)]
struct CompiledGroup {
    name: String,
    core: bool,
    exclusion_sensitive: bool,
    phrases: Vec<CompiledPhrase>,
}

/// Escaped phrase with `\b` on each side that starts/ends with a word character,
/// so phrases like "H.O.M.E." still match at a boundary.
pub fn phrase_pattern(phrase: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if phrase.chars().next().is_some_and(is_word) { r"\b" } else { "" };
    let trail = if phrase.chars().last().is_some_and(is_word) { r"\b" } else { "" };
    format!("{lead}{}{trail}", regex::escape(phrase))
}

/// Case-insensitive whole-word/phrase pattern.
pub fn phrase_regex(phrase: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i){}", phrase_pattern(phrase)))
}

/// Holds compiled phrase regexes in taxonomy order; shared read-only across the run.
#[derive(Debug)]
pub struct RelevanceScorer {
    params: ScoringParams,
    groups: Vec<CompiledGroup>,
    exclusions: Vec<CompiledPhrase>,
}

impl RelevanceScorer {
    /// Compile every phrase once. Fails only if a phrase cannot be turned into a regex
    /// (e.g. exceeds the regex size limit), which is a configuration error.
    pub fn new(taxonomy: &Taxonomy) -> anyhow::Result<Self> {
        Self::with_params(taxonomy, taxonomy.scoring)
    }

    pub fn with_params(taxonomy: &Taxonomy, params: ScoringParams) -> anyhow::Result<Self> {
        let compile = |p: &str| -> anyhow::Result<CompiledPhrase> {
            let re = phrase_regex(p)
                .map_err(|e| anyhow::anyhow!("phrase `{}` regex error: {}", p, e))?;
            Ok(CompiledPhrase {
                phrase: p.to_string(),
                re,
            })
        };

        let ex = taxonomy.exclusions();
        let groups = taxonomy
            .groups()
            .iter()
            .map(|g| {
                let phrases = g
                    .phrases
                    .iter()
                    .map(|p| compile(p))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(CompiledGroup {
                    name: g.name.clone(),
                    core: g.core,
                    exclusion_sensitive: ex.applies_to(&g.name),
                    phrases,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let exclusions = ex
            .phrases
            .iter()
            .map(|p| compile(p))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            params,
            groups,
            exclusions,
        })
    }

    pub fn params(&self) -> ScoringParams {
        self.params
    }

    /// First exclusion phrase found in headline or body, if any.
    fn find_exclusion(&self, headline: &str, body: &str) -> Option<&str> {
        self.exclusions
            .iter()
            .find(|x| x.re.is_match(headline) || x.re.is_match(body))
            .map(|x| x.phrase.as_str())
    }

    /// Weighted keyword score with exclusion suppression and best-match selection.
    pub fn score(&self, headline: &str, body: &str) -> ScoreResult {
        let mut out = ScoreResult::default();
        if headline.trim().is_empty() && body.trim().is_empty() {
            return out;
        }

        let mut best_score = 0u32;
        let mut best: Option<KeywordMatch> = None;
        // Evaluated lazily, at most once per article.
        let mut exclusion: Option<Option<&str>> = None;

        for g in &self.groups {
            for p in &g.phrases {
                let hl = p.re.find_iter(headline).count() as u32;
                let bd = p.re.find_iter(body).count() as u32;
                let contribution = hl
                    .saturating_mul(self.params.headline_weight)
                    .saturating_add(bd.saturating_mul(self.params.body_weight));
                if contribution == 0 {
                    continue;
                }

                if g.exclusion_sensitive {
                    let hit = *exclusion.get_or_insert_with(|| self.find_exclusion(headline, body));
                    if let Some(term) = hit {
                        tracing::debug!(
                            target: "relevance",
                            phrase = %p.phrase, exclusion = term,
                            "ignoring match due to exclusion term"
                        );
                        out.suppressed.push(format!("{}:{}", p.phrase, term));
                        continue;
                    }
                }

                out.total = out.total.saturating_add(contribution);
                if g.core && contribution > best_score {
                    best_score = contribution;
                    best = Some(KeywordMatch {
                        phrase: p.phrase.clone(),
                        group: g.name.clone(),
                        score: contribution,
                    });
                }
            }
        }

        if out.total >= self.params.threshold && best.is_some() {
            out.best = best;
            dev_log_relevance("passed", headline, &out, self.params.threshold);
        } else if out.total > 0 {
            dev_log_relevance("below_threshold", headline, &out, self.params.threshold);
        }
        out
    }
}

/// Convenience alias used by the pipeline.
pub type SharedScorer = Arc<RelevanceScorer>;

/* ----------------------------
Tests
---------------------------- */
