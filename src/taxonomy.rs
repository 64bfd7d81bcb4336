// src/taxonomy.rs
//! Keyword taxonomy: named phrase groups, core-relevance flags, report categories
//! and the political-exclusion list. Loaded once from TOML and immutable afterwards.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::classify::ReportCategory;

// --- env defaults & names ---
pub const DEFAULT_TAXONOMY_CONFIG_PATH: &str = "config/taxonomy.toml";
pub const ENV_TAXONOMY_CONFIG_PATH: &str = "TAXONOMY_CONFIG_PATH";
pub const ENV_RELEVANCE_THRESHOLD: &str = "RELEVANCE_THRESHOLD";

/// Configuration problems. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid taxonomy TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("taxonomy defines no keyword groups")]
    Empty,
    #[error("duplicate keyword group `{0}`")]
    DuplicateGroup(String),
    #[error("keyword group `{0}` has no phrases")]
    EmptyGroup(String),
    #[error("keyword group `{group}` contains a blank phrase")]
    BlankPhrase { group: String },
    #[error("core group `{0}` is not assigned to any report category")]
    Unclassified(String),
    #[error("group `{0}` has a category but is not core-relevant")]
    CategoryOnNonCore(String),
    #[error("exclusion-sensitive group `{0}` is not defined")]
    UnknownExclusionGroup(String),
    #[error("scoring weights must be positive (headline={headline}, body={body})")]
    ZeroWeights { headline: u32, body: u32 },
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
struct TaxonomyFile {
    #[serde(default)]
    scoring: ScoringParams,
    #[serde(default)]
    exclusions: Option<ExclusionCfg>,
    #[serde(default)]
    groups: Vec<GroupCfg>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExclusionCfg {
    group: String,
    #[serde(default)]
    phrases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GroupCfg {
    name: String,
    #[serde(default)]
    core: bool,
    #[serde(default)]
    category: Option<ReportCategory>,
    phrases: Vec<String>,
}

/// Weights and threshold used by the relevance scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScoringParams {
    #[serde(default = "default_headline_weight")]
    pub headline_weight: u32,
    #[serde(default = "default_body_weight")]
    pub body_weight: u32,
    #[serde(default = "default_threshold")]
    pub threshold: u32,
}

fn default_headline_weight() -> u32 {
    2
}
fn default_body_weight() -> u32 {
    1
}
fn default_threshold() -> u32 {
    3
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            headline_weight: default_headline_weight(),
            body_weight: default_body_weight(),
            threshold: default_threshold(),
        }
    }
}

/// A named cluster of phrases describing one topic or entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordGroup {
    pub name: String,
    pub phrases: Vec<String>,
    pub core: bool,
    /// Present exactly when `core` is true (enforced at load).
    pub category: Option<ReportCategory>,
}

/// Phrases that nullify matches in one designated group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionList {
    pub group: Option<String>,
    pub phrases: Vec<String>,
}

impl ExclusionList {
    pub fn applies_to(&self, group: &str) -> bool {
        self.group.as_deref() == Some(group) && !self.phrases.is_empty()
    }
}

/// Validated, immutable taxonomy. Group order is the evaluation order of the scorer.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    pub scoring: ScoringParams,
    groups: Vec<KeywordGroup>,
    exclusions: ExclusionList,
    categories: HashMap<String, ReportCategory>,
}

impl Taxonomy {
    /// Load from `$TAXONOMY_CONFIG_PATH` or `config/taxonomy.toml`, then apply the
    /// `RELEVANCE_THRESHOLD` override if it parses.
    pub fn from_toml() -> Result<Self, TaxonomyError> {
        let path = std::env::var(ENV_TAXONOMY_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TAXONOMY_CONFIG_PATH));
        let mut tax = Self::from_path(&path)?;
        if let Some(t) = parse_threshold_env(std::env::var(ENV_RELEVANCE_THRESHOLD).ok()) {
            tax.scoring.threshold = t;
        }
        Ok(tax)
    }

    pub fn from_path(path: &Path) -> Result<Self, TaxonomyError> {
        let content = fs::read_to_string(path).map_err(|source| TaxonomyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile = toml::from_str(toml_str)?;
        Self::build(file)
    }

    fn build(file: TaxonomyFile) -> Result<Self, TaxonomyError> {
        if file.groups.is_empty() {
            return Err(TaxonomyError::Empty);
        }
        if file.scoring.headline_weight == 0 && file.scoring.body_weight == 0 {
            return Err(TaxonomyError::ZeroWeights {
                headline: file.scoring.headline_weight,
                body: file.scoring.body_weight,
            });
        }

        let mut seen = HashSet::new();
        let mut categories = HashMap::new();
        let mut groups = Vec::with_capacity(file.groups.len());

        for g in file.groups {
            let name = g.name.trim().to_string();
            if !seen.insert(name.clone()) {
                return Err(TaxonomyError::DuplicateGroup(name));
            }
            if g.phrases.is_empty() {
                return Err(TaxonomyError::EmptyGroup(name));
            }
            let mut phrases = Vec::with_capacity(g.phrases.len());
            for p in g.phrases {
                let p = p.trim().to_string();
                if p.is_empty() {
                    return Err(TaxonomyError::BlankPhrase { group: name });
                }
                phrases.push(p);
            }
            match (g.core, g.category) {
                (true, Some(cat)) => {
                    categories.insert(name.clone(), cat);
                }
                (true, None) => return Err(TaxonomyError::Unclassified(name)),
                (false, Some(_)) => return Err(TaxonomyError::CategoryOnNonCore(name)),
                (false, None) => {}
            }
            groups.push(KeywordGroup {
                name,
                phrases,
                core: g.core,
                category: g.category,
            });
        }

        let exclusions = match file.exclusions {
            Some(ex) => {
                let group = ex.group.trim().to_string();
                if !seen.contains(&group) {
                    return Err(TaxonomyError::UnknownExclusionGroup(group));
                }
                ExclusionList {
                    group: Some(group),
                    phrases: ex
                        .phrases
                        .into_iter()
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect(),
                }
            }
            None => ExclusionList::default(),
        };

        Ok(Self {
            scoring: file.scoring,
            groups,
            exclusions,
            categories,
        })
    }

    pub fn groups(&self) -> &[KeywordGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&KeywordGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn exclusions(&self) -> &ExclusionList {
        &self.exclusions
    }

    /// Category lookup for a core group; see [`crate::classify::classify`].
    pub fn category_of(&self, group: &str) -> Option<ReportCategory> {
        self.categories.get(group).copied()
    }

    /// Every phrase of every group, in taxonomy order (used for highlighting).
    pub fn all_phrases(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.phrases.iter().map(String::as_str))
            .collect()
    }
}

fn parse_threshold_env(raw: Option<String>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_OK: &str = r#"
[scoring]
headline_weight = 2
body_weight = 1
threshold = 3

[exclusions]
group = "Donations"
phrases = ["election", " candidate ", ""]

[[groups]]
name = "Org"
core = true
category = "primary"
phrases = ["MTFA", "Ihsan Casket"]

[[groups]]
name = "Donations"
core = true
category = "general"
phrases = ["donation"]

[[groups]]
name = "Background"
phrases = ["community"]
"#;

    #[test]
    fn loads_groups_in_order_with_categories() {
        let t = Taxonomy::from_toml_str(TOML_OK).unwrap();
        let names: Vec<_> = t.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Org", "Donations", "Background"]);
        assert_eq!(t.category_of("Org"), Some(ReportCategory::Primary));
        assert_eq!(t.category_of("Background"), None);
        assert!(t.exclusions().applies_to("Donations"));
        assert_eq!(t.exclusions().phrases, vec!["election", "candidate"]);
        assert_eq!(t.scoring, ScoringParams::default());
    }

    #[test]
    fn core_group_without_category_is_rejected() {
        let toml = r#"
[[groups]]
name = "Orphan"
core = true
phrases = ["x"]
"#;
        let err = Taxonomy::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, TaxonomyError::Unclassified(g) if g == "Orphan"));
    }

    #[test]
    fn duplicate_and_unknown_exclusion_group_are_rejected() {
        let dup = r#"
[[groups]]
name = "A"
phrases = ["x"]
[[groups]]
name = "A"
phrases = ["y"]
"#;
        assert!(matches!(
            Taxonomy::from_toml_str(dup).unwrap_err(),
            TaxonomyError::DuplicateGroup(_)
        ));

        let bad_ex = r#"
[exclusions]
group = "Nope"
phrases = ["election"]
[[groups]]
name = "A"
phrases = ["x"]
"#;
        assert!(matches!(
            Taxonomy::from_toml_str(bad_ex).unwrap_err(),
            TaxonomyError::UnknownExclusionGroup(_)
        ));
    }

    #[test]
    fn unknown_category_name_fails_to_parse() {
        let toml = r#"
[[groups]]
name = "A"
core = true
category = "sports"
phrases = ["x"]
"#;
        assert!(matches!(
            Taxonomy::from_toml_str(toml).unwrap_err(),
            TaxonomyError::Parse(_)
        ));
    }

    #[test]
    fn threshold_env_parsing() {
        assert_eq!(parse_threshold_env(Some(" 5 ".into())), Some(5));
        assert_eq!(parse_threshold_env(Some("abc".into())), None);
        assert_eq!(parse_threshold_env(None), None);
    }
}
