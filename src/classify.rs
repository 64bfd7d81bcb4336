// src/classify.rs
//! Report categories and the group → category lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::taxonomy::{Taxonomy, TaxonomyError};

/// Digest section a matched article is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    /// The organization itself and its subsidiaries.
    Primary,
    Competitor,
    /// Other social-sector and advocacy organizations.
    PeerSector,
    General,
}

impl ReportCategory {
    /// Display order of digest sections.
    pub const ALL: [ReportCategory; 4] = [
        ReportCategory::Primary,
        ReportCategory::Competitor,
        ReportCategory::PeerSector,
        ReportCategory::General,
    ];

    pub fn section_title(self) -> &'static str {
        match self {
            ReportCategory::Primary => "Organization & Subsidiary Updates",
            ReportCategory::Competitor => "Competitor & Peer News",
            ReportCategory::PeerSector => "Other Social Sector News",
            ReportCategory::General => "General Topics",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportCategory::Primary => "primary",
            ReportCategory::Competitor => "competitor",
            ReportCategory::PeerSector => "peer_sector",
            ReportCategory::General => "general",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a matched group to its report category.
///
/// Only core groups reach this point (the scorer never labels with anything else),
/// and the taxonomy loader refuses core groups without a category. An `Err` here
/// therefore means the caller passed a group that is not part of this taxonomy.
pub fn classify(taxonomy: &Taxonomy, group: &str) -> Result<ReportCategory, TaxonomyError> {
    taxonomy
        .category_of(group)
        .ok_or_else(|| TaxonomyError::Unclassified(group.to_string()))
}
