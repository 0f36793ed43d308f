//! Capability-tagged actors.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability required to claim a change for QA.
pub const QA_CAPABILITY: &str = "qa";

/// Capability carried by peer reviewers.
pub const REVIEW_CAPABILITY: &str = "review";

/// An actor eligible to act on changes according to its specializations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    pub resident_id: String,
    pub name: String,
    /// Capability tags, normalized to trimmed lowercase.
    pub specializations: BTreeSet<String>,
    pub focus_statement: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl Resident {
    pub fn new<I, S>(
        resident_id: impl Into<String>,
        name: impl Into<String>,
        specializations: I,
        focus_statement: Option<String>,
        now: DateTime<Utc>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            resident_id: resident_id.into(),
            name: name.into(),
            specializations: normalize_tags(specializations),
            focus_statement,
            registered_at: now,
        }
    }

    pub fn has_capability(&self, tag: &str) -> bool {
        self.specializations.contains(tag)
    }
}

/// Trim, lowercase and drop empty tags.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
