//! Proposed tests and their peer votes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::change::VoteStatus;
use super::error::QualityGateError;

/// Which gate a test exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Unit,
    Integration,
    E2e,
}

impl TestType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Integration => "integration",
            Self::E2e => "e2e",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = QualityGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unit" => Ok(Self::Unit),
            "integration" => Ok(Self::Integration),
            "e2e" => Ok(Self::E2e),
            other => Err(QualityGateError::InvalidArgument(format!(
                "test type must be unit, integration or e2e, got {other}"
            ))),
        }
    }
}

/// A test proposed by the QA assignee, reviewed independently of its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSubmission {
    pub test_id: String,
    pub seq: u64,
    pub change_id: String,
    pub submitted_by: String,
    pub test_type: TestType,
    pub vote: VoteStatus,
    pub submitted_at: DateTime<Utc>,
}

impl TestSubmission {
    pub fn new(
        seq: u64,
        change_id: impl Into<String>,
        submitted_by: impl Into<String>,
        test_type: TestType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            test_id: Uuid::new_v4().to_string(),
            seq,
            change_id: change_id.into(),
            submitted_by: submitted_by.into(),
            test_type,
            vote: VoteStatus::Pending,
            submitted_at: now,
        }
    }
}
