//! Change records and the gate state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::QualityGateError;

/// Gate at which a change can fail terminally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailedStage {
    Unit,
    Integration,
    E2e,
}

/// Position of a change in the pipeline.
///
/// `pending_vote -> needs_qa -> needs_tests -> needs_integration -> needs_e2e
/// -> ready_for_merge`, with `rejected` and `*_failed` as divergent terminals.
/// Serialized as the snake_case strings used in the persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChangeStatus {
    PendingVote,
    NeedsQa,
    NeedsTests,
    NeedsIntegration,
    NeedsE2e,
    ReadyForMerge,
    Rejected,
    Failed(FailedStage),
}

impl ChangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingVote => "pending_vote",
            Self::NeedsQa => "needs_qa",
            Self::NeedsTests => "needs_tests",
            Self::NeedsIntegration => "needs_integration",
            Self::NeedsE2e => "needs_e2e",
            Self::ReadyForMerge => "ready_for_merge",
            Self::Rejected => "rejected",
            Self::Failed(FailedStage::Unit) => "unit_failed",
            Self::Failed(FailedStage::Integration) => "integration_failed",
            Self::Failed(FailedStage::E2e) => "e2e_failed",
        }
    }

    /// Terminal states only change through an external resubmission.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ReadyForMerge | Self::Rejected | Self::Failed(_))
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeStatus {
    type Err = QualityGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "pending_vote" => Self::PendingVote,
            "needs_qa" => Self::NeedsQa,
            "needs_tests" => Self::NeedsTests,
            "needs_integration" => Self::NeedsIntegration,
            "needs_e2e" => Self::NeedsE2e,
            "ready_for_merge" => Self::ReadyForMerge,
            "rejected" => Self::Rejected,
            "unit_failed" => Self::Failed(FailedStage::Unit),
            "integration_failed" => Self::Failed(FailedStage::Integration),
            "e2e_failed" => Self::Failed(FailedStage::E2e),
            other => {
                return Err(QualityGateError::InvalidArgument(format!(
                    "unknown change status: {other}"
                )))
            }
        };
        Ok(status)
    }
}

impl TryFrom<String> for ChangeStatus {
    type Error = QualityGateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChangeStatus> for String {
    fn from(status: ChangeStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Outcome of a single gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    #[default]
    Pending,
    Passed,
    Failed,
}

impl GateStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            Self::Passed
        } else {
            Self::Failed
        }
    }
}

/// The three gates a change must clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gates {
    pub unit: GateStatus,
    pub integration: GateStatus,
    pub e2e: GateStatus,
}

/// State of a vote, either on a change or on a proposed test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A cast vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Approved,
    Rejected,
}

impl Vote {
    pub fn is_approval(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl From<Vote> for VoteStatus {
    fn from(vote: Vote) -> Self {
        match vote {
            Vote::Approved => Self::Approved,
            Vote::Rejected => Self::Rejected,
        }
    }
}

impl FromStr for Vote {
    type Err = QualityGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(QualityGateError::InvalidArgument(format!(
                "vote must be approved or rejected, got {other}"
            ))),
        }
    }
}

/// Anonymous outcome of the change vote. The voter is never recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindVote {
    pub status: VoteStatus,
}

/// QA ownership of a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaAssignment {
    pub assigned_to: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
}

/// One entry of a change's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: ChangeStatus,
    pub to: ChangeStatus,
    pub at: DateTime<Utc>,
}

/// A proposed modification moving through the gate pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub change_id: String,
    /// Creation order within the workspace.
    pub seq: u64,
    pub title: String,
    pub description: String,
    pub author_id: String,
    pub status: ChangeStatus,
    pub blind_vote: BlindVote,
    pub qa: QaAssignment,
    pub gates: Gates,
    /// Failed integration batches this change has been part of.
    #[serde(default)]
    pub integration_attempts: u32,
    #[serde(default)]
    pub history: Vec<StatusTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Change {
    /// Create a change awaiting its vote, with every gate pending.
    pub fn new(
        seq: u64,
        title: impl Into<String>,
        description: impl Into<String>,
        author_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            change_id: Uuid::new_v4().to_string(),
            seq,
            title: title.into(),
            description: description.into(),
            author_id: author_id.into(),
            status: ChangeStatus::PendingVote,
            blind_vote: BlindVote::default(),
            qa: QaAssignment::default(),
            gates: Gates::default(),
            integration_attempts: 0,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `to`, recording the step in `history`. Returns the previous status.
    pub fn transition(&mut self, to: ChangeStatus, now: DateTime<Utc>) -> ChangeStatus {
        let from = self.status;
        self.status = to;
        self.updated_at = now;
        self.history.push(StatusTransition { from, to, at: now });
        from
    }

    /// Fail with `InvalidTransition` unless the change is in `expected`.
    pub fn require_status(
        &self,
        expected: ChangeStatus,
        operation: &'static str,
    ) -> super::error::Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(QualityGateError::InvalidTransition {
                change_id: self.change_id.clone(),
                status: self.status,
                operation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_roundtrip() {
        let all = [
            ChangeStatus::PendingVote,
            ChangeStatus::NeedsQa,
            ChangeStatus::NeedsTests,
            ChangeStatus::NeedsIntegration,
            ChangeStatus::NeedsE2e,
            ChangeStatus::ReadyForMerge,
            ChangeStatus::Rejected,
            ChangeStatus::Failed(FailedStage::Unit),
            ChangeStatus::Failed(FailedStage::Integration),
            ChangeStatus::Failed(FailedStage::E2e),
        ];
        for status in all {
            assert_eq!(status.as_str().parse::<ChangeStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_serializes_as_plain_string() {
        let json = serde_json::to_string(&ChangeStatus::Failed(FailedStage::Unit)).unwrap();
        assert_eq!(json, "\"unit_failed\"");
        let back: ChangeStatus = serde_json::from_str("\"needs_e2e\"").unwrap();
        assert_eq!(back, ChangeStatus::NeedsE2e);
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("merged".parse::<ChangeStatus>().is_err());
        assert!(serde_json::from_str::<ChangeStatus>("\"merged\"").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(ChangeStatus::ReadyForMerge.is_terminal());
        assert!(ChangeStatus::Rejected.is_terminal());
        assert!(ChangeStatus::Failed(FailedStage::E2e).is_terminal());
        assert!(!ChangeStatus::NeedsIntegration.is_terminal());
        assert!(!ChangeStatus::PendingVote.is_terminal());
    }

    #[test]
    fn test_new_change_defaults() {
        let change = Change::new(1, "Add queue guardrails", "", "resident_delta", Utc::now());
        assert_eq!(change.status, ChangeStatus::PendingVote);
        assert_eq!(change.gates, Gates::default());
        assert_eq!(change.blind_vote.status, VoteStatus::Pending);
        assert!(change.qa.assigned_to.is_none());
        assert!(change.history.is_empty());
    }

    #[test]
    fn test_transition_records_history() {
        let now = Utc::now();
        let mut change = Change::new(1, "t", "d", "a", now);
        let prev = change.transition(ChangeStatus::NeedsQa, now);
        assert_eq!(prev, ChangeStatus::PendingVote);
        assert_eq!(change.history.len(), 1);
        assert_eq!(change.history[0].to, ChangeStatus::NeedsQa);
    }

    #[test]
    fn test_gates_json_shape() {
        let gates = Gates {
            unit: GateStatus::Passed,
            integration: GateStatus::Pending,
            e2e: GateStatus::Failed,
        };
        let value = serde_json::to_value(gates).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"unit": "passed", "integration": "pending", "e2e": "failed"})
        );
    }

    #[test]
    fn test_vote_parse() {
        assert_eq!("approved".parse::<Vote>().unwrap(), Vote::Approved);
        assert_eq!("rejected".parse::<Vote>().unwrap(), Vote::Rejected);
        assert!("maybe".parse::<Vote>().is_err());
    }
}
