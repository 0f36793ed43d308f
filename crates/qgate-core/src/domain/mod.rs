//! Domain models for the quality-gate pipeline.
//!
//! - `Change`: a proposed modification and its gate state
//! - `Resident`: a capability-tagged actor
//! - `TestSubmission`: a proposed test and its peer vote
//! - `IntegrationBatch`: a group of changes integration-tested together

pub mod batch;
pub mod change;
pub mod error;
pub mod resident;
pub mod test_submission;

pub use batch::{BatchStatus, IntegrationBatch};
pub use change::{
    BlindVote, Change, ChangeStatus, FailedStage, GateStatus, Gates, QaAssignment,
    StatusTransition, Vote, VoteStatus,
};
pub use error::{QualityGateError, Result};
pub use resident::{normalize_tags, Resident, QA_CAPABILITY, REVIEW_CAPABILITY};
pub use test_submission::{TestSubmission, TestType};
