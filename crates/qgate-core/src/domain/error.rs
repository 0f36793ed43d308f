//! Error taxonomy for the quality-gate pipeline.

use std::path::PathBuf;

use super::change::ChangeStatus;

/// Every policy violation and storage failure surfaces as this one type.
///
/// A call that returns `Err` has not mutated persisted state.
#[derive(Debug, thiserror::Error)]
pub enum QualityGateError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("change not found: {0}")]
    ChangeNotFound(String),

    #[error("resident not found: {0}")]
    ResidentNotFound(String),

    #[error("test submission not found: {0}")]
    TestNotFound(String),

    #[error("integration batch not found: {0}")]
    BatchNotFound(String),

    #[error("resident {resident_id} is not authorized: {reason}")]
    Unauthorized { resident_id: String, reason: String },

    #[error("change {change_id} already claimed by {assigned_to}")]
    AlreadyClaimed {
        change_id: String,
        assigned_to: String,
    },

    #[error("cannot {operation} change {change_id} in status {status}")]
    InvalidTransition {
        change_id: String,
        status: ChangeStatus,
        operation: &'static str,
    },

    #[error("{0}")]
    Precondition(String),

    #[error("corrupt state document {}: {source}", path.display())]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl QualityGateError {
    /// Whether the error is a policy rejection rather than a storage failure.
    pub fn is_policy_violation(&self) -> bool {
        !matches!(
            self,
            Self::CorruptState { .. } | Self::Serialization(_) | Self::Io(_)
        )
    }
}

/// Result type for quality-gate operations.
pub type Result<T> = std::result::Result<T, QualityGateError>;
