//! Structured observability hooks for gate pipeline events.
//!
//! Every event carries a stable `event` field so log pipelines can filter on
//! it. Lifecycle events go out at `info!`, persistence at `debug!`, and
//! rejected operations at `warn!`.
//!
//! Operations collect [`GateEvent`]s while they run and emit them only after
//! the store has committed, so the log never reports state that was not
//! persisted.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{Change, ChangeStatus, TestType, VoteStatus};

/// RAII guard that enters a change-scoped tracing span.
///
/// ```ignore
/// let _span = ChangeSpan::enter("6f1c...");
/// // events emitted here carry change_id = "6f1c..."
/// ```
pub struct ChangeSpan {
    _span: tracing::span::EnteredSpan,
}

impl ChangeSpan {
    pub fn enter(change_id: &str) -> Self {
        let span = tracing::info_span!("qgate.change", change_id = %change_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// A lifecycle event held back until its transaction commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    ChangeSubmitted {
        change_id: String,
        author_id: String,
    },
    Transition {
        change_id: String,
        from: ChangeStatus,
        to: ChangeStatus,
    },
    ResidentRegistered {
        resident_id: String,
        capabilities: usize,
    },
    QaClaimed {
        change_id: String,
        resident_id: String,
    },
    TestSubmitted {
        test_id: String,
        change_id: String,
        test_type: TestType,
    },
    TestVoted {
        test_id: String,
        vote: VoteStatus,
    },
    BatchCreated {
        batch_id: String,
        members: usize,
    },
    BatchResolved {
        batch_id: String,
        passed: bool,
        members: usize,
    },
}

impl GateEvent {
    /// The step `change` took at `now`, if its latest history entry is from
    /// this operation.
    pub fn transition_at(change: &Change, now: DateTime<Utc>) -> Option<Self> {
        change
            .history
            .last()
            .filter(|t| t.at == now)
            .map(|t| Self::Transition {
                change_id: change.change_id.clone(),
                from: t.from,
                to: t.to,
            })
    }

    pub fn emit(&self) {
        match self {
            Self::ChangeSubmitted {
                change_id,
                author_id,
            } => emit_change_submitted(change_id, author_id),
            Self::Transition {
                change_id,
                from,
                to,
            } => emit_transition(change_id, *from, *to),
            Self::ResidentRegistered {
                resident_id,
                capabilities,
            } => emit_resident_registered(resident_id, *capabilities),
            Self::QaClaimed {
                change_id,
                resident_id,
            } => emit_qa_claimed(change_id, resident_id),
            Self::TestSubmitted {
                test_id,
                change_id,
                test_type,
            } => emit_test_submitted(test_id, change_id, *test_type),
            Self::TestVoted { test_id, vote } => emit_test_voted(test_id, *vote),
            Self::BatchCreated { batch_id, members } => emit_batch_created(batch_id, *members),
            Self::BatchResolved {
                batch_id,
                passed,
                members,
            } => emit_batch_resolved(batch_id, *passed, *members),
        }
    }
}

pub fn emit_change_submitted(change_id: &str, author_id: &str) {
    info!(event = "change.submitted", change_id = %change_id, author_id = %author_id);
}

pub fn emit_transition(change_id: &str, from: ChangeStatus, to: ChangeStatus) {
    info!(
        event = "change.transition",
        change_id = %change_id,
        from = %from,
        to = %to,
    );
}

pub fn emit_resident_registered(resident_id: &str, capabilities: usize) {
    info!(
        event = "resident.registered",
        resident_id = %resident_id,
        capabilities = capabilities,
    );
}

pub fn emit_qa_claimed(change_id: &str, resident_id: &str) {
    info!(event = "qa.claimed", change_id = %change_id, resident_id = %resident_id);
}

pub fn emit_test_submitted(test_id: &str, change_id: &str, test_type: TestType) {
    info!(
        event = "test.submitted",
        test_id = %test_id,
        change_id = %change_id,
        test_type = %test_type,
    );
}

pub fn emit_test_voted(test_id: &str, vote: VoteStatus) {
    info!(event = "test.voted", test_id = %test_id, vote = ?vote);
}

pub fn emit_batch_created(batch_id: &str, members: usize) {
    info!(event = "batch.created", batch_id = %batch_id, members = members);
}

pub fn emit_batch_resolved(batch_id: &str, passed: bool, members: usize) {
    info!(
        event = "batch.resolved",
        batch_id = %batch_id,
        passed = passed,
        members = members,
    );
}

pub fn emit_state_saved(path: &Path, digest: &str) {
    debug!(event = "state.saved", path = %path.display(), digest = %digest);
}

pub fn emit_operation_rejected(operation: &str, error: &dyn std::fmt::Display) {
    warn!(event = "operation.rejected", operation = %operation, error = %error);
}
