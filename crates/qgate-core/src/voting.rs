//! Change submission and the blind change vote.
//!
//! The vote carries only its decision. No voter identity is accepted or
//! stored, so neither the author nor later reviewers can see who decided.

use chrono::{DateTime, Utc};

use crate::domain::{Change, ChangeStatus, QualityGateError, Result, Vote};
use crate::store::GateDocument;

/// Create a change in `pending_vote` with every gate pending.
pub fn submit_change_for_vote(
    doc: &mut GateDocument,
    title: &str,
    description: &str,
    author_id: &str,
    now: DateTime<Utc>,
) -> Result<Change> {
    if title.trim().is_empty() {
        return Err(QualityGateError::MissingField("title"));
    }
    if author_id.trim().is_empty() {
        return Err(QualityGateError::MissingField("author_id"));
    }

    let change = Change::new(
        doc.next_change_seq(),
        title.trim(),
        description,
        author_id.trim(),
        now,
    );
    doc.changes.insert(change.change_id.clone(), change.clone());
    Ok(change)
}

/// Record the single deciding vote on a change.
///
/// `approved` moves the change to `needs_qa`; `rejected` ends it in
/// `rejected`.
pub fn record_change_vote(
    doc: &mut GateDocument,
    change_id: &str,
    vote: Vote,
    now: DateTime<Utc>,
) -> Result<Change> {
    let change = doc.change_mut(change_id)?;
    change.require_status(ChangeStatus::PendingVote, "vote on")?;

    change.blind_vote.status = vote.into();
    let to = if vote.is_approval() {
        ChangeStatus::NeedsQa
    } else {
        ChangeStatus::Rejected
    };
    change.transition(to, now);
    Ok(change.clone())
}
