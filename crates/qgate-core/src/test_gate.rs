//! Test proposals, peer votes on tests, and unit gate results.

use chrono::{DateTime, Utc};

use crate::config::GatePolicy;
use crate::domain::{
    Change, ChangeStatus, FailedStage, GateStatus, QualityGateError, Result, TestSubmission,
    TestType, Vote, VoteStatus,
};
use crate::e2e;
use crate::store::GateDocument;

/// Propose a test of `test_type` for a claimed change.
///
/// With `enforce_qa_assignee` only the resident holding the QA claim may
/// propose tests.
pub fn submit_test_for_vote(
    doc: &mut GateDocument,
    policy: &GatePolicy,
    change_id: &str,
    resident_id: &str,
    test_type: TestType,
    now: DateTime<Utc>,
) -> Result<TestSubmission> {
    doc.resident(resident_id)?;
    let change = doc.change(change_id)?;
    if change.status.is_terminal() {
        return Err(QualityGateError::InvalidTransition {
            change_id: change_id.to_string(),
            status: change.status,
            operation: "propose tests for",
        });
    }
    match change.qa.assigned_to.as_deref() {
        None => {
            return Err(QualityGateError::Precondition(format!(
                "change {change_id} has no QA assignee"
            )))
        }
        Some(holder) if policy.enforce_qa_assignee && holder != resident_id => {
            return Err(QualityGateError::Unauthorized {
                resident_id: resident_id.to_string(),
                reason: format!("change {change_id} is assigned to {holder}"),
            })
        }
        Some(_) => {}
    }

    let submission =
        TestSubmission::new(doc.next_test_seq(), change_id, resident_id, test_type, now);
    doc.test_submissions
        .insert(submission.test_id.clone(), submission.clone());
    Ok(submission)
}

/// Peer review of a proposed test. Independent of the test's later result.
pub fn record_test_vote(
    doc: &mut GateDocument,
    test_id: &str,
    vote: Vote,
) -> Result<TestSubmission> {
    let submission = doc.test_submission_mut(test_id)?;
    if submission.vote != VoteStatus::Pending {
        return Err(QualityGateError::Precondition(format!(
            "test {test_id} already voted {:?}",
            submission.vote
        )));
    }
    submission.vote = vote.into();
    Ok(submission.clone())
}

/// Record a reported test outcome against the change's gate.
///
/// `unit` requires `needs_tests` and moves the change to
/// `needs_integration` on a pass or `unit_failed` otherwise. `e2e` follows
/// [`e2e::record_e2e_result`]. Integration outcomes belong to batches and
/// are rejected here.
pub fn record_test_result(
    doc: &mut GateDocument,
    policy: &GatePolicy,
    change_id: &str,
    test_type: TestType,
    passed: bool,
    now: DateTime<Utc>,
) -> Result<Change> {
    match test_type {
        TestType::Unit => record_unit_result(doc, policy, change_id, passed, now),
        TestType::E2e => e2e::record_e2e_result(doc, policy, change_id, passed, now),
        TestType::Integration => {
            let change = doc.change(change_id)?;
            Err(QualityGateError::InvalidTransition {
                change_id: change_id.to_string(),
                status: change.status,
                operation: "record an unbatched integration result for",
            })
        }
    }
}

fn record_unit_result(
    doc: &mut GateDocument,
    policy: &GatePolicy,
    change_id: &str,
    passed: bool,
    now: DateTime<Utc>,
) -> Result<Change> {
    doc.change(change_id)?
        .require_status(ChangeStatus::NeedsTests, "record unit result for")?;
    if policy.require_approved_test {
        ensure_approved_test(doc, change_id, TestType::Unit)?;
    }

    let change = doc.change_mut(change_id)?;
    change.gates.unit = GateStatus::from_passed(passed);
    let to = if passed {
        ChangeStatus::NeedsIntegration
    } else {
        ChangeStatus::Failed(FailedStage::Unit)
    };
    change.transition(to, now);
    Ok(change.clone())
}

/// Fail unless an approved test of `test_type` exists for the change.
pub(crate) fn ensure_approved_test(
    doc: &GateDocument,
    change_id: &str,
    test_type: TestType,
) -> Result<()> {
    let approved = doc.test_submissions.values().any(|t| {
        t.change_id == change_id && t.test_type == test_type && t.vote == VoteStatus::Approved
    });
    if approved {
        Ok(())
    } else {
        Err(QualityGateError::Precondition(format!(
            "change {change_id} has no approved {test_type} test"
        )))
    }
}
