//! Final end-to-end gate.

use chrono::{DateTime, Utc};

use crate::config::GatePolicy;
use crate::domain::{
    Change, ChangeStatus, FailedStage, GateStatus, QualityGateError, Result, TestType,
};
use crate::store::GateDocument;
use crate::test_gate::ensure_approved_test;

/// Record the e2e outcome for a change that has passed integration.
///
/// A pass sets `ready_for_merge`, the signal merge tooling waits on. A
/// failure ends the change in `e2e_failed`.
pub fn record_e2e_result(
    doc: &mut GateDocument,
    policy: &GatePolicy,
    change_id: &str,
    passed: bool,
    now: DateTime<Utc>,
) -> Result<Change> {
    let change = doc.change(change_id)?;
    if change.gates.integration != GateStatus::Passed {
        return Err(QualityGateError::InvalidTransition {
            change_id: change_id.to_string(),
            status: change.status,
            operation: "record e2e result before integration passed for",
        });
    }
    change.require_status(ChangeStatus::NeedsE2e, "record e2e result for")?;
    if policy.require_approved_test {
        ensure_approved_test(doc, change_id, TestType::E2e)?;
    }

    let change = doc.change_mut(change_id)?;
    change.gates.e2e = GateStatus::from_passed(passed);
    let to = if passed {
        ChangeStatus::ReadyForMerge
    } else {
        ChangeStatus::Failed(FailedStage::E2e)
    };
    change.transition(to, now);
    Ok(change.clone())
}
