//! Exclusive, capability-gated QA claims.

use chrono::{DateTime, Utc};

use crate::domain::{Change, ChangeStatus, QualityGateError, Result, QA_CAPABILITY};
use crate::store::GateDocument;

/// Assign `change_id` to `resident_id` for QA.
///
/// Requires a resident carrying the `qa` capability, an unclaimed change,
/// and status `needs_qa`. All checks run before the first write, so a
/// rejected claim leaves the document untouched. Callers must hold the
/// store's exclusion boundary for check and set to be atomic.
pub fn claim_qa(
    doc: &mut GateDocument,
    change_id: &str,
    resident_id: &str,
    now: DateTime<Utc>,
) -> Result<Change> {
    let resident = doc.resident(resident_id)?;
    if !resident.has_capability(QA_CAPABILITY) {
        return Err(QualityGateError::Unauthorized {
            resident_id: resident_id.to_string(),
            reason: format!("missing '{QA_CAPABILITY}' specialization"),
        });
    }

    let change = doc.change_mut(change_id)?;
    if let Some(holder) = &change.qa.assigned_to {
        return Err(QualityGateError::AlreadyClaimed {
            change_id: change_id.to_string(),
            assigned_to: holder.clone(),
        });
    }
    change.require_status(ChangeStatus::NeedsQa, "claim")?;

    change.qa.assigned_to = Some(resident_id.to_string());
    change.qa.claimed_at = Some(now);
    change.transition(ChangeStatus::NeedsTests, now);
    Ok(change.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Vote;
    use crate::residents::register_resident;
    use crate::voting::{record_change_vote, submit_change_for_vote};

    fn approved_change(doc: &mut GateDocument) -> String {
        let c = submit_change_for_vote(doc, "t", "d", "author", Utc::now()).unwrap();
        record_change_vote(doc, &c.change_id, Vote::Approved, Utc::now()).unwrap();
        c.change_id
    }

    fn seed(doc: &mut GateDocument) {
        register_resident(doc, "qa_one", "One", ["qa"], None, Utc::now()).unwrap();
        register_resident(doc, "qa_two", "Two", ["qa"], None, Utc::now()).unwrap();
        register_resident(doc, "reviewer", "Rev", ["review"], None, Utc::now()).unwrap();
    }

    #[test]
    fn test_claim_success() {
        let mut doc = GateDocument::default();
        seed(&mut doc);
        let id = approved_change(&mut doc);
        let c = claim_qa(&mut doc, &id, "qa_one", Utc::now()).unwrap();
        assert_eq!(c.qa.assigned_to.as_deref(), Some("qa_one"));
        assert!(c.qa.claimed_at.is_some());
        assert_eq!(c.status, ChangeStatus::NeedsTests);
    }

    #[test]
    fn test_claim_without_capability_leaves_document_unchanged() {
        let mut doc = GateDocument::default();
        seed(&mut doc);
        let id = approved_change(&mut doc);
        let before = doc.clone();
        let err = claim_qa(&mut doc, &id, "reviewer", Utc::now()).unwrap_err();
        assert!(matches!(err, QualityGateError::Unauthorized { .. }));
        assert_eq!(doc, before);
        assert!(doc.change(&id).unwrap().qa.assigned_to.is_none());
    }

    #[test]
    fn test_second_claim_fails() {
        let mut doc = GateDocument::default();
        seed(&mut doc);
        let id = approved_change(&mut doc);
        claim_qa(&mut doc, &id, "qa_one", Utc::now()).unwrap();
        let err = claim_qa(&mut doc, &id, "qa_two", Utc::now()).unwrap_err();
        match err {
            QualityGateError::AlreadyClaimed { assigned_to, .. } => {
                assert_eq!(assigned_to, "qa_one")
            }
            other => panic!("expected AlreadyClaimed, got {other:?}"),
        }
    }

    #[test]
    fn test_claim_before_vote_fails() {
        let mut doc = GateDocument::default();
        seed(&mut doc);
        let c = submit_change_for_vote(&mut doc, "t", "d", "a", Utc::now()).unwrap();
        let err = claim_qa(&mut doc, &c.change_id, "qa_one", Utc::now()).unwrap_err();
        assert!(matches!(err, QualityGateError::InvalidTransition { .. }));
    }

    #[test]
    fn test_claim_unknown_resident() {
        let mut doc = GateDocument::default();
        let id = approved_change(&mut doc);
        assert!(matches!(
            claim_qa(&mut doc, &id, "ghost", Utc::now()),
            Err(QualityGateError::ResidentNotFound(_))
        ));
    }
}
