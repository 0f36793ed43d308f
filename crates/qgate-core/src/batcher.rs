//! Integration batching.
//!
//! Changes in `needs_integration` are grouped into bounded batches in
//! creation order. A change sits in at most one pending batch; once the batch
//! resolves, passing members move on to `needs_e2e` and failing members are
//! re-queued for the next batch until their attempt budget runs out.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::config::GatePolicy;
use crate::domain::{
    BatchStatus, ChangeStatus, FailedStage, GateStatus, IntegrationBatch, QualityGateError,
    Result,
};
use crate::store::GateDocument;

/// Ids of eligible changes, in creation order, not already in a pending batch.
pub fn eligible_for_integration(doc: &GateDocument) -> Vec<String> {
    let batched: HashSet<&str> = doc
        .integration_tasks
        .values()
        .filter(|b| b.is_pending())
        .flat_map(|b| b.change_ids.iter().map(String::as_str))
        .collect();

    doc.changes_in_order()
        .into_iter()
        .filter(|c| c.status == ChangeStatus::NeedsIntegration)
        .filter(|c| !batched.contains(c.change_id.as_str()))
        .map(|c| c.change_id.clone())
        .collect()
}

/// Partition every eligible change into new pending batches of at most
/// `max_batch_size` members. Returns only the batches created by this call;
/// with nothing eligible the result is empty and the document is unchanged.
pub fn create_integration_batches(
    doc: &mut GateDocument,
    max_batch_size: usize,
    now: DateTime<Utc>,
) -> Result<Vec<IntegrationBatch>> {
    if max_batch_size == 0 {
        return Err(QualityGateError::InvalidArgument(
            "max_batch_size must be at least 1".to_string(),
        ));
    }

    let eligible = eligible_for_integration(doc);
    let mut created = Vec::new();
    for members in eligible.chunks(max_batch_size) {
        let batch = IntegrationBatch::new(doc.next_batch_seq(), members.to_vec(), now);
        doc.integration_tasks
            .insert(batch.batch_id.clone(), batch.clone());
        created.push(batch);
    }
    Ok(created)
}

/// Resolve a pending batch.
///
/// On a pass every member's integration gate passes and it moves to
/// `needs_e2e`. On a failure each member's attempt count grows; members that
/// reach `max_integration_attempts` end in `integration_failed`, the rest
/// stay in `needs_integration` for re-batching.
pub fn record_integration_batch_result(
    doc: &mut GateDocument,
    policy: &GatePolicy,
    batch_id: &str,
    passed: bool,
    now: DateTime<Utc>,
) -> Result<IntegrationBatch> {
    let batch = doc.batch(batch_id)?;
    if !batch.is_pending() {
        return Err(QualityGateError::Precondition(format!(
            "batch {batch_id} already resolved as {:?}",
            batch.status
        )));
    }
    let members = batch.change_ids.clone();
    for id in &members {
        doc.change(id)?
            .require_status(ChangeStatus::NeedsIntegration, "resolve integration batch for")?;
    }

    for id in &members {
        let change = doc.change_mut(id)?;
        if passed {
            change.gates.integration = GateStatus::Passed;
            change.transition(ChangeStatus::NeedsE2e, now);
        } else {
            change.integration_attempts += 1;
            if change.integration_attempts >= policy.max_integration_attempts {
                let to = ChangeStatus::Failed(FailedStage::Integration);
                change.gates.integration = GateStatus::Failed;
                change.transition(to, now);
            } else {
                change.updated_at = now;
            }
        }
    }

    let batch = doc.batch_mut(batch_id)?;
    batch.status = if passed {
        BatchStatus::Passed
    } else {
        BatchStatus::Failed
    };
    batch.resolved_at = Some(now);
    Ok(batch.clone())
}
