//! Per-workspace façade over the gate subsystems.
//!
//! Each public operation is one store transaction: load, validate, mutate,
//! save. The store's exclusion boundary makes every read-modify-write atomic,
//! which gives QA claims a single winner and batch membership exactly-once
//! semantics under concurrent callers. Lifecycle events are logged only
//! once the transaction has committed.

use std::path::Path;

use chrono::Utc;

use crate::batcher;
use crate::claim;
use crate::config::{GateConfig, GatePolicy};
use crate::domain::{
    Change, ChangeStatus, IntegrationBatch, Resident, Result, TestSubmission, TestType, Vote,
};
use crate::e2e;
use crate::obs::{self, ChangeSpan, GateEvent};
use crate::residents;
use crate::store::fs::FsDocumentStore;
use crate::store::memory::MemoryDocumentStore;
use crate::store::{DocumentStore, GateDocument};
use crate::test_gate;
use crate::voting;

/// Quality-gate pipeline for one workspace.
pub struct QualityGateManager<S = FsDocumentStore> {
    store: S,
    policy: GatePolicy,
}

impl QualityGateManager<FsDocumentStore> {
    /// Open the workspace document at `state_path` with the default policy.
    pub fn open(state_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_store(
            FsDocumentStore::new(state_path)?,
            GatePolicy::default(),
        ))
    }

    pub fn from_config(config: &GateConfig) -> Result<Self> {
        Ok(Self::with_store(
            FsDocumentStore::new(&config.state_path)?,
            config.policy.clone(),
        ))
    }
}

impl QualityGateManager<MemoryDocumentStore> {
    pub fn in_memory(policy: GatePolicy) -> Self {
        Self::with_store(MemoryDocumentStore::new(), policy)
    }
}

impl<S> QualityGateManager<S>
where
    S: DocumentStore,
{
    pub fn with_store(store: S, policy: GatePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn run<T, F>(&self, operation: &'static str, op: F) -> Result<T>
    where
        F: FnOnce(&mut GateDocument, &GatePolicy, &mut Vec<GateEvent>) -> Result<T>,
    {
        let policy = &self.policy;
        let mut events = Vec::new();
        let result = self.store.transact(|doc| op(doc, policy, &mut events));
        match &result {
            Ok(_) => events.iter().for_each(GateEvent::emit),
            Err(e) => obs::emit_operation_rejected(operation, e),
        }
        result
    }

    // -- Voting ----------------------------------------------------------

    /// Create a change awaiting its blind vote. Returns the new change id.
    pub fn submit_change_for_vote(
        &self,
        title: &str,
        description: &str,
        author_id: &str,
    ) -> Result<String> {
        self.run("submit_change_for_vote", |doc, _, events| {
            let change =
                voting::submit_change_for_vote(doc, title, description, author_id, Utc::now())?;
            events.push(GateEvent::ChangeSubmitted {
                change_id: change.change_id.clone(),
                author_id: change.author_id,
            });
            Ok(change.change_id)
        })
    }

    pub fn record_change_vote(&self, change_id: &str, vote: Vote) -> Result<Change> {
        let _span = ChangeSpan::enter(change_id);
        self.run("record_change_vote", |doc, _, events| {
            let now = Utc::now();
            let change = voting::record_change_vote(doc, change_id, vote, now)?;
            events.extend(GateEvent::transition_at(&change, now));
            Ok(change)
        })
    }

    // -- Residents -------------------------------------------------------

    pub fn register_resident<I, T>(
        &self,
        resident_id: &str,
        name: &str,
        specializations: I,
        focus_statement: Option<String>,
    ) -> Result<Resident>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.run("register_resident", |doc, _, events| {
            let resident = residents::register_resident(
                doc,
                resident_id,
                name,
                specializations,
                focus_statement,
                Utc::now(),
            )?;
            events.push(GateEvent::ResidentRegistered {
                resident_id: resident.resident_id.clone(),
                capabilities: resident.specializations.len(),
            });
            Ok(resident)
        })
    }

    // -- QA claim --------------------------------------------------------

    pub fn claim_qa(&self, change_id: &str, resident_id: &str) -> Result<Change> {
        let _span = ChangeSpan::enter(change_id);
        self.run("claim_qa", |doc, _, events| {
            let now = Utc::now();
            let change = claim::claim_qa(doc, change_id, resident_id, now)?;
            events.push(GateEvent::QaClaimed {
                change_id: change_id.to_string(),
                resident_id: resident_id.to_string(),
            });
            events.extend(GateEvent::transition_at(&change, now));
            Ok(change)
        })
    }

    // -- Test gate -------------------------------------------------------

    /// Propose a test for a claimed change. Returns the new test id.
    pub fn submit_test_for_vote(
        &self,
        change_id: &str,
        resident_id: &str,
        test_type: TestType,
    ) -> Result<String> {
        let _span = ChangeSpan::enter(change_id);
        self.run("submit_test_for_vote", |doc, policy, events| {
            let test = test_gate::submit_test_for_vote(
                doc,
                policy,
                change_id,
                resident_id,
                test_type,
                Utc::now(),
            )?;
            events.push(GateEvent::TestSubmitted {
                test_id: test.test_id.clone(),
                change_id: change_id.to_string(),
                test_type,
            });
            Ok(test.test_id)
        })
    }

    pub fn record_test_vote(&self, test_id: &str, vote: Vote) -> Result<TestSubmission> {
        self.run("record_test_vote", |doc, _, events| {
            let test = test_gate::record_test_vote(doc, test_id, vote)?;
            events.push(GateEvent::TestVoted {
                test_id: test.test_id.clone(),
                vote: test.vote,
            });
            Ok(test)
        })
    }

    pub fn record_test_result(
        &self,
        change_id: &str,
        test_type: TestType,
        passed: bool,
    ) -> Result<Change> {
        let _span = ChangeSpan::enter(change_id);
        self.run("record_test_result", |doc, policy, events| {
            let now = Utc::now();
            let change =
                test_gate::record_test_result(doc, policy, change_id, test_type, passed, now)?;
            events.extend(GateEvent::transition_at(&change, now));
            Ok(change)
        })
    }

    // -- Integration -----------------------------------------------------

    pub fn create_integration_batches(
        &self,
        max_batch_size: usize,
    ) -> Result<Vec<IntegrationBatch>> {
        self.run("create_integration_batches", |doc, _, events| {
            let batches = batcher::create_integration_batches(doc, max_batch_size, Utc::now())?;
            events.extend(batches.iter().map(|b| GateEvent::BatchCreated {
                batch_id: b.batch_id.clone(),
                members: b.change_ids.len(),
            }));
            Ok(batches)
        })
    }

    /// Batch using the policy's `default_max_batch_size`.
    pub fn create_default_integration_batches(&self) -> Result<Vec<IntegrationBatch>> {
        self.create_integration_batches(self.policy.default_max_batch_size)
    }

    pub fn record_integration_batch_result(
        &self,
        batch_id: &str,
        passed: bool,
    ) -> Result<IntegrationBatch> {
        self.run("record_integration_batch_result", |doc, policy, events| {
            let now = Utc::now();
            let batch =
                batcher::record_integration_batch_result(doc, policy, batch_id, passed, now)?;
            for id in &batch.change_ids {
                events.extend(GateEvent::transition_at(doc.change(id)?, now));
            }
            events.push(GateEvent::BatchResolved {
                batch_id: batch.batch_id.clone(),
                passed,
                members: batch.change_ids.len(),
            });
            Ok(batch)
        })
    }

    // -- E2E -------------------------------------------------------------

    pub fn record_e2e_result(&self, change_id: &str, passed: bool) -> Result<Change> {
        let _span = ChangeSpan::enter(change_id);
        self.run("record_e2e_result", |doc, policy, events| {
            let now = Utc::now();
            let change = e2e::record_e2e_result(doc, policy, change_id, passed, now)?;
            events.extend(GateEvent::transition_at(&change, now));
            Ok(change)
        })
    }

    // -- Read-only queries -----------------------------------------------

    /// Snapshot of the whole persisted document.
    pub fn load_state(&self) -> Result<GateDocument> {
        self.store.load()
    }

    pub fn get_change(&self, change_id: &str) -> Result<Change> {
        self.store.load()?.change(change_id).cloned()
    }

    /// Changes in creation order, optionally filtered by status.
    pub fn list_changes(&self, status: Option<ChangeStatus>) -> Result<Vec<Change>> {
        let doc = self.store.load()?;
        Ok(doc
            .changes_in_order()
            .into_iter()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect())
    }

    /// Changes that have cleared every gate.
    pub fn ready_for_merge(&self) -> Result<Vec<Change>> {
        self.list_changes(Some(ChangeStatus::ReadyForMerge))
    }

    pub fn get_resident(&self, resident_id: &str) -> Result<Resident> {
        self.store.load()?.resident(resident_id).cloned()
    }

    pub fn get_test_submission(&self, test_id: &str) -> Result<TestSubmission> {
        self.store.load()?.test_submission(test_id).cloned()
    }

    /// Test submissions for a change in submission order.
    pub fn tests_for_change(&self, change_id: &str) -> Result<Vec<TestSubmission>> {
        let doc = self.store.load()?;
        doc.change(change_id)?;
        let mut tests: Vec<TestSubmission> = doc
            .test_submissions
            .values()
            .filter(|t| t.change_id == change_id)
            .cloned()
            .collect();
        tests.sort_by_key(|t| t.seq);
        Ok(tests)
    }

    pub fn get_batch(&self, batch_id: &str) -> Result<IntegrationBatch> {
        self.store.load()?.batch(batch_id).cloned()
    }

    /// Unresolved batches in creation order.
    pub fn pending_batches(&self) -> Result<Vec<IntegrationBatch>> {
        let doc = self.store.load()?;
        Ok(doc
            .batches_in_order()
            .into_iter()
            .filter(|b| b.is_pending())
            .cloned()
            .collect())
    }
}
