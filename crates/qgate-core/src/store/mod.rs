//! Persistence for the per-workspace gate document.
//!
//! The whole pipeline state lives in one JSON document with the top-level
//! keys `changes`, `residents`, `test_submissions` and `integration_tasks`.
//! Stores hand out the document inside a transaction: the closure mutates an
//! in-memory copy and the store persists it only when the closure succeeds.

pub mod fs;
pub mod memory;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{
    Change, IntegrationBatch, QualityGateError, Resident, Result, TestSubmission,
};

/// The persisted pipeline state of one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDocument {
    pub changes: BTreeMap<String, Change>,
    pub residents: BTreeMap<String, Resident>,
    pub test_submissions: BTreeMap<String, TestSubmission>,
    pub integration_tasks: BTreeMap<String, IntegrationBatch>,
}

impl GateDocument {
    pub fn change(&self, change_id: &str) -> Result<&Change> {
        self.changes
            .get(change_id)
            .ok_or_else(|| QualityGateError::ChangeNotFound(change_id.to_string()))
    }

    pub fn change_mut(&mut self, change_id: &str) -> Result<&mut Change> {
        self.changes
            .get_mut(change_id)
            .ok_or_else(|| QualityGateError::ChangeNotFound(change_id.to_string()))
    }

    pub fn resident(&self, resident_id: &str) -> Result<&Resident> {
        self.residents
            .get(resident_id)
            .ok_or_else(|| QualityGateError::ResidentNotFound(resident_id.to_string()))
    }

    pub fn test_submission(&self, test_id: &str) -> Result<&TestSubmission> {
        self.test_submissions
            .get(test_id)
            .ok_or_else(|| QualityGateError::TestNotFound(test_id.to_string()))
    }

    pub fn test_submission_mut(&mut self, test_id: &str) -> Result<&mut TestSubmission> {
        self.test_submissions
            .get_mut(test_id)
            .ok_or_else(|| QualityGateError::TestNotFound(test_id.to_string()))
    }

    pub fn batch(&self, batch_id: &str) -> Result<&IntegrationBatch> {
        self.integration_tasks
            .get(batch_id)
            .ok_or_else(|| QualityGateError::BatchNotFound(batch_id.to_string()))
    }

    pub fn batch_mut(&mut self, batch_id: &str) -> Result<&mut IntegrationBatch> {
        self.integration_tasks
            .get_mut(batch_id)
            .ok_or_else(|| QualityGateError::BatchNotFound(batch_id.to_string()))
    }

    // Entities are never deleted, so `len + 1` is a fresh sequence number.

    pub fn next_change_seq(&self) -> u64 {
        self.changes.len() as u64 + 1
    }

    pub fn next_test_seq(&self) -> u64 {
        self.test_submissions.len() as u64 + 1
    }

    pub fn next_batch_seq(&self) -> u64 {
        self.integration_tasks.len() as u64 + 1
    }

    /// Changes in creation order.
    pub fn changes_in_order(&self) -> Vec<&Change> {
        let mut changes: Vec<&Change> = self.changes.values().collect();
        changes.sort_by_key(|c| c.seq);
        changes
    }

    /// Batches in creation order.
    pub fn batches_in_order(&self) -> Vec<&IntegrationBatch> {
        let mut batches: Vec<&IntegrationBatch> = self.integration_tasks.values().collect();
        batches.sort_by_key(|b| b.seq);
        batches
    }

    /// Pretty JSON as written to disk.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a persisted document, reporting failures against `path`.
    pub fn from_json_slice(bytes: &[u8], path: &Path) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| QualityGateError::CorruptState {
            path: path.to_path_buf(),
            source,
        })
    }

    /// SHA-256 hex of the serialized document.
    pub fn digest(&self) -> Result<String> {
        Ok(digest_bytes(&self.to_json_bytes()?))
    }
}

/// SHA-256 hex digest of serialized document bytes.
pub(crate) fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Transactional access to a [`GateDocument`].
pub trait DocumentStore: Send + Sync {
    /// Read-only snapshot of the current document.
    fn load(&self) -> Result<GateDocument>;

    /// Run `op` against the current document under the store's exclusion
    /// boundary. The document is persisted only if `op` returns `Ok`; an
    /// `Err` from `transact` means nothing was persisted.
    fn transact<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut GateDocument) -> Result<T>;
}
