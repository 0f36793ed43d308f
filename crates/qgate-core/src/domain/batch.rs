//! Integration batches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolution of an integration batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Pending,
    Passed,
    Failed,
}

/// A bounded group of changes integration-tested together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationBatch {
    pub batch_id: String,
    pub seq: u64,
    /// Member change ids in creation order.
    pub change_ids: Vec<String>,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl IntegrationBatch {
    pub fn new(seq: u64, change_ids: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            seq,
            change_ids,
            status: BatchStatus::Pending,
            created_at: now,
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == BatchStatus::Pending
    }

    pub fn contains(&self, change_id: &str) -> bool {
        self.change_ids.iter().any(|id| id == change_id)
    }
}
