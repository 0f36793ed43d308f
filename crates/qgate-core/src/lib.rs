//! QGate Core Library
//!
//! Persistent quality-gate pipeline that promotes a proposed change from
//! submission to merge-readiness through role-gated checkpoints:
//! blind vote, QA claim, unit gate, integration batches and the e2e gate.
//!
//! The [`QualityGateManager`] façade is the entry point. It is instantiated
//! per workspace with an explicit state path, and every operation runs as a
//! single locked load -> mutate -> save transaction.

pub mod batcher;
pub mod claim;
pub mod config;
pub mod domain;
pub mod e2e;
pub mod manager;
pub mod obs;
pub mod residents;
pub mod store;
pub mod telemetry;
pub mod test_gate;
pub mod voting;

pub use config::{GateConfig, GatePolicy, DEFAULT_STATE_PATH};
pub use domain::{
    BatchStatus, BlindVote, Change, ChangeStatus, FailedStage, GateStatus, Gates,
    IntegrationBatch, QaAssignment, QualityGateError, Resident, Result, StatusTransition,
    TestSubmission, TestType, Vote, VoteStatus, QA_CAPABILITY, REVIEW_CAPABILITY,
};
pub use manager::QualityGateManager;
pub use obs::{ChangeSpan, GateEvent};
pub use store::fs::FsDocumentStore;
pub use store::memory::MemoryDocumentStore;
pub use store::{DocumentStore, GateDocument};
pub use telemetry::init_tracing;

/// QGate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
