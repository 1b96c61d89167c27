//! Document lifecycle workflow engine
//!
//! Governs how documents move between tenant-configured statuses:
//! - Status graph of allowed transitions with role gates, approval policies,
//!   and SLA budgets per edge
//! - Multi-party approval batches (all, or N-of-M quorum) that hold a
//!   transition until the aggregate outcome is reached
//! - Append-only workflow history ledger as the audit source of truth
//! - SLA evaluation on every committed transition (observational, never
//!   blocking)
//! - Pluggable persistence (`MemoryStore` built in, Postgres behind the
//!   `database` feature), directory, and notification seams
//!
//! The engine mutates documents only through its own commit step, inside one
//! store transaction per operation; notifications dispatch after commit.

pub mod approval;
pub mod definition;
pub mod directory;
pub mod document;
pub mod engine;
pub mod error;
pub mod graph;
pub mod history;
pub mod memory;
pub mod notify;
pub mod principal;
pub mod sla;
pub mod status;
pub mod store;

#[cfg(feature = "database")]
pub mod postgres;

pub use approval::{
    ApprovalBatch, ApprovalDecisionStatus, ApprovalOrchestrator, ApprovalRequest, ApprovalStats,
    BatchOutcome, Decision,
};
pub use definition::{GraphDefinition, GraphLoader, SeededGraph};
pub use directory::{Directory, StaticDirectory};
pub use document::Document;
pub use engine::{
    AssignToActor, AssigneePolicy, BatchProgress, DecisionResult, KeepAssignee, TransitionResult,
    WorkflowEngine,
};
pub use error::{WorkflowError, WorkflowResult};
pub use graph::StatusGraph;
pub use history::{committed_path, HistoryEntry, TransitionStage};
pub use memory::MemoryStore;
pub use notify::{DomainEvent, NoopNotifier, Notifier};
pub use principal::{AuthenticatedUser, Principal};
pub use sla::{SlaMonitor, SlaOutcome};
pub use status::{ApprovalPolicy, ApproverRule, Status, TransitionEdge};
pub use store::{StoreError, WorkflowStore, WorkflowTx};
