//! Persistence Seam
//!
//! The engine operates exclusively through these traits, enabling pluggable
//! backends (`MemoryStore` for tests and embedded use, Postgres for
//! production). `WorkflowStore` serves plain reads and opens transactions;
//! `WorkflowTx` is the explicit commit boundary: every write in a unit of
//! work goes through one transaction, `commit()` applies all of them, and
//! dropping the transaction without committing discards every write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::approval::{
    ApprovalBatch, ApprovalDecisionStatus, ApprovalRequest, ApprovalStats, BatchOutcome,
};
use crate::document::Document;
use crate::history::HistoryEntry;
use crate::notify::DomainEvent;
use crate::status::{Status, TransitionEdge};

/// Backend failure surfaced by a store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An optimistic or locked update found the row in a different state
    /// than the caller expected.
    #[error("conflicting concurrent update")]
    Conflict,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Read surface plus transaction factory.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    // ── Tenant configuration ──

    async fn status(&self, company_id: Uuid, status_id: Uuid)
        -> Result<Option<Status>, StoreError>;

    /// The single active edge for `(company, from, to)`, if defined.
    async fn find_edge(
        &self,
        company_id: Uuid,
        from_status_id: Uuid,
        to_status_id: Uuid,
    ) -> Result<Option<TransitionEdge>, StoreError>;

    async fn outgoing_edges(
        &self,
        company_id: Uuid,
        from_status_id: Uuid,
    ) -> Result<Vec<TransitionEdge>, StoreError>;

    async fn insert_status(&self, status: Status) -> Result<(), StoreError>;

    /// Inserting an active edge replaces any previously active edge for the
    /// same `(company, from, to)` triple.
    async fn insert_edge(&self, edge: TransitionEdge) -> Result<(), StoreError>;

    // ── Documents ──

    async fn insert_document(&self, document: Document) -> Result<(), StoreError>;

    async fn document(&self, document_id: Uuid) -> Result<Option<Document>, StoreError>;

    // ── Ledger and approvals (reads) ──

    /// All ledger entries for a document, in `seq` order.
    async fn history(&self, document_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError>;

    async fn approval_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<ApprovalRequest>, StoreError>;

    async fn approval_batch(&self, batch_id: Uuid) -> Result<Option<ApprovalBatch>, StoreError>;

    async fn batch_requests(&self, batch_id: Uuid) -> Result<Vec<ApprovalRequest>, StoreError>;

    async fn approval_stats(&self, document_id: Uuid) -> Result<ApprovalStats, StoreError>;

    /// Requests still awaiting the named approver's decision. Requests whose
    /// batch is already closed are excluded; no action on them is possible.
    async fn pending_approvals_for(
        &self,
        approver_id: Uuid,
    ) -> Result<Vec<ApprovalRequest>, StoreError>;

    // ── Transactions ──

    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError>;
}

/// One unit of work. All writes stage inside the transaction; `commit()`
/// applies them and returns the domain events queued along the way, so the
/// caller can dispatch notifications strictly after the state change is
/// durable. Dropping without commit rolls everything back and releases any
/// locks.
#[async_trait]
pub trait WorkflowTx: Send {
    async fn document(&mut self, document_id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Conditional update keyed on the status the caller validated against.
    /// Returns `false` (writing nothing) when the document is no longer in
    /// `expected_status`.
    async fn update_document_status(
        &mut self,
        document_id: Uuid,
        expected_status: Uuid,
        new_status: Uuid,
        assigned_to: Option<Uuid>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;

    /// Append a ledger entry; the store assigns and returns the entry's
    /// position in the document's timeline.
    async fn append_history(&mut self, entry: HistoryEntry) -> Result<u64, StoreError>;

    async fn insert_batch(&mut self, batch: ApprovalBatch) -> Result<(), StoreError>;

    async fn insert_request(&mut self, request: ApprovalRequest) -> Result<(), StoreError>;

    /// Load a batch with exclusive access for the rest of this transaction.
    /// Concurrent decisions in one batch serialize here, so the
    /// satisfied-check never runs against stale counts.
    async fn lock_batch(&mut self, batch_id: Uuid) -> Result<Option<ApprovalBatch>, StoreError>;

    async fn request(&mut self, request_id: Uuid) -> Result<Option<ApprovalRequest>, StoreError>;

    async fn batch_requests(&mut self, batch_id: Uuid)
        -> Result<Vec<ApprovalRequest>, StoreError>;

    /// Move a request out of `pending`. Once resolved the row is immutable.
    async fn resolve_request(
        &mut self,
        request_id: Uuid,
        status: ApprovalDecisionStatus,
        comment: Option<String>,
        responded_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn resolve_batch(
        &mut self,
        batch_id: Uuid,
        outcome: BatchOutcome,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Record a domain event in this unit of work; returned by `commit()`.
    fn queue_event(&mut self, event: DomainEvent);

    /// Apply every staged write. Returns the queued domain events.
    async fn commit(self: Box<Self>) -> Result<Vec<DomainEvent>, StoreError>;
}
