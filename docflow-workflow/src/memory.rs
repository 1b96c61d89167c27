//! In-Memory Store
//!
//! Single-process backend used by the test suite and embedded deployments.
//! A transaction takes the store's one lock and works on a snapshot of the
//! state; commit swaps the snapshot in, drop discards it. Transactions are
//! fully serialized, so every unit of work observes a consistent state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::approval::{
    ApprovalBatch, ApprovalDecisionStatus, ApprovalRequest, ApprovalStats, BatchOutcome,
};
use crate::document::Document;
use crate::history::HistoryEntry;
use crate::notify::DomainEvent;
use crate::status::{Status, TransitionEdge};
use crate::store::{StoreError, WorkflowStore, WorkflowTx};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    statuses: HashMap<Uuid, Status>,
    edges: Vec<TransitionEdge>,
    documents: HashMap<Uuid, Document>,
    history: HashMap<Uuid, Vec<HistoryEntry>>,
    batches: HashMap<Uuid, ApprovalBatch>,
    requests: HashMap<Uuid, ApprovalRequest>,
}

impl MemoryState {
    fn find_edge(
        &self,
        company_id: Uuid,
        from_status_id: Uuid,
        to_status_id: Uuid,
    ) -> Option<&TransitionEdge> {
        self.edges.iter().find(|e| {
            e.active
                && e.company_id == company_id
                && e.from_status_id == from_status_id
                && e.to_status_id == to_status_id
        })
    }
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn status(
        &self,
        company_id: Uuid,
        status_id: Uuid,
    ) -> Result<Option<Status>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .statuses
            .get(&status_id)
            .filter(|s| s.company_id == company_id)
            .cloned())
    }

    async fn find_edge(
        &self,
        company_id: Uuid,
        from_status_id: Uuid,
        to_status_id: Uuid,
    ) -> Result<Option<TransitionEdge>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.find_edge(company_id, from_status_id, to_status_id).cloned())
    }

    async fn outgoing_edges(
        &self,
        company_id: Uuid,
        from_status_id: Uuid,
    ) -> Result<Vec<TransitionEdge>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .edges
            .iter()
            .filter(|e| {
                e.active && e.company_id == company_id && e.from_status_id == from_status_id
            })
            .cloned()
            .collect())
    }

    async fn insert_status(&self, status: Status) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.statuses.insert(status.status_id, status);
        Ok(())
    }

    async fn insert_edge(&self, edge: TransitionEdge) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if edge.active {
            // Keep at most one active edge per (company, from, to).
            for existing in state.edges.iter_mut() {
                if existing.active
                    && existing.company_id == edge.company_id
                    && existing.from_status_id == edge.from_status_id
                    && existing.to_status_id == edge.to_status_id
                {
                    existing.active = false;
                }
            }
        }
        state.edges.push(edge);
        Ok(())
    }

    async fn insert_document(&self, document: Document) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.documents.insert(document.document_id, document);
        Ok(())
    }

    async fn document(&self, document_id: Uuid) -> Result<Option<Document>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.documents.get(&document_id).cloned())
    }

    async fn history(&self, document_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.history.get(&document_id).cloned().unwrap_or_default())
    }

    async fn approval_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<ApprovalRequest>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.requests.get(&request_id).cloned())
    }

    async fn approval_batch(&self, batch_id: Uuid) -> Result<Option<ApprovalBatch>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.batches.get(&batch_id).cloned())
    }

    async fn batch_requests(&self, batch_id: Uuid) -> Result<Vec<ApprovalRequest>, StoreError> {
        let state = self.state.lock().await;
        let mut requests: Vec<ApprovalRequest> = state
            .requests
            .values()
            .filter(|r| r.batch_id == batch_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn approval_stats(&self, document_id: Uuid) -> Result<ApprovalStats, StoreError> {
        let state = self.state.lock().await;
        let mut stats = ApprovalStats::default();
        for request in state.requests.values() {
            if request.document_id != document_id {
                continue;
            }
            stats.total += 1;
            match request.status {
                ApprovalDecisionStatus::Pending => stats.pending += 1,
                ApprovalDecisionStatus::Approved => stats.approved += 1,
                ApprovalDecisionStatus::Rejected => stats.rejected += 1,
            }
        }
        Ok(stats)
    }

    async fn pending_approvals_for(
        &self,
        approver_id: Uuid,
    ) -> Result<Vec<ApprovalRequest>, StoreError> {
        let state = self.state.lock().await;
        let mut requests: Vec<ApprovalRequest> = state
            .requests
            .values()
            .filter(|r| {
                r.approver_id == approver_id
                    && r.status == ApprovalDecisionStatus::Pending
                    && state
                        .batches
                        .get(&r.batch_id)
                        .map(|b| b.outcome == BatchOutcome::Open)
                        .unwrap_or(false)
            })
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let scratch = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            scratch,
            events: Vec::new(),
        }))
    }
}

/// Serialized unit of work over a state snapshot.
struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    scratch: MemoryState,
    events: Vec<DomainEvent>,
}

#[async_trait]
impl WorkflowTx for MemoryTx {
    async fn document(&mut self, document_id: Uuid) -> Result<Option<Document>, StoreError> {
        Ok(self.scratch.documents.get(&document_id).cloned())
    }

    async fn update_document_status(
        &mut self,
        document_id: Uuid,
        expected_status: Uuid,
        new_status: Uuid,
        assigned_to: Option<Uuid>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let document = self
            .scratch
            .documents
            .get_mut(&document_id)
            .ok_or(StoreError::NotFound("document"))?;
        if document.status_id != expected_status {
            return Ok(false);
        }
        document.status_id = new_status;
        document.assigned_to = assigned_to;
        document.completed_at = completed_at;
        Ok(true)
    }

    async fn append_history(&mut self, mut entry: HistoryEntry) -> Result<u64, StoreError> {
        let entries = self.scratch.history.entry(entry.document_id).or_default();
        let seq = entries.len() as u64 + 1;
        entry.seq = seq;
        entries.push(entry);
        Ok(seq)
    }

    async fn insert_batch(&mut self, batch: ApprovalBatch) -> Result<(), StoreError> {
        self.scratch.batches.insert(batch.batch_id, batch);
        Ok(())
    }

    async fn insert_request(&mut self, request: ApprovalRequest) -> Result<(), StoreError> {
        self.scratch.requests.insert(request.request_id, request);
        Ok(())
    }

    async fn lock_batch(&mut self, batch_id: Uuid) -> Result<Option<ApprovalBatch>, StoreError> {
        // The store lock is already exclusive for the whole transaction.
        Ok(self.scratch.batches.get(&batch_id).cloned())
    }

    async fn request(&mut self, request_id: Uuid) -> Result<Option<ApprovalRequest>, StoreError> {
        Ok(self.scratch.requests.get(&request_id).cloned())
    }

    async fn batch_requests(
        &mut self,
        batch_id: Uuid,
    ) -> Result<Vec<ApprovalRequest>, StoreError> {
        let mut requests: Vec<ApprovalRequest> = self
            .scratch
            .requests
            .values()
            .filter(|r| r.batch_id == batch_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn resolve_request(
        &mut self,
        request_id: Uuid,
        status: ApprovalDecisionStatus,
        comment: Option<String>,
        responded_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let request = self
            .scratch
            .requests
            .get_mut(&request_id)
            .ok_or(StoreError::NotFound("approval request"))?;
        if request.status != ApprovalDecisionStatus::Pending {
            return Err(StoreError::Conflict);
        }
        request.status = status;
        request.comment = comment;
        request.responded_at = Some(responded_at);
        Ok(())
    }

    async fn resolve_batch(
        &mut self,
        batch_id: Uuid,
        outcome: BatchOutcome,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let batch = self
            .scratch
            .batches
            .get_mut(&batch_id)
            .ok_or(StoreError::NotFound("approval batch"))?;
        if batch.outcome != BatchOutcome::Open {
            return Err(StoreError::Conflict);
        }
        batch.outcome = outcome;
        batch.resolved_at = Some(resolved_at);
        Ok(())
    }

    fn queue_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    async fn commit(self: Box<Self>) -> Result<Vec<DomainEvent>, StoreError> {
        let MemoryTx {
            mut guard,
            scratch,
            events,
        } = *self;
        *guard = scratch;
        Ok(events)
    }
}
