//! Workflow Engine
//!
//! The façade callers use. `attempt_transition` validates the requested move
//! against the status graph, then either commits it directly or opens an
//! approval batch; `record_decision` drives a batch toward its outcome and
//! commits the parent transition once the quorum is reached. Every commit is
//! one store transaction: document update, ledger append, and event outbox
//! apply together or not at all. Notifications go out only after commit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::approval::{
    ApprovalOrchestrator, ApprovalRequest, ApprovalStats, BatchDisposition, Decision,
};
use crate::directory::Directory;
use crate::document::Document;
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::StatusGraph;
use crate::history::{HistoryEntry, TransitionStage};
use crate::notify::{DomainEvent, Notifier};
use crate::principal::Principal;
use crate::sla::{SlaMonitor, SlaOutcome};
use crate::status::{Status, TransitionEdge};
use crate::store::{StoreError, WorkflowStore, WorkflowTx};

/// Pluggable rule for who is responsible for the document after a commit.
pub trait AssigneePolicy: Send + Sync {
    /// The document's new `assigned_to` value.
    fn next_assignee(
        &self,
        document: &Document,
        edge: &TransitionEdge,
        actor: Uuid,
    ) -> Option<Uuid>;
}

/// Default rule: assignment is untouched by transitions.
pub struct KeepAssignee;

impl AssigneePolicy for KeepAssignee {
    fn next_assignee(
        &self,
        document: &Document,
        _edge: &TransitionEdge,
        _actor: Uuid,
    ) -> Option<Uuid> {
        document.assigned_to
    }
}

/// Hand the document to whoever performed the transition.
pub struct AssignToActor;

impl AssigneePolicy for AssignToActor {
    fn next_assignee(
        &self,
        _document: &Document,
        _edge: &TransitionEdge,
        actor: Uuid,
    ) -> Option<Uuid> {
        Some(actor)
    }
}

/// Outcome of an accepted transition attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TransitionResult {
    /// The document moved.
    Committed {
        document: Document,
        entry_id: Uuid,
        sla: SlaOutcome,
    },
    /// The edge is approval-gated; the document stays put until the batch
    /// resolves.
    Pending { batch_id: Uuid, entry_id: Uuid },
}

/// Outcome of an accepted approval decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionResult {
    pub request_id: Uuid,
    pub batch_id: Uuid,
    pub progress: BatchProgress,
}

/// Where the batch stands after the decision.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "batch", rename_all = "snake_case")]
pub enum BatchProgress {
    StillOpen {
        approved: u32,
        total: u32,
    },
    /// The quorum was reached and the guarded transition committed.
    Approved {
        document: Document,
        entry_id: Uuid,
        sla: SlaOutcome,
    },
    Rejected,
}

/// The workflow façade.
pub struct WorkflowEngine {
    store: Arc<dyn WorkflowStore>,
    graph: StatusGraph,
    approvals: ApprovalOrchestrator,
    sla: SlaMonitor,
    notifier: Arc<dyn Notifier>,
    assignee_policy: Arc<dyn AssigneePolicy>,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            graph: StatusGraph::new(store.clone()),
            approvals: ApprovalOrchestrator::new(directory),
            sla: SlaMonitor,
            notifier,
            assignee_policy: Arc::new(KeepAssignee),
            store,
        }
    }

    pub fn with_assignee_policy(mut self, policy: Arc<dyn AssigneePolicy>) -> Self {
        self.assignee_policy = policy;
        self
    }

    /// Attempt to move a document to a target status on behalf of a
    /// principal. Validation performs no writes; a failed attempt leaves the
    /// document and its ledger untouched.
    pub async fn attempt_transition(
        &self,
        document_id: Uuid,
        target_status_id: Uuid,
        principal: &dyn Principal,
        comment: Option<&str>,
    ) -> WorkflowResult<TransitionResult> {
        let document = self
            .store
            .document(document_id)
            .await?
            .ok_or(WorkflowError::DocumentNotFound(document_id))?;
        let current = self
            .graph
            .status(document.company_id, document.status_id)
            .await?
            .ok_or(WorkflowError::StatusNotFound(document.status_id))?;

        if current.is_final {
            return Err(WorkflowError::InvalidTransition {
                from: document.status_id,
                to: target_status_id,
            });
        }

        // The target must be a live status of the document's own tenant.
        let target = match self
            .graph
            .status(document.company_id, target_status_id)
            .await?
        {
            Some(status) if status.active => status,
            _ => {
                return Err(WorkflowError::InvalidTransition {
                    from: document.status_id,
                    to: target_status_id,
                })
            }
        };

        let edge = self
            .graph
            .find_edge(document.company_id, document.status_id, target_status_id)
            .await?
            .ok_or(WorkflowError::InvalidTransition {
                from: document.status_id,
                to: target_status_id,
            })?;

        if !StatusGraph::is_authorized(&edge, principal) {
            debug!(
                document_id = %document_id,
                principal = %principal.id(),
                "transition denied: roles do not intersect edge's allowed set"
            );
            return Err(WorkflowError::Unauthorized {
                required: edge.allowed_roles.clone(),
            });
        }

        let since = self.entered_current_status_at(&document).await?;
        let now = Utc::now();

        if !edge.approval_policy.requires_approval() {
            let mut tx = self.store.begin().await?;
            let (updated, entry_id) = self
                .commit_transition(
                    tx.as_mut(),
                    &document,
                    &edge,
                    &target,
                    principal.id(),
                    comment,
                    None,
                    now,
                )
                .await?;
            let events = tx.commit().await?;
            self.dispatch(events).await;

            let sla = self.sla.evaluate(since, edge.sla_hours, now);
            self.report_sla(&document, &edge, sla);
            info!(
                document_id = %document_id,
                from = %document.status_id,
                to = %target_status_id,
                "transition committed"
            );
            return Ok(TransitionResult::Committed {
                document: updated,
                entry_id,
                sla,
            });
        }

        // Approval-gated: resolve the approver set before writing anything.
        let approvers = self.approvals.resolve_approvers(&edge, &document).await?;
        if approvers.is_empty() {
            return Err(WorkflowError::InvalidApprovalConfiguration {
                edge_id: edge.edge_id,
            });
        }

        let mut tx = self.store.begin().await?;
        // The document must still sit where validation saw it.
        let fresh = tx
            .document(document_id)
            .await?
            .ok_or(WorkflowError::DocumentNotFound(document_id))?;
        if fresh.status_id != document.status_id {
            return Err(WorkflowError::ConcurrentModification);
        }

        let batch_id = Uuid::new_v4();
        let entry = HistoryEntry::pending(
            document_id,
            document.status_id,
            target_status_id,
            principal.id(),
            comment.map(str::to_string),
            batch_id,
            now,
        );
        let entry_id = entry.entry_id;
        tx.append_history(entry).await?;
        self.approvals
            .create_batch(
                tx.as_mut(),
                &document,
                &edge,
                batch_id,
                entry_id,
                &approvers,
                now,
            )
            .await?;
        let events = tx.commit().await?;
        self.dispatch(events).await;

        info!(
            document_id = %document_id,
            batch_id = %batch_id,
            approvers = approvers.len(),
            "transition pending approval"
        );
        Ok(TransitionResult::Pending { batch_id, entry_id })
    }

    /// Record one approver's decision. When the decision satisfies the
    /// batch's policy, the guarded transition commits in the same unit of
    /// work; when it rejects, the batch closes and the document stays put.
    pub async fn record_decision(
        &self,
        request_id: Uuid,
        principal: &dyn Principal,
        decision: Decision,
        comment: Option<&str>,
    ) -> WorkflowResult<DecisionResult> {
        let request = self
            .store
            .approval_request(request_id)
            .await?
            .ok_or(WorkflowError::RequestNotFound(request_id))?;
        let batch = self
            .store
            .approval_batch(request.batch_id)
            .await?
            .ok_or(WorkflowError::BatchNotFound(request.batch_id))?;
        let document = self
            .store
            .document(request.document_id)
            .await?
            .ok_or(WorkflowError::DocumentNotFound(request.document_id))?;

        let history = self.store.history(request.document_id).await?;
        let pending_entry = history
            .iter()
            .find(|e| e.entry_id == batch.history_entry_id)
            .cloned()
            .ok_or(WorkflowError::Store(StoreError::NotFound(
                "pending ledger entry",
            )))?;
        let from_status_id = pending_entry.from_status_id.unwrap_or(document.status_id);
        let since = history
            .iter()
            .filter(|e| e.stage == TransitionStage::Committed)
            .max_by_key(|e| e.seq)
            .map(|e| e.created_at)
            .unwrap_or(document.created_at);

        // Read the edge and target up front; every write below runs against
        // the one transaction and must not touch the plain-read surface.
        let edge = self
            .store
            .find_edge(batch.company_id, from_status_id, pending_entry.to_status_id)
            .await?;
        let target = self
            .store
            .status(batch.company_id, pending_entry.to_status_id)
            .await?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let (batch, disposition) = self
            .approvals
            .apply_decision(
                tx.as_mut(),
                request_id,
                principal.id(),
                decision,
                comment.map(str::to_string),
                now,
            )
            .await?;

        let progress = match disposition {
            BatchDisposition::StillOpen { approved, total } => {
                let events = tx.commit().await?;
                self.dispatch(events).await;
                debug!(
                    batch_id = %batch.batch_id,
                    approved,
                    total,
                    "approval recorded, batch still open"
                );
                BatchProgress::StillOpen { approved, total }
            }

            BatchDisposition::Rejected => {
                let entry = HistoryEntry::rejected(
                    document.document_id,
                    from_status_id,
                    pending_entry.to_status_id,
                    principal.id(),
                    comment.map(str::to_string),
                    batch.batch_id,
                    now,
                );
                tx.append_history(entry).await?;
                tx.queue_event(DomainEvent::TransitionRejected {
                    recipient: pending_entry.performed_by,
                    document_id: document.document_id,
                    batch_id: batch.batch_id,
                });
                let events = tx.commit().await?;
                self.dispatch(events).await;
                info!(
                    document_id = %document.document_id,
                    batch_id = %batch.batch_id,
                    "guarded transition rejected"
                );
                BatchProgress::Rejected
            }

            BatchDisposition::Satisfied => {
                // The quorum is in; commit the parent transition now, in the
                // same unit of work that resolved the batch.
                let edge = edge.ok_or(WorkflowError::InvalidTransition {
                    from: from_status_id,
                    to: pending_entry.to_status_id,
                })?;
                let target =
                    target.ok_or(WorkflowError::StatusNotFound(pending_entry.to_status_id))?;

                let (updated, entry_id) = self
                    .commit_transition(
                        tx.as_mut(),
                        &document,
                        &edge,
                        &target,
                        pending_entry.performed_by,
                        comment,
                        Some(batch.batch_id),
                        now,
                    )
                    .await?;
                let events = tx.commit().await?;
                self.dispatch(events).await;

                let sla = self.sla.evaluate(since, edge.sla_hours, now);
                self.report_sla(&document, &edge, sla);
                info!(
                    document_id = %document.document_id,
                    batch_id = %batch.batch_id,
                    "approval quorum reached, transition committed"
                );
                BatchProgress::Approved {
                    document: updated,
                    entry_id,
                    sla,
                }
            }
        };

        Ok(DecisionResult {
            request_id,
            batch_id: batch.batch_id,
            progress,
        })
    }

    /// Target statuses the principal can legally move the document to.
    pub async fn get_available_transitions(
        &self,
        document_id: Uuid,
        principal: &dyn Principal,
    ) -> WorkflowResult<Vec<Status>> {
        let document = self
            .store
            .document(document_id)
            .await?
            .ok_or(WorkflowError::DocumentNotFound(document_id))?;
        let current = self
            .graph
            .status(document.company_id, document.status_id)
            .await?
            .ok_or(WorkflowError::StatusNotFound(document.status_id))?;
        if current.is_final {
            return Ok(Vec::new());
        }

        let mut targets = Vec::new();
        for edge in self
            .graph
            .outgoing_edges(document.company_id, document.status_id)
            .await?
        {
            if !StatusGraph::is_authorized(&edge, principal) {
                continue;
            }
            if let Some(status) = self
                .graph
                .status(document.company_id, edge.to_status_id)
                .await?
            {
                if status.active {
                    targets.push(status);
                }
            }
        }
        targets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(targets)
    }

    /// Approval request counts for a document, across all of its batches.
    pub async fn approval_stats(&self, document_id: Uuid) -> WorkflowResult<ApprovalStats> {
        Ok(self.store.approval_stats(document_id).await?)
    }

    /// Requests still awaiting the named principal's decision.
    pub async fn pending_approvals_for(
        &self,
        approver_id: Uuid,
    ) -> WorkflowResult<Vec<ApprovalRequest>> {
        Ok(self.store.pending_approvals_for(approver_id).await?)
    }

    /// The document's full ledger, in timeline order.
    pub async fn timeline(&self, document_id: Uuid) -> WorkflowResult<Vec<HistoryEntry>> {
        Ok(self.store.history(document_id).await?)
    }

    // ── Internal ──

    /// When the document entered its current status: the latest committed
    /// ledger entry, or creation time for a document that has not moved yet.
    async fn entered_current_status_at(
        &self,
        document: &Document,
    ) -> WorkflowResult<DateTime<Utc>> {
        let history = self.store.history(document.document_id).await?;
        Ok(history
            .iter()
            .filter(|e| e.stage == TransitionStage::Committed)
            .max_by_key(|e| e.seq)
            .map(|e| e.created_at)
            .unwrap_or(document.created_at))
    }

    /// The commit step: conditional document update, committed ledger entry,
    /// and notification events, all against the open transaction.
    #[allow(clippy::too_many_arguments)]
    async fn commit_transition(
        &self,
        tx: &mut dyn WorkflowTx,
        document: &Document,
        edge: &TransitionEdge,
        target: &Status,
        actor: Uuid,
        comment: Option<&str>,
        approval_batch_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> WorkflowResult<(Document, Uuid)> {
        let assigned_to = self.assignee_policy.next_assignee(document, edge, actor);
        let completed_at = if target.is_final {
            Some(now)
        } else {
            document.completed_at
        };

        let updated = tx
            .update_document_status(
                document.document_id,
                edge.from_status_id,
                target.status_id,
                assigned_to,
                completed_at,
            )
            .await?;
        if !updated {
            // Someone else moved the document first.
            return Err(WorkflowError::ConcurrentModification);
        }

        let entry = HistoryEntry::committed(
            document.document_id,
            edge.from_status_id,
            target.status_id,
            actor,
            comment.map(str::to_string),
            approval_batch_id,
            now,
        );
        let entry_id = entry.entry_id;
        tx.append_history(entry).await?;

        tx.queue_event(DomainEvent::TransitionCommitted {
            recipient: document.created_by,
            document_id: document.document_id,
            from_status_id: edge.from_status_id,
            to_status_id: target.status_id,
        });
        if let Some(assignee) = assigned_to {
            if assignee != document.created_by {
                tx.queue_event(DomainEvent::TransitionCommitted {
                    recipient: assignee,
                    document_id: document.document_id,
                    from_status_id: edge.from_status_id,
                    to_status_id: target.status_id,
                });
            }
        }

        let mut updated_document = document.clone();
        updated_document.status_id = target.status_id;
        updated_document.assigned_to = assigned_to;
        updated_document.completed_at = completed_at;
        Ok((updated_document, entry_id))
    }

    async fn dispatch(&self, events: Vec<DomainEvent>) {
        for event in &events {
            self.notifier.notify(event).await;
        }
    }

    fn report_sla(&self, document: &Document, edge: &TransitionEdge, sla: SlaOutcome) {
        if let SlaOutcome::Overdue { exceeded_hours } = sla {
            warn!(
                document_id = %document.document_id,
                edge_id = %edge.edge_id,
                exceeded_hours,
                "transition committed past its SLA"
            );
        }
    }
}
