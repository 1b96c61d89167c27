//! Approval Batches and Orchestration
//!
//! When an edge requires sign-off, a batch of approval requests is created
//! (one per required approver) and the document stays put until the batch
//! resolves. The orchestrator owns the whole approval lifecycle: resolving
//! who must approve, creating the batch, recording individual decisions, and
//! deciding when the aggregate outcome is reached. Requests are immutable
//! once they leave `pending`; the batch row is the single record the quorum
//! check serializes on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::directory::Directory;
use crate::document::Document;
use crate::error::{WorkflowError, WorkflowResult};
use crate::notify::DomainEvent;
use crate::status::{ApprovalPolicy, ApproverRule, TransitionEdge};
use crate::store::WorkflowTx;

/// Decision submitted by an approver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// State of one approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecisionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Aggregate state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOutcome {
    Open,
    Approved,
    Rejected,
}

/// One approver's slice of a guarded transition attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub request_id: Uuid,
    pub batch_id: Uuid,
    pub document_id: Uuid,
    pub edge_id: Uuid,
    /// The `pending` ledger entry this request belongs to.
    pub history_entry_id: Uuid,
    pub approver_id: Uuid,
    pub status: ApprovalDecisionStatus,
    pub comment: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The set of requests created together for one transition attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalBatch {
    pub batch_id: Uuid,
    pub company_id: Uuid,
    pub document_id: Uuid,
    pub edge_id: Uuid,
    /// The `pending` ledger entry opened with this batch.
    pub history_entry_id: Uuid,
    pub policy: ApprovalPolicy,
    pub outcome: BatchOutcome,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Request counts for one document, across all of its batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStats {
    pub total: u32,
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
}

/// Where a batch stands after a decision is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDisposition {
    /// More approvals are still needed.
    StillOpen { approved: u32, total: u32 },
    /// The policy is satisfied; the guarded transition may commit.
    Satisfied,
    /// A rejection closed the batch; the document does not move.
    Rejected,
}

/// Resolves approvers and drives batches through their lifecycle.
pub struct ApprovalOrchestrator {
    directory: Arc<dyn Directory>,
}

impl ApprovalOrchestrator {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Evaluate the edge's approver rules against the directory and merge
    /// the results. The document's creator never approves their own
    /// transition; duplicates collapse, first occurrence wins the position.
    pub async fn resolve_approvers(
        &self,
        edge: &TransitionEdge,
        document: &Document,
    ) -> WorkflowResult<Vec<Uuid>> {
        let mut resolved: Vec<Uuid> = Vec::new();

        for rule in &edge.approver_rules {
            match rule {
                ApproverRule::Explicit { users } => resolved.extend(users.iter().copied()),
                ApproverRule::ByRole { role } => {
                    let members = self
                        .directory
                        .users_with_role(edge.company_id, role)
                        .await?;
                    resolved.extend(members);
                }
                ApproverRule::DepartmentHead => {
                    if let Some(head) = self
                        .directory
                        .department_head(edge.company_id, document)
                        .await?
                    {
                        resolved.push(head);
                    }
                }
                ApproverRule::BranchManager => {
                    if let Some(manager) = self
                        .directory
                        .branch_manager(edge.company_id, document)
                        .await?
                    {
                        resolved.push(manager);
                    }
                }
            }
        }

        resolved.retain(|id| *id != document.created_by);

        let mut seen = HashSet::new();
        resolved.retain(|id| seen.insert(*id));

        Ok(resolved)
    }

    /// Create the batch row plus one `pending` request per approver inside
    /// the open transaction, and queue one notification per approver.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn create_batch(
        &self,
        tx: &mut dyn WorkflowTx,
        document: &Document,
        edge: &TransitionEdge,
        batch_id: Uuid,
        history_entry_id: Uuid,
        approvers: &[Uuid],
        now: DateTime<Utc>,
    ) -> WorkflowResult<ApprovalBatch> {
        let batch = ApprovalBatch {
            batch_id,
            company_id: edge.company_id,
            document_id: document.document_id,
            edge_id: edge.edge_id,
            history_entry_id,
            policy: edge.approval_policy,
            outcome: BatchOutcome::Open,
            created_at: now,
            resolved_at: None,
        };
        tx.insert_batch(batch.clone()).await?;

        for approver_id in approvers {
            let request = ApprovalRequest {
                request_id: Uuid::new_v4(),
                batch_id: batch.batch_id,
                document_id: document.document_id,
                edge_id: edge.edge_id,
                history_entry_id,
                approver_id: *approver_id,
                status: ApprovalDecisionStatus::Pending,
                comment: None,
                responded_at: None,
                created_at: now,
            };
            tx.queue_event(DomainEvent::ApprovalRequested {
                recipient: *approver_id,
                document_id: document.document_id,
                batch_id: batch.batch_id,
                request_id: request.request_id,
            });
            tx.insert_request(request).await?;
        }

        Ok(batch)
    }

    /// Record one approver's decision against the locked batch and report
    /// where the batch stands. Enforces that the actor is the named
    /// approver, that the request is still pending, and that the batch is
    /// still open. Rejection closes the batch immediately; sibling requests
    /// stay `pending` but become moot.
    pub(crate) async fn apply_decision(
        &self,
        tx: &mut dyn WorkflowTx,
        request_id: Uuid,
        actor: Uuid,
        decision: Decision,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> WorkflowResult<(ApprovalBatch, BatchDisposition)> {
        let request = tx
            .request(request_id)
            .await?
            .ok_or(WorkflowError::RequestNotFound(request_id))?;

        if request.approver_id != actor {
            return Err(WorkflowError::Forbidden);
        }
        if request.status != ApprovalDecisionStatus::Pending {
            return Err(WorkflowError::AlreadyResolved { request_id });
        }

        let batch = tx
            .lock_batch(request.batch_id)
            .await?
            .ok_or(WorkflowError::BatchNotFound(request.batch_id))?;
        if batch.outcome != BatchOutcome::Open {
            return Err(WorkflowError::BatchClosed {
                batch_id: batch.batch_id,
            });
        }

        match decision {
            Decision::Reject => {
                tx.resolve_request(request_id, ApprovalDecisionStatus::Rejected, comment, now)
                    .await?;
                tx.resolve_batch(batch.batch_id, BatchOutcome::Rejected, now)
                    .await?;
                Ok((batch, BatchDisposition::Rejected))
            }
            Decision::Approve => {
                tx.resolve_request(request_id, ApprovalDecisionStatus::Approved, comment, now)
                    .await?;

                let requests = tx.batch_requests(batch.batch_id).await?;
                let total = requests.len() as u32;
                let approved = requests
                    .iter()
                    .filter(|r| r.status == ApprovalDecisionStatus::Approved)
                    .count() as u32;

                if batch.policy.is_satisfied(approved, total) {
                    tx.resolve_batch(batch.batch_id, BatchOutcome::Approved, now)
                        .await?;
                    Ok((batch, BatchDisposition::Satisfied))
                } else {
                    Ok((batch, BatchDisposition::StillOpen { approved, total }))
                }
            }
        }
    }
}
