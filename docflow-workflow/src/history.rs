//! Workflow History Ledger
//!
//! Append-only records of every attempted and performed transition. Entries
//! are written exactly once and never updated or deleted; the ledger is the
//! source of truth for what actually happened to a document. Ordering within
//! one document's timeline is by the store-assigned `seq`, which follows
//! commit order rather than wall clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle stage a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStage {
    /// A guarded transition was opened and awaits approval.
    Pending,
    /// The transition took effect.
    Committed,
    /// The approval batch was rejected; the document did not move.
    Rejected,
}

/// One immutable row in a document's workflow history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entry_id: Uuid,
    pub document_id: Uuid,
    /// Absent only for the synthetic "document entered the graph" entry.
    pub from_status_id: Option<Uuid>,
    pub to_status_id: Uuid,
    pub performed_by: Uuid,
    pub comment: Option<String>,
    pub stage: TransitionStage,
    /// Approval batch that authorized (or blocked) this move, if the edge
    /// was approval-gated.
    pub approval_batch_id: Option<Uuid>,
    /// Store-assigned position in the document's timeline, starting at 1.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    fn record(
        document_id: Uuid,
        from_status_id: Option<Uuid>,
        to_status_id: Uuid,
        performed_by: Uuid,
        comment: Option<String>,
        stage: TransitionStage,
        approval_batch_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            document_id,
            from_status_id,
            to_status_id,
            performed_by,
            comment,
            stage,
            approval_batch_id,
            // assigned by the store on append
            seq: 0,
            created_at,
        }
    }

    pub fn pending(
        document_id: Uuid,
        from_status_id: Uuid,
        to_status_id: Uuid,
        performed_by: Uuid,
        comment: Option<String>,
        approval_batch_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::record(
            document_id,
            Some(from_status_id),
            to_status_id,
            performed_by,
            comment,
            TransitionStage::Pending,
            Some(approval_batch_id),
            created_at,
        )
    }

    pub fn committed(
        document_id: Uuid,
        from_status_id: Uuid,
        to_status_id: Uuid,
        performed_by: Uuid,
        comment: Option<String>,
        approval_batch_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::record(
            document_id,
            Some(from_status_id),
            to_status_id,
            performed_by,
            comment,
            TransitionStage::Committed,
            approval_batch_id,
            created_at,
        )
    }

    pub fn rejected(
        document_id: Uuid,
        from_status_id: Uuid,
        to_status_id: Uuid,
        performed_by: Uuid,
        comment: Option<String>,
        approval_batch_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self::record(
            document_id,
            Some(from_status_id),
            to_status_id,
            performed_by,
            comment,
            TransitionStage::Rejected,
            Some(approval_batch_id),
            created_at,
        )
    }
}

/// Replay a document's committed entries, returning the sequence of statuses
/// it actually passed through. The final element is the document's current
/// status.
pub fn committed_path(entries: &[HistoryEntry]) -> Vec<Uuid> {
    let mut ordered: Vec<&HistoryEntry> = entries
        .iter()
        .filter(|e| e.stage == TransitionStage::Committed)
        .collect();
    ordered.sort_by_key(|e| e.seq);
    ordered.iter().map(|e| e.to_status_id).collect()
}
