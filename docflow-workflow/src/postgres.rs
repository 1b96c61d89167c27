//! Postgres Store
//!
//! Production backend behind the `database` feature. One sqlx transaction
//! per unit of work; the quorum check serializes on a `FOR UPDATE` row lock
//! of the batch, and the optimistic document update is a conditional
//! `UPDATE ... WHERE status_id = expected` with a rows-affected check.
//!
//! All queries use runtime-checked `sqlx::query()` instead of compile-time
//! macros because the tables are created by `ensure_schema` / migrations
//! that may not exist at compile time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::approval::{
    ApprovalBatch, ApprovalDecisionStatus, ApprovalRequest, ApprovalStats, BatchOutcome,
};
use crate::document::Document;
use crate::history::{HistoryEntry, TransitionStage};
use crate::notify::DomainEvent;
use crate::status::{Status, TransitionEdge};
use crate::store::{StoreError, WorkflowStore, WorkflowTx};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS docflow_statuses (
        status_id UUID PRIMARY KEY,
        company_id UUID NOT NULL,
        name TEXT NOT NULL,
        is_initial BOOLEAN NOT NULL DEFAULT FALSE,
        is_final BOOLEAN NOT NULL DEFAULT FALSE,
        active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS docflow_edges (
        edge_id UUID PRIMARY KEY,
        company_id UUID NOT NULL,
        from_status_id UUID NOT NULL,
        to_status_id UUID NOT NULL,
        allowed_roles JSONB NOT NULL DEFAULT '[]',
        approval_policy JSONB NOT NULL DEFAULT '{"type":"none"}',
        approver_rules JSONB NOT NULL DEFAULT '[]',
        sla_hours INT,
        active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS docflow_edges_lookup
        ON docflow_edges (company_id, from_status_id, to_status_id)
        WHERE active
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS docflow_documents (
        document_id UUID PRIMARY KEY,
        company_id UUID NOT NULL,
        status_id UUID NOT NULL,
        assigned_to UUID,
        created_by UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        completed_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS docflow_history (
        entry_id UUID PRIMARY KEY,
        document_id UUID NOT NULL,
        from_status_id UUID,
        to_status_id UUID NOT NULL,
        performed_by UUID NOT NULL,
        comment TEXT,
        stage TEXT NOT NULL,
        approval_batch_id UUID,
        seq BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        UNIQUE (document_id, seq)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS docflow_approval_batches (
        batch_id UUID PRIMARY KEY,
        company_id UUID NOT NULL,
        document_id UUID NOT NULL,
        edge_id UUID NOT NULL,
        history_entry_id UUID NOT NULL,
        policy JSONB NOT NULL,
        outcome TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        resolved_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS docflow_approval_requests (
        request_id UUID PRIMARY KEY,
        batch_id UUID NOT NULL,
        document_id UUID NOT NULL,
        edge_id UUID NOT NULL,
        history_entry_id UUID NOT NULL,
        approver_id UUID NOT NULL,
        status TEXT NOT NULL,
        comment TEXT,
        responded_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS docflow_approval_requests_by_approver
        ON docflow_approval_requests (approver_id) WHERE status = 'pending'
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS docflow_events (
        event_id UUID PRIMARY KEY,
        recipient UUID NOT NULL,
        payload JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

fn stage_str(stage: TransitionStage) -> &'static str {
    match stage {
        TransitionStage::Pending => "pending",
        TransitionStage::Committed => "committed",
        TransitionStage::Rejected => "rejected",
    }
}

fn stage_from(s: &str) -> TransitionStage {
    match s {
        "committed" => TransitionStage::Committed,
        "rejected" => TransitionStage::Rejected,
        _ => TransitionStage::Pending,
    }
}

fn decision_status_str(status: ApprovalDecisionStatus) -> &'static str {
    match status {
        ApprovalDecisionStatus::Pending => "pending",
        ApprovalDecisionStatus::Approved => "approved",
        ApprovalDecisionStatus::Rejected => "rejected",
    }
}

fn decision_status_from(s: &str) -> ApprovalDecisionStatus {
    match s {
        "approved" => ApprovalDecisionStatus::Approved,
        "rejected" => ApprovalDecisionStatus::Rejected,
        _ => ApprovalDecisionStatus::Pending,
    }
}

fn outcome_str(outcome: BatchOutcome) -> &'static str {
    match outcome {
        BatchOutcome::Open => "open",
        BatchOutcome::Approved => "approved",
        BatchOutcome::Rejected => "rejected",
    }
}

fn outcome_from(s: &str) -> BatchOutcome {
    match s {
        "approved" => BatchOutcome::Approved,
        "rejected" => BatchOutcome::Rejected,
        _ => BatchOutcome::Open,
    }
}

/// Store backed by Postgres.
pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the engine's tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct StatusRow {
    status_id: Uuid,
    company_id: Uuid,
    name: String,
    is_initial: bool,
    is_final: bool,
    active: bool,
}

impl From<StatusRow> for Status {
    fn from(row: StatusRow) -> Self {
        Self {
            status_id: row.status_id,
            company_id: row.company_id,
            name: row.name,
            is_initial: row.is_initial,
            is_final: row.is_final,
            active: row.active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EdgeRow {
    edge_id: Uuid,
    company_id: Uuid,
    from_status_id: Uuid,
    to_status_id: Uuid,
    allowed_roles: serde_json::Value,
    approval_policy: serde_json::Value,
    approver_rules: serde_json::Value,
    sla_hours: Option<i32>,
    active: bool,
}

impl From<EdgeRow> for TransitionEdge {
    fn from(row: EdgeRow) -> Self {
        Self {
            edge_id: row.edge_id,
            company_id: row.company_id,
            from_status_id: row.from_status_id,
            to_status_id: row.to_status_id,
            allowed_roles: serde_json::from_value(row.allowed_roles).unwrap_or_default(),
            approval_policy: serde_json::from_value(row.approval_policy).unwrap_or_default(),
            approver_rules: serde_json::from_value(row.approver_rules).unwrap_or_default(),
            sla_hours: row.sla_hours.map(|h| h as u32),
            active: row.active,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    document_id: Uuid,
    company_id: Uuid,
    status_id: Uuid,
    assigned_to: Option<Uuid>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            document_id: row.document_id,
            company_id: row.company_id,
            status_id: row.status_id,
            assigned_to: row.assigned_to,
            created_by: row.created_by,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    entry_id: Uuid,
    document_id: Uuid,
    from_status_id: Option<Uuid>,
    to_status_id: Uuid,
    performed_by: Uuid,
    comment: Option<String>,
    stage: String,
    approval_batch_id: Option<Uuid>,
    seq: i64,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            entry_id: row.entry_id,
            document_id: row.document_id,
            from_status_id: row.from_status_id,
            to_status_id: row.to_status_id,
            performed_by: row.performed_by,
            comment: row.comment,
            stage: stage_from(&row.stage),
            approval_batch_id: row.approval_batch_id,
            seq: row.seq as u64,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BatchRow {
    batch_id: Uuid,
    company_id: Uuid,
    document_id: Uuid,
    edge_id: Uuid,
    history_entry_id: Uuid,
    policy: serde_json::Value,
    outcome: String,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl From<BatchRow> for ApprovalBatch {
    fn from(row: BatchRow) -> Self {
        Self {
            batch_id: row.batch_id,
            company_id: row.company_id,
            document_id: row.document_id,
            edge_id: row.edge_id,
            history_entry_id: row.history_entry_id,
            policy: serde_json::from_value(row.policy).unwrap_or_default(),
            outcome: outcome_from(&row.outcome),
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    request_id: Uuid,
    batch_id: Uuid,
    document_id: Uuid,
    edge_id: Uuid,
    history_entry_id: Uuid,
    approver_id: Uuid,
    status: String,
    comment: Option<String>,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<RequestRow> for ApprovalRequest {
    fn from(row: RequestRow) -> Self {
        Self {
            request_id: row.request_id,
            batch_id: row.batch_id,
            document_id: row.document_id,
            edge_id: row.edge_id,
            history_entry_id: row.history_entry_id,
            approver_id: row.approver_id,
            status: decision_status_from(&row.status),
            comment: row.comment,
            responded_at: row.responded_at,
            created_at: row.created_at,
        }
    }
}

const EDGE_COLUMNS: &str = "edge_id, company_id, from_status_id, to_status_id, \
     allowed_roles, approval_policy, approver_rules, sla_hours, active";

const REQUEST_COLUMNS: &str = "request_id, batch_id, document_id, edge_id, history_entry_id, \
     approver_id, status, comment, responded_at, created_at";

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn status(
        &self,
        company_id: Uuid,
        status_id: Uuid,
    ) -> Result<Option<Status>, StoreError> {
        let row = sqlx::query_as::<_, StatusRow>(
            "SELECT status_id, company_id, name, is_initial, is_final, active
             FROM docflow_statuses WHERE status_id = $1 AND company_id = $2",
        )
        .bind(status_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_edge(
        &self,
        company_id: Uuid,
        from_status_id: Uuid,
        to_status_id: Uuid,
    ) -> Result<Option<TransitionEdge>, StoreError> {
        let row = sqlx::query_as::<_, EdgeRow>(&format!(
            "SELECT {EDGE_COLUMNS} FROM docflow_edges
             WHERE company_id = $1 AND from_status_id = $2 AND to_status_id = $3 AND active"
        ))
        .bind(company_id)
        .bind(from_status_id)
        .bind(to_status_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn outgoing_edges(
        &self,
        company_id: Uuid,
        from_status_id: Uuid,
    ) -> Result<Vec<TransitionEdge>, StoreError> {
        let rows = sqlx::query_as::<_, EdgeRow>(&format!(
            "SELECT {EDGE_COLUMNS} FROM docflow_edges
             WHERE company_id = $1 AND from_status_id = $2 AND active"
        ))
        .bind(company_id)
        .bind(from_status_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_status(&self, status: Status) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO docflow_statuses (status_id, company_id, name, is_initial, is_final, active)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(status.status_id)
        .bind(status.company_id)
        .bind(&status.name)
        .bind(status.is_initial)
        .bind(status.is_final)
        .bind(status.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_edge(&self, edge: TransitionEdge) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        if edge.active {
            sqlx::query(
                "UPDATE docflow_edges SET active = FALSE
                 WHERE company_id = $1 AND from_status_id = $2 AND to_status_id = $3 AND active",
            )
            .bind(edge.company_id)
            .bind(edge.from_status_id)
            .bind(edge.to_status_id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            "INSERT INTO docflow_edges
             (edge_id, company_id, from_status_id, to_status_id, allowed_roles,
              approval_policy, approver_rules, sla_hours, active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(edge.edge_id)
        .bind(edge.company_id)
        .bind(edge.from_status_id)
        .bind(edge.to_status_id)
        .bind(serde_json::to_value(&edge.allowed_roles).unwrap_or_default())
        .bind(serde_json::to_value(edge.approval_policy).unwrap_or_default())
        .bind(serde_json::to_value(&edge.approver_rules).unwrap_or_default())
        .bind(edge.sla_hours.map(|h| h as i32))
        .bind(edge.active)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_document(&self, document: Document) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO docflow_documents
             (document_id, company_id, status_id, assigned_to, created_by, created_at, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(document.document_id)
        .bind(document.company_id)
        .bind(document.status_id)
        .bind(document.assigned_to)
        .bind(document.created_by)
        .bind(document.created_at)
        .bind(document.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn document(&self, document_id: Uuid) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT document_id, company_id, status_id, assigned_to, created_by,
                    created_at, completed_at
             FROM docflow_documents WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn history(&self, document_id: Uuid) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT entry_id, document_id, from_status_id, to_status_id, performed_by,
                    comment, stage, approval_batch_id, seq, created_at
             FROM docflow_history WHERE document_id = $1 ORDER BY seq",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn approval_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<ApprovalRequest>, StoreError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM docflow_approval_requests WHERE request_id = $1"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn approval_batch(&self, batch_id: Uuid) -> Result<Option<ApprovalBatch>, StoreError> {
        let row = sqlx::query_as::<_, BatchRow>(
            "SELECT batch_id, company_id, document_id, edge_id, history_entry_id,
                    policy, outcome, created_at, resolved_at
             FROM docflow_approval_batches WHERE batch_id = $1",
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn batch_requests(&self, batch_id: Uuid) -> Result<Vec<ApprovalRequest>, StoreError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM docflow_approval_requests
             WHERE batch_id = $1 ORDER BY created_at"
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn approval_stats(&self, document_id: Uuid) -> Result<ApprovalStats, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM docflow_approval_requests
             WHERE document_id = $1 GROUP BY status",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = ApprovalStats::default();
        for (status, count) in rows {
            let count = count as u32;
            stats.total += count;
            match decision_status_from(&status) {
                ApprovalDecisionStatus::Pending => stats.pending += count,
                ApprovalDecisionStatus::Approved => stats.approved += count,
                ApprovalDecisionStatus::Rejected => stats.rejected += count,
            }
        }
        Ok(stats)
    }

    async fn pending_approvals_for(
        &self,
        approver_id: Uuid,
    ) -> Result<Vec<ApprovalRequest>, StoreError> {
        let rows = sqlx::query_as::<_, RequestRow>(
            "SELECT r.request_id, r.batch_id, r.document_id, r.edge_id, r.history_entry_id,
                    r.approver_id, r.status, r.comment, r.responded_at, r.created_at
             FROM docflow_approval_requests r
             JOIN docflow_approval_batches b ON b.batch_id = r.batch_id
             WHERE r.approver_id = $1 AND r.status = 'pending' AND b.outcome = 'open'
             ORDER BY r.created_at",
        )
        .bind(approver_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx {
            tx,
            events: Vec::new(),
        }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
    events: Vec<DomainEvent>,
}

#[async_trait]
impl WorkflowTx for PgTx {
    async fn document(&mut self, document_id: Uuid) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT document_id, company_id, status_id, assigned_to, created_by,
                    created_at, completed_at
             FROM docflow_documents WHERE document_id = $1 FOR UPDATE",
        )
        .bind(document_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_document_status(
        &mut self,
        document_id: Uuid,
        expected_status: Uuid,
        new_status: Uuid,
        assigned_to: Option<Uuid>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE docflow_documents
             SET status_id = $3, assigned_to = $4, completed_at = $5
             WHERE document_id = $1 AND status_id = $2",
        )
        .bind(document_id)
        .bind(expected_status)
        .bind(new_status)
        .bind(assigned_to)
        .bind(completed_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn append_history(&mut self, entry: HistoryEntry) -> Result<u64, StoreError> {
        let seq: i64 = sqlx::query_scalar(
            "INSERT INTO docflow_history
             (entry_id, document_id, from_status_id, to_status_id, performed_by,
              comment, stage, approval_batch_id, seq, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM docflow_history
                      WHERE document_id = $2),
                     $9)
             RETURNING seq",
        )
        .bind(entry.entry_id)
        .bind(entry.document_id)
        .bind(entry.from_status_id)
        .bind(entry.to_status_id)
        .bind(entry.performed_by)
        .bind(&entry.comment)
        .bind(stage_str(entry.stage))
        .bind(entry.approval_batch_id)
        .bind(entry.created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(seq as u64)
    }

    async fn insert_batch(&mut self, batch: ApprovalBatch) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO docflow_approval_batches
             (batch_id, company_id, document_id, edge_id, history_entry_id,
              policy, outcome, created_at, resolved_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(batch.batch_id)
        .bind(batch.company_id)
        .bind(batch.document_id)
        .bind(batch.edge_id)
        .bind(batch.history_entry_id)
        .bind(serde_json::to_value(batch.policy).unwrap_or_default())
        .bind(outcome_str(batch.outcome))
        .bind(batch.created_at)
        .bind(batch.resolved_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_request(&mut self, request: ApprovalRequest) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO docflow_approval_requests
             (request_id, batch_id, document_id, edge_id, history_entry_id,
              approver_id, status, comment, responded_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(request.request_id)
        .bind(request.batch_id)
        .bind(request.document_id)
        .bind(request.edge_id)
        .bind(request.history_entry_id)
        .bind(request.approver_id)
        .bind(decision_status_str(request.status))
        .bind(&request.comment)
        .bind(request.responded_at)
        .bind(request.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_batch(&mut self, batch_id: Uuid) -> Result<Option<ApprovalBatch>, StoreError> {
        let row = sqlx::query_as::<_, BatchRow>(
            "SELECT batch_id, company_id, document_id, edge_id, history_entry_id,
                    policy, outcome, created_at, resolved_at
             FROM docflow_approval_batches WHERE batch_id = $1 FOR UPDATE",
        )
        .bind(batch_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn request(&mut self, request_id: Uuid) -> Result<Option<ApprovalRequest>, StoreError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM docflow_approval_requests
             WHERE request_id = $1 FOR UPDATE"
        ))
        .bind(request_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn batch_requests(
        &mut self,
        batch_id: Uuid,
    ) -> Result<Vec<ApprovalRequest>, StoreError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM docflow_approval_requests
             WHERE batch_id = $1 ORDER BY created_at"
        ))
        .bind(batch_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn resolve_request(
        &mut self,
        request_id: Uuid,
        status: ApprovalDecisionStatus,
        comment: Option<String>,
        responded_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE docflow_approval_requests
             SET status = $2, comment = $3, responded_at = $4
             WHERE request_id = $1 AND status = 'pending'",
        )
        .bind(request_id)
        .bind(decision_status_str(status))
        .bind(&comment)
        .bind(responded_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() != 1 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn resolve_batch(
        &mut self,
        batch_id: Uuid,
        outcome: BatchOutcome,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE docflow_approval_batches
             SET outcome = $2, resolved_at = $3
             WHERE batch_id = $1 AND outcome = 'open'",
        )
        .bind(batch_id)
        .bind(outcome_str(outcome))
        .bind(resolved_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() != 1 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    fn queue_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    async fn commit(mut self: Box<Self>) -> Result<Vec<DomainEvent>, StoreError> {
        for event in &self.events {
            sqlx::query(
                "INSERT INTO docflow_events (event_id, recipient, payload, created_at)
                 VALUES ($1, $2, $3, NOW())",
            )
            .bind(Uuid::new_v4())
            .bind(event.recipient())
            .bind(serde_json::to_value(event).unwrap_or_default())
            .execute(&mut *self.tx)
            .await?;
        }
        let PgTx { tx, events } = *self;
        tx.commit().await?;
        Ok(events)
    }
}
