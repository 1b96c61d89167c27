//! End-to-end scenarios for the workflow engine over the in-memory store:
//! direct commits, approval batches, rejections, SLA reporting, and the
//! concurrency guarantees around the document update and the quorum check.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use docflow_workflow::{
    committed_path, AuthenticatedUser, BatchProgress, Decision, Document, DomainEvent,
    GraphLoader, MemoryStore, Notifier, SeededGraph, SlaOutcome, StaticDirectory,
    TransitionResult, TransitionStage, WorkflowEngine, WorkflowError, WorkflowStore,
};

const LIFECYCLE: &str = r#"
graph: document_lifecycle
description: Standard review flow

statuses:
  Draft:
    initial: true
  Review: {}
  Approved:
    terminal: true
  Archived:
    terminal: true

edges:
  - from: Draft
    to: Review
    roles: [editor]
    sla_hours: 24
  - from: Draft
    to: Archived
    roles: [editor]
  - from: Review
    to: Approved
    roles: [reviewer]
    approval: { type: all }
    approvers:
      - type: by_role
        role: approver
    sla_hours: 24
"#;

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingNotifier {
    async fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &DomainEvent) {
        self.events.lock().await.push(event.clone());
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    engine: WorkflowEngine,
    notifier: Arc<RecordingNotifier>,
    graph: SeededGraph,
    company: Uuid,
    approver_one: Uuid,
    approver_two: Uuid,
}

impl Harness {
    async fn new() -> Self {
        let company = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let (approver_one, approver_two) = (Uuid::new_v4(), Uuid::new_v4());

        let directory = StaticDirectory::new()
            .with_role_member(company, "approver", approver_one)
            .with_role_member(company, "approver", approver_two);

        let engine = WorkflowEngine::new(
            store.clone(),
            Arc::new(directory),
            notifier.clone(),
        );

        let def = GraphLoader::load_from_str(LIFECYCLE).unwrap();
        let graph = def.seed(store.as_ref(), company).await.unwrap();

        Self {
            store,
            engine,
            notifier,
            graph,
            company,
            approver_one,
            approver_two,
        }
    }

    fn status(&self, name: &str) -> Uuid {
        self.graph.status_id(name).unwrap()
    }

    async fn new_document(&self) -> Document {
        let document = Document::new(self.company, self.graph.initial_status_id, Uuid::new_v4());
        self.store.insert_document(document.clone()).await.unwrap();
        document
    }

    /// Move a fresh document into Review and open the approval batch toward
    /// Approved. Returns the document.
    async fn document_awaiting_approval(&self) -> Document {
        let document = self.new_document().await;
        let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);
        self.engine
            .attempt_transition(document.document_id, self.status("Review"), &editor, None)
            .await
            .unwrap();

        let reviewer = AuthenticatedUser::new(Uuid::new_v4(), ["reviewer"]);
        let result = self
            .engine
            .attempt_transition(
                document.document_id,
                self.status("Approved"),
                &reviewer,
                Some("please sign off"),
            )
            .await
            .unwrap();
        assert!(matches!(result, TransitionResult::Pending { .. }));
        document
    }
}

#[tokio::test]
async fn direct_commit_moves_document_and_writes_ledger() {
    let h = Harness::new().await;
    let document = h.new_document().await;
    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);

    let result = h
        .engine
        .attempt_transition(document.document_id, h.status("Review"), &editor, Some("ready"))
        .await
        .unwrap();

    match result {
        TransitionResult::Committed { document: updated, sla, .. } => {
            assert_eq!(updated.status_id, h.status("Review"));
            assert_eq!(sla, SlaOutcome::OnTime);
        }
        other => panic!("expected committed, got {:?}", other),
    }

    let reloaded = h.store.document(document.document_id).await.unwrap().unwrap();
    assert_eq!(reloaded.status_id, h.status("Review"));
    assert!(reloaded.completed_at.is_none());

    let timeline = h.engine.timeline(document.document_id).await.unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].stage, TransitionStage::Committed);
    assert_eq!(timeline[0].from_status_id, Some(h.status("Draft")));
    assert_eq!(timeline[0].to_status_id, h.status("Review"));
    assert_eq!(timeline[0].comment.as_deref(), Some("ready"));
}

#[tokio::test]
async fn undefined_edge_is_invalid_and_leaves_no_trace() {
    let h = Harness::new().await;
    let document = h.new_document().await;
    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);

    // Draft -> Approved is not configured.
    let result = h
        .engine
        .attempt_transition(document.document_id, h.status("Approved"), &editor, None)
        .await;
    assert!(matches!(result, Err(WorkflowError::InvalidTransition { .. })));

    let reloaded = h.store.document(document.document_id).await.unwrap().unwrap();
    assert_eq!(reloaded.status_id, h.status("Draft"));
    assert!(h.engine.timeline(document.document_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unauthorized_principal_is_rejected_without_ledger_row() {
    let h = Harness::new().await;
    let document = h.new_document().await;
    let viewer = AuthenticatedUser::new(Uuid::new_v4(), ["viewer"]);

    let result = h
        .engine
        .attempt_transition(document.document_id, h.status("Review"), &viewer, None)
        .await;
    match result {
        Err(WorkflowError::Unauthorized { required }) => {
            assert_eq!(required, vec!["editor".to_string()]);
        }
        other => panic!("expected unauthorized, got {:?}", other),
    }

    assert!(h.engine.timeline(document.document_id).await.unwrap().is_empty());
    assert!(h.notifier.events().await.is_empty());
}

#[tokio::test]
async fn transition_from_terminal_status_is_invalid() {
    let h = Harness::new().await;
    let document = h.new_document().await;
    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);

    h.engine
        .attempt_transition(document.document_id, h.status("Archived"), &editor, None)
        .await
        .unwrap();

    let result = h
        .engine
        .attempt_transition(document.document_id, h.status("Review"), &editor, None)
        .await;
    assert!(matches!(result, Err(WorkflowError::InvalidTransition { .. })));
}

#[tokio::test]
async fn guarded_edge_creates_pending_batch_without_moving_document() {
    let h = Harness::new().await;
    let document = h.document_awaiting_approval().await;

    let reloaded = h.store.document(document.document_id).await.unwrap().unwrap();
    assert_eq!(reloaded.status_id, h.status("Review"));

    let stats = h.engine.approval_stats(document.document_id).await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.pending, 2);

    // One pending ledger entry on top of the committed Draft -> Review move.
    let timeline = h.engine.timeline(document.document_id).await.unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1].stage, TransitionStage::Pending);

    // Both approvers were notified.
    let requested: Vec<_> = h
        .notifier
        .events()
        .await
        .into_iter()
        .filter(|e| matches!(e, DomainEvent::ApprovalRequested { .. }))
        .collect();
    assert_eq!(requested.len(), 2);
}

#[tokio::test]
async fn all_policy_commits_only_after_every_approval() {
    let h = Harness::new().await;
    let document = h.document_awaiting_approval().await;

    let u1 = AuthenticatedUser::new(h.approver_one, ["approver"]);
    let u2 = AuthenticatedUser::new(h.approver_two, ["approver"]);

    let r1 = h.engine.pending_approvals_for(h.approver_one).await.unwrap();
    let outcome = h
        .engine
        .record_decision(r1[0].request_id, &u1, Decision::Approve, None)
        .await
        .unwrap();
    assert!(matches!(
        outcome.progress,
        BatchProgress::StillOpen { approved: 1, total: 2 }
    ));

    // First approval alone does not move the document.
    let mid = h.store.document(document.document_id).await.unwrap().unwrap();
    assert_eq!(mid.status_id, h.status("Review"));

    let r2 = h.engine.pending_approvals_for(h.approver_two).await.unwrap();
    let outcome = h
        .engine
        .record_decision(r2[0].request_id, &u2, Decision::Approve, Some("lgtm"))
        .await
        .unwrap();

    match outcome.progress {
        BatchProgress::Approved { document: updated, .. } => {
            assert_eq!(updated.status_id, h.status("Approved"));
            assert!(updated.completed_at.is_some());
        }
        other => panic!("expected approved batch, got {:?}", other),
    }

    let timeline = h.engine.timeline(document.document_id).await.unwrap();
    let path = committed_path(&timeline);
    assert_eq!(path, vec![h.status("Review"), h.status("Approved")]);
    // pending entry stayed in the ledger untouched
    assert_eq!(timeline.len(), 3);
}

#[tokio::test]
async fn rejection_closes_batch_and_keeps_document_in_place() {
    let h = Harness::new().await;
    let document = h.document_awaiting_approval().await;

    let u1 = AuthenticatedUser::new(h.approver_one, ["approver"]);
    let u2 = AuthenticatedUser::new(h.approver_two, ["approver"]);

    let r2 = h.engine.pending_approvals_for(h.approver_two).await.unwrap();
    let r1 = h.engine.pending_approvals_for(h.approver_one).await.unwrap();

    let outcome = h
        .engine
        .record_decision(r1[0].request_id, &u1, Decision::Reject, Some("not ready"))
        .await
        .unwrap();
    assert!(matches!(outcome.progress, BatchProgress::Rejected));

    let reloaded = h.store.document(document.document_id).await.unwrap().unwrap();
    assert_eq!(reloaded.status_id, h.status("Review"));
    assert!(reloaded.completed_at.is_none());

    // The sibling's later approval hits the closed batch.
    let late = h
        .engine
        .record_decision(r2[0].request_id, &u2, Decision::Approve, None)
        .await;
    assert!(matches!(late, Err(WorkflowError::BatchClosed { .. })));

    let reloaded = h.store.document(document.document_id).await.unwrap().unwrap();
    assert_eq!(reloaded.status_id, h.status("Review"));

    // Ledger: committed, pending, rejected.
    let timeline = h.engine.timeline(document.document_id).await.unwrap();
    let stages: Vec<TransitionStage> = timeline.iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            TransitionStage::Committed,
            TransitionStage::Pending,
            TransitionStage::Rejected
        ]
    );

    // No open work remains for either approver.
    assert!(h.engine.pending_approvals_for(h.approver_one).await.unwrap().is_empty());
    assert!(h.engine.pending_approvals_for(h.approver_two).await.unwrap().is_empty());

    let stats = h.engine.approval_stats(document.document_id).await.unwrap();
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.pending, 1); // the moot sibling stays pending forever
}

#[tokio::test]
async fn decision_by_wrong_principal_is_forbidden() {
    let h = Harness::new().await;
    h.document_awaiting_approval().await;

    let stranger = AuthenticatedUser::new(Uuid::new_v4(), ["approver"]);
    let r1 = h.engine.pending_approvals_for(h.approver_one).await.unwrap();

    let result = h
        .engine
        .record_decision(r1[0].request_id, &stranger, Decision::Approve, None)
        .await;
    assert!(matches!(result, Err(WorkflowError::Forbidden)));
}

#[tokio::test]
async fn resolved_request_cannot_be_decided_twice() {
    let h = Harness::new().await;
    h.document_awaiting_approval().await;

    let u1 = AuthenticatedUser::new(h.approver_one, ["approver"]);
    let r1 = h.engine.pending_approvals_for(h.approver_one).await.unwrap();

    h.engine
        .record_decision(r1[0].request_id, &u1, Decision::Approve, None)
        .await
        .unwrap();

    let again = h
        .engine
        .record_decision(r1[0].request_id, &u1, Decision::Approve, None)
        .await;
    assert!(matches!(again, Err(WorkflowError::AlreadyResolved { .. })));
}

#[tokio::test]
async fn quorum_policy_commits_at_threshold() {
    const QUORUM_GRAPH: &str = r#"
graph: countersign
statuses:
  Submitted:
    initial: true
  Countersigned:
    terminal: true
edges:
  - from: Submitted
    to: Countersigned
    approval: { type: any_of, required: 2 }
    approvers:
      - type: by_role
        role: signer
"#;

    let company = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let signers: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    let mut directory = StaticDirectory::new();
    for signer in &signers {
        directory = directory.with_role_member(company, "signer", *signer);
    }
    let engine = WorkflowEngine::new(
        store.clone(),
        Arc::new(directory),
        Arc::new(docflow_workflow::NoopNotifier),
    );
    let graph = GraphLoader::load_from_str(QUORUM_GRAPH)
        .unwrap()
        .seed(store.as_ref(), company)
        .await
        .unwrap();

    let document = Document::new(company, graph.initial_status_id, Uuid::new_v4());
    store.insert_document(document.clone()).await.unwrap();

    let submitter = AuthenticatedUser::new(Uuid::new_v4(), ["clerk"]);
    let target = graph.status_id("Countersigned").unwrap();
    let result = engine
        .attempt_transition(document.document_id, target, &submitter, None)
        .await
        .unwrap();
    assert!(matches!(result, TransitionResult::Pending { .. }));

    let s0 = AuthenticatedUser::new(signers[0], ["signer"]);
    let r0 = engine.pending_approvals_for(signers[0]).await.unwrap();
    let outcome = engine
        .record_decision(r0[0].request_id, &s0, Decision::Approve, None)
        .await
        .unwrap();
    assert!(matches!(
        outcome.progress,
        BatchProgress::StillOpen { approved: 1, total: 3 }
    ));

    let s1 = AuthenticatedUser::new(signers[1], ["signer"]);
    let r1 = engine.pending_approvals_for(signers[1]).await.unwrap();
    let outcome = engine
        .record_decision(r1[0].request_id, &s1, Decision::Approve, None)
        .await
        .unwrap();
    assert!(matches!(outcome.progress, BatchProgress::Approved { .. }));

    let reloaded = store.document(document.document_id).await.unwrap().unwrap();
    assert_eq!(reloaded.status_id, target);

    // The third signer's request went moot with the batch resolution.
    assert!(engine.pending_approvals_for(signers[2]).await.unwrap().is_empty());
}

#[tokio::test]
async fn unresolvable_approver_set_is_a_configuration_error() {
    let company = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    // Directory has nobody holding the approver role.
    let engine = WorkflowEngine::new(
        store.clone(),
        Arc::new(StaticDirectory::new()),
        Arc::new(docflow_workflow::NoopNotifier),
    );
    let graph = GraphLoader::load_from_str(LIFECYCLE)
        .unwrap()
        .seed(store.as_ref(), company)
        .await
        .unwrap();

    let document = Document::new(company, graph.initial_status_id, Uuid::new_v4());
    store.insert_document(document.clone()).await.unwrap();

    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);
    engine
        .attempt_transition(
            document.document_id,
            graph.status_id("Review").unwrap(),
            &editor,
            None,
        )
        .await
        .unwrap();

    let reviewer = AuthenticatedUser::new(Uuid::new_v4(), ["reviewer"]);
    let result = engine
        .attempt_transition(
            document.document_id,
            graph.status_id("Approved").unwrap(),
            &reviewer,
            None,
        )
        .await;
    assert!(matches!(
        result,
        Err(WorkflowError::InvalidApprovalConfiguration { .. })
    ));

    // Nothing was written for the failed attempt.
    let stats = engine.approval_stats(document.document_id).await.unwrap();
    assert_eq!(stats.total, 0);
}

#[tokio::test]
async fn overdue_transition_is_reported_not_blocked() {
    let h = Harness::new().await;

    // A document created 30 hours ago against a 24 hour budget.
    let mut document = Document::new(h.company, h.graph.initial_status_id, Uuid::new_v4());
    document.created_at = Utc::now() - Duration::hours(30);
    h.store.insert_document(document.clone()).await.unwrap();

    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);
    let result = h
        .engine
        .attempt_transition(document.document_id, h.status("Review"), &editor, None)
        .await
        .unwrap();

    match result {
        TransitionResult::Committed { sla, .. } => {
            assert!(matches!(sla, SlaOutcome::Overdue { exceeded_hours } if exceeded_hours >= 5));
        }
        other => panic!("expected committed, got {:?}", other),
    }
}

#[tokio::test]
async fn edge_without_budget_reports_no_sla() {
    let h = Harness::new().await;
    let document = h.new_document().await;
    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);

    let result = h
        .engine
        .attempt_transition(document.document_id, h.status("Archived"), &editor, None)
        .await
        .unwrap();
    match result {
        TransitionResult::Committed { sla, document: updated, .. } => {
            assert_eq!(sla, SlaOutcome::NoSla);
            // Archived is terminal.
            assert!(updated.completed_at.is_some());
        }
        other => panic!("expected committed, got {:?}", other),
    }
}

#[tokio::test]
async fn available_transitions_respect_roles_and_terminal_states() {
    let h = Harness::new().await;
    let document = h.new_document().await;

    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);
    let available = h
        .engine
        .get_available_transitions(document.document_id, &editor)
        .await
        .unwrap();
    let names: Vec<&str> = available.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Archived", "Review"]);

    let viewer = AuthenticatedUser::new(Uuid::new_v4(), ["viewer"]);
    let available = h
        .engine
        .get_available_transitions(document.document_id, &viewer)
        .await
        .unwrap();
    assert!(available.is_empty());

    // Terminal statuses offer no moves to anyone.
    h.engine
        .attempt_transition(document.document_id, h.status("Archived"), &editor, None)
        .await
        .unwrap();
    let available = h
        .engine
        .get_available_transitions(document.document_id, &editor)
        .await
        .unwrap();
    assert!(available.is_empty());
}

#[tokio::test]
async fn concurrent_attempts_commit_exactly_once() {
    let h = Harness::new().await;
    let document = h.new_document().await;
    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);

    let toward_review =
        h.engine
            .attempt_transition(document.document_id, h.status("Review"), &editor, None);
    let toward_archive =
        h.engine
            .attempt_transition(document.document_id, h.status("Archived"), &editor, None);

    let (first, second) = tokio::join!(toward_review, toward_archive);

    let results = [first, second];
    let committed = results
        .iter()
        .filter(|r| matches!(r, Ok(TransitionResult::Committed { .. })))
        .count();
    assert_eq!(committed, 1);

    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(
                    err,
                    WorkflowError::ConcurrentModification
                        | WorkflowError::InvalidTransition { .. }
                ),
                "unexpected loser error: {:?}",
                err
            );
        }
    }

    // Exactly one committed ledger entry exists.
    let timeline = h.engine.timeline(document.document_id).await.unwrap();
    let committed_entries = timeline
        .iter()
        .filter(|e| e.stage == TransitionStage::Committed)
        .count();
    assert_eq!(committed_entries, 1);
}

#[tokio::test]
async fn notifications_fire_only_after_commit() {
    let h = Harness::new().await;
    let document = h.new_document().await;

    // A failed attempt produces no events.
    let viewer = AuthenticatedUser::new(Uuid::new_v4(), ["viewer"]);
    let _ = h
        .engine
        .attempt_transition(document.document_id, h.status("Review"), &viewer, None)
        .await;
    assert!(h.notifier.events().await.is_empty());

    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);
    h.engine
        .attempt_transition(document.document_id, h.status("Review"), &editor, None)
        .await
        .unwrap();

    let events = h.notifier.events().await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], DomainEvent::TransitionCommitted { .. }));
}

#[tokio::test]
async fn approval_quorum_never_double_commits_under_concurrent_decisions() {
    // Both approvers decide "at the same time"; the quorum check serializes
    // inside the store, so the parent transition commits exactly once.
    let h = Harness::new().await;
    let document = h.document_awaiting_approval().await;

    let u1 = AuthenticatedUser::new(h.approver_one, ["approver"]);
    let u2 = AuthenticatedUser::new(h.approver_two, ["approver"]);
    let r1 = h.engine.pending_approvals_for(h.approver_one).await.unwrap();
    let r2 = h.engine.pending_approvals_for(h.approver_two).await.unwrap();

    let d1 = h.engine.record_decision(r1[0].request_id, &u1, Decision::Approve, None);
    let d2 = h.engine.record_decision(r2[0].request_id, &u2, Decision::Approve, None);
    let (first, second) = tokio::join!(d1, d2);

    let outcomes = [first.unwrap(), second.unwrap()];
    let commits = outcomes
        .iter()
        .filter(|o| matches!(o.progress, BatchProgress::Approved { .. }))
        .count();
    assert_eq!(commits, 1);

    let timeline = h.engine.timeline(document.document_id).await.unwrap();
    let committed_to_approved = timeline
        .iter()
        .filter(|e| {
            e.stage == TransitionStage::Committed && e.to_status_id == h.status("Approved")
        })
        .count();
    assert_eq!(committed_to_approved, 1);
}

#[tokio::test]
async fn ledger_replay_reconstructs_the_status_timeline() {
    let h = Harness::new().await;
    let document = h.document_awaiting_approval().await;

    let u1 = AuthenticatedUser::new(h.approver_one, ["approver"]);
    let u2 = AuthenticatedUser::new(h.approver_two, ["approver"]);
    for (approver, user) in [(h.approver_one, &u1), (h.approver_two, &u2)] {
        let pending = h.engine.pending_approvals_for(approver).await.unwrap();
        if let Some(request) = pending.first() {
            h.engine
                .record_decision(request.request_id, user, Decision::Approve, None)
                .await
                .unwrap();
        }
    }

    let timeline = h.engine.timeline(document.document_id).await.unwrap();
    let path = committed_path(&timeline);
    let reloaded = h.store.document(document.document_id).await.unwrap().unwrap();

    assert_eq!(path.last().copied(), Some(reloaded.status_id));
    assert_eq!(path, vec![h.status("Review"), h.status("Approved")]);

    // seq is dense and strictly increasing.
    let seqs: Vec<u64> = timeline.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (1..=timeline.len() as u64).collect::<Vec<_>>());
}

#[tokio::test]
async fn quorum_definition_rejects_unknown_policy_shapes() {
    // A sanity check that policy parsing is strict enough to catch typos.
    let bad = r#"
graph: broken
statuses:
  A: { initial: true }
  B: { terminal: true }
edges:
  - from: A
    to: B
    approval: { type: most_of }
"#;
    assert!(matches!(
        GraphLoader::load_from_str(bad),
        Err(WorkflowError::Yaml(_))
    ));
}

#[tokio::test]
async fn transition_results_serialize_for_transport() {
    let h = Harness::new().await;
    let document = h.new_document().await;
    let editor = AuthenticatedUser::new(Uuid::new_v4(), ["editor"]);

    let result = h
        .engine
        .attempt_transition(document.document_id, h.status("Review"), &editor, None)
        .await
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["result"], "committed");
    assert_eq!(json["sla"]["status"], "on_time");
    assert_eq!(
        json["document"]["document_id"],
        document.document_id.to_string()
    );
}

#[tokio::test]
async fn assign_to_actor_policy_hands_document_to_performer() {
    let company = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let engine = WorkflowEngine::new(
        store.clone(),
        Arc::new(StaticDirectory::new()),
        Arc::new(docflow_workflow::NoopNotifier),
    )
    .with_assignee_policy(Arc::new(docflow_workflow::AssignToActor));

    let graph = GraphLoader::load_from_str(LIFECYCLE)
        .unwrap()
        .seed(store.as_ref(), company)
        .await
        .unwrap();

    let document = Document::new(company, graph.initial_status_id, Uuid::new_v4());
    store.insert_document(document.clone()).await.unwrap();

    let editor_id = Uuid::new_v4();
    let editor = AuthenticatedUser::new(editor_id, ["editor"]);
    engine
        .attempt_transition(
            document.document_id,
            graph.status_id("Review").unwrap(),
            &editor,
            None,
        )
        .await
        .unwrap();

    let reloaded = store.document(document.document_id).await.unwrap().unwrap();
    assert_eq!(reloaded.assigned_to, Some(editor_id));
}
