//! Notification Hook
//!
//! The engine never calls the notification dispatcher inside a transaction.
//! Domain events are queued on the open transaction, come back from
//! `commit()`, and are handed to the `Notifier` afterwards. Delivery is
//! fire-and-forget from the engine's perspective; the dispatcher owns
//! retries and is expected to deliver at least once.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A notification-worthy fact recorded alongside the state change that
/// produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    ApprovalRequested {
        recipient: Uuid,
        document_id: Uuid,
        batch_id: Uuid,
        request_id: Uuid,
    },
    TransitionCommitted {
        recipient: Uuid,
        document_id: Uuid,
        from_status_id: Uuid,
        to_status_id: Uuid,
    },
    TransitionRejected {
        recipient: Uuid,
        document_id: Uuid,
        batch_id: Uuid,
    },
}

impl DomainEvent {
    /// The principal this event should be delivered to.
    pub fn recipient(&self) -> Uuid {
        match self {
            DomainEvent::ApprovalRequested { recipient, .. }
            | DomainEvent::TransitionCommitted { recipient, .. }
            | DomainEvent::TransitionRejected { recipient, .. } => *recipient,
        }
    }
}

/// Outbound notification dispatcher. External collaborator; implementations
/// should enqueue and return quickly.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &DomainEvent);
}

/// Dispatcher that drops everything. Useful for tests and for deployments
/// that read the event outbox some other way.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: &DomainEvent) {}
}
