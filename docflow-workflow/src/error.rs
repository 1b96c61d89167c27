//! Workflow Error Types
//!
//! Every failure of the engine is a typed result. Validation failures carry
//! enough context for the caller to pick a different move; configuration
//! defects are kept distinct from authorization failures so administrators
//! see them as their problem to fix.

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Main error type for the workflow engine
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// No active edge is defined for the requested move, the source status
    /// is terminal, or the target status does not exist for the tenant.
    #[error("no transition defined from {from} to {to}")]
    InvalidTransition { from: Uuid, to: Uuid },

    /// The principal's roles do not intersect the edge's allowed-role set.
    #[error("principal is not permitted to perform this transition (requires one of {required:?})")]
    Unauthorized { required: Vec<String> },

    /// An approval-gated edge resolved to zero approvers. A configuration
    /// defect, not a user error: nothing can ever move across this edge
    /// until an administrator fixes the approver rule.
    #[error("approval-gated edge {edge_id} resolves to no approvers")]
    InvalidApprovalConfiguration { edge_id: Uuid },

    /// The acting principal is not the named approver for the request.
    #[error("acting principal is not the approver named on this request")]
    Forbidden,

    /// A decision was recorded on a request that already left `pending`.
    /// Reported as an error so the caller does not assume its decision
    /// counted toward the quorum.
    #[error("approval request {request_id} is already resolved")]
    AlreadyResolved { request_id: Uuid },

    /// The request is still pending but its batch was already resolved
    /// (a sibling rejection closed it).
    #[error("approval batch {batch_id} is already closed")]
    BatchClosed { batch_id: Uuid },

    /// The document changed under the caller between validation and commit.
    /// Re-fetch state and reattempt; retrying the same stale write is not safe.
    #[error("document was modified concurrently")]
    ConcurrentModification,

    #[error("document {0} not found")]
    DocumentNotFound(Uuid),

    #[error("status {0} not found")]
    StatusNotFound(Uuid),

    #[error("approval request {0} not found")]
    RequestNotFound(Uuid),

    #[error("approval batch {0} not found")]
    BatchNotFound(Uuid),

    /// A graph definition failed structural validation.
    #[error("invalid graph definition: {0}")]
    InvalidDefinition(String),

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => WorkflowError::ConcurrentModification,
            other => WorkflowError::Store(other),
        }
    }
}

/// Result type alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
