//! Status and Transition Edge Types
//!
//! Tenant-scoped workflow configuration: the named states a document can be
//! in, and the directed edges a document may move along. Edges carry the
//! role gate, the approval policy, the approver resolution rules, and an
//! optional SLA budget.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Principal;

/// A named document state belonging to a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub status_id: Uuid,
    /// Owning tenant
    pub company_id: Uuid,
    pub name: String,
    /// Entry state for newly created documents
    #[serde(default)]
    pub is_initial: bool,
    /// Terminal state; no outgoing edges are evaluated from it
    #[serde(default)]
    pub is_final: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Status {
    pub fn new(company_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            status_id: Uuid::new_v4(),
            company_id,
            name: name.into(),
            is_initial: false,
            is_final: false,
            active: true,
        }
    }
}

/// How a guarded edge aggregates individual approval decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// No sign-off required; the transition commits directly.
    #[default]
    None,
    /// Every resolved approver must approve.
    All,
    /// A quorum of `required` approvals out of the resolved set.
    AnyOf { required: u32 },
}

impl ApprovalPolicy {
    pub fn requires_approval(&self) -> bool {
        !matches!(self, ApprovalPolicy::None)
    }

    /// Whether `approved` decisions out of a batch of `total` requests
    /// satisfy this policy. A quorum larger than the batch degenerates to
    /// requiring every approver.
    pub fn is_satisfied(&self, approved: u32, total: u32) -> bool {
        match self {
            ApprovalPolicy::None => true,
            ApprovalPolicy::All => total > 0 && approved >= total,
            ApprovalPolicy::AnyOf { required } => {
                total > 0 && approved >= (*required).min(total)
            }
        }
    }
}

/// How the set of required approvers is resolved for a guarded edge.
/// Evaluated by a single resolver; rules are additive and the union is
/// de-duplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApproverRule {
    /// A fixed list of user ids.
    Explicit { users: Vec<Uuid> },
    /// Every user holding the named role in the tenant.
    ByRole { role: String },
    /// The head of the document's department.
    DepartmentHead,
    /// The manager of the document's branch.
    BranchManager,
}

/// A directed, configured move between two statuses for one tenant.
/// At most one active edge exists per `(company, from, to)` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub edge_id: Uuid,
    pub company_id: Uuid,
    pub from_status_id: Uuid,
    pub to_status_id: Uuid,
    /// Roles allowed to trigger this edge; empty means unrestricted.
    #[serde(default)]
    pub allowed_roles: Vec<String>,
    #[serde(default)]
    pub approval_policy: ApprovalPolicy,
    #[serde(default)]
    pub approver_rules: Vec<ApproverRule>,
    /// SLA budget in hours for completing this move, if any.
    #[serde(default)]
    pub sla_hours: Option<u32>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl TransitionEdge {
    pub fn new(company_id: Uuid, from_status_id: Uuid, to_status_id: Uuid) -> Self {
        Self {
            edge_id: Uuid::new_v4(),
            company_id,
            from_status_id,
            to_status_id,
            allowed_roles: Vec::new(),
            approval_policy: ApprovalPolicy::None,
            approver_rules: Vec::new(),
            sla_hours: None,
            active: true,
        }
    }

    /// True when the edge's role set is empty or intersects the principal's
    /// roles. Side-effect free.
    pub fn permits(&self, principal: &dyn Principal) -> bool {
        self.allowed_roles.is_empty()
            || self
                .allowed_roles
                .iter()
                .any(|role| principal.roles().contains(role))
    }
}

fn default_true() -> bool {
    true
}
