//! Status Graph
//!
//! Read-only view of a tenant's transition edges. Absence of an edge means
//! "transition not defined", a validation outcome for the engine to report,
//! never an error here.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::WorkflowResult;
use crate::principal::Principal;
use crate::status::{Status, TransitionEdge};
use crate::store::WorkflowStore;

pub struct StatusGraph {
    store: Arc<dyn WorkflowStore>,
}

impl StatusGraph {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    pub async fn status(
        &self,
        company_id: Uuid,
        status_id: Uuid,
    ) -> WorkflowResult<Option<Status>> {
        Ok(self.store.status(company_id, status_id).await?)
    }

    pub async fn find_edge(
        &self,
        company_id: Uuid,
        from_status_id: Uuid,
        to_status_id: Uuid,
    ) -> WorkflowResult<Option<TransitionEdge>> {
        Ok(self
            .store
            .find_edge(company_id, from_status_id, to_status_id)
            .await?)
    }

    /// Legal next moves out of a status, before authorization filtering.
    pub async fn outgoing_edges(
        &self,
        company_id: Uuid,
        from_status_id: Uuid,
    ) -> WorkflowResult<Vec<TransitionEdge>> {
        Ok(self.store.outgoing_edges(company_id, from_status_id).await?)
    }

    /// Pure role-intersection test; an empty role set means unrestricted.
    pub fn is_authorized(edge: &TransitionEdge, principal: &dyn Principal) -> bool {
        edge.permits(principal)
    }
}
