//! Organizational Directory
//!
//! Approver rules resolve against the tenant's org structure: who holds a
//! role, who heads the document's department, who manages its branch. That
//! data lives with the identity provider, so the engine talks to it through
//! this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::document::Document;
use crate::error::WorkflowResult;

#[async_trait]
pub trait Directory: Send + Sync {
    /// Every user of the tenant holding the named role.
    async fn users_with_role(&self, company_id: Uuid, role: &str) -> WorkflowResult<Vec<Uuid>>;

    /// Head of the department the document belongs to, if resolvable.
    async fn department_head(
        &self,
        company_id: Uuid,
        document: &Document,
    ) -> WorkflowResult<Option<Uuid>>;

    /// Manager of the branch the document belongs to, if resolvable.
    async fn branch_manager(
        &self,
        company_id: Uuid,
        document: &Document,
    ) -> WorkflowResult<Option<Uuid>>;
}

/// Map-backed directory for tests and embedded deployments.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    role_members: HashMap<(Uuid, String), Vec<Uuid>>,
    department_heads: HashMap<Uuid, Uuid>,
    branch_managers: HashMap<Uuid, Uuid>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role_member(mut self, company_id: Uuid, role: &str, user_id: Uuid) -> Self {
        self.role_members
            .entry((company_id, role.to_string()))
            .or_default()
            .push(user_id);
        self
    }

    pub fn with_department_head(mut self, company_id: Uuid, user_id: Uuid) -> Self {
        self.department_heads.insert(company_id, user_id);
        self
    }

    pub fn with_branch_manager(mut self, company_id: Uuid, user_id: Uuid) -> Self {
        self.branch_managers.insert(company_id, user_id);
        self
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn users_with_role(&self, company_id: Uuid, role: &str) -> WorkflowResult<Vec<Uuid>> {
        Ok(self
            .role_members
            .get(&(company_id, role.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn department_head(
        &self,
        company_id: Uuid,
        _document: &Document,
    ) -> WorkflowResult<Option<Uuid>> {
        Ok(self.department_heads.get(&company_id).copied())
    }

    async fn branch_manager(
        &self,
        company_id: Uuid,
        _document: &Document,
    ) -> WorkflowResult<Option<Uuid>> {
        Ok(self.branch_managers.get(&company_id).copied())
    }
}
