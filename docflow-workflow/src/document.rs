//! Document Entity
//!
//! The workflow subject. Only the fields the engine reads or writes live
//! here; content, storage paths, and rendering concerns belong to the
//! surrounding system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document moving through a tenant's status graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: Uuid,
    /// Owning tenant
    pub company_id: Uuid,
    /// Current workflow status
    pub status_id: Uuid,
    /// Principal responsible for the next action, if anyone
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Set once when a terminal status is reached
    pub completed_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Create a new document sitting in the given (initial) status.
    pub fn new(company_id: Uuid, status_id: Uuid, created_by: Uuid) -> Self {
        Self {
            document_id: Uuid::new_v4(),
            company_id,
            status_id,
            assigned_to: None,
            created_by,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn with_assignee(mut self, user_id: Uuid) -> Self {
        self.assigned_to = Some(user_id);
        self
    }
}
