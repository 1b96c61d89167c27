//! Graph Definition Types and YAML Loading
//!
//! Tenant status graphs are configuration. Definitions are written in YAML,
//! validated structurally, and seeded into a store per tenant.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::status::{ApprovalPolicy, ApproverRule, Status, TransitionEdge};
use crate::store::WorkflowStore;

/// A complete status graph definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Graph identifier
    pub graph: String,
    /// Version number
    #[serde(default = "default_version")]
    pub version: u32,
    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Status definitions, keyed by display name
    pub statuses: HashMap<String, StatusDef>,

    /// Directed edges between statuses
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
}

fn default_version() -> u32 {
    1
}

/// Status definition
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatusDef {
    #[serde(default)]
    pub description: String,
    /// Is this the entry status for new documents?
    #[serde(default)]
    pub initial: bool,
    /// Is this a terminal status?
    #[serde(default)]
    pub terminal: bool,
}

/// Edge definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDef {
    pub from: String,
    pub to: String,
    /// Roles allowed to trigger the edge; empty means unrestricted
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub approval: ApprovalPolicy,
    #[serde(default)]
    pub approvers: Vec<ApproverRule>,
    #[serde(default)]
    pub sla_hours: Option<u32>,
}

impl GraphDefinition {
    /// The entry status for this graph
    pub fn initial_status(&self) -> Option<&str> {
        self.statuses
            .iter()
            .find(|(_, s)| s.initial)
            .map(|(name, _)| name.as_str())
    }

    /// Terminal statuses
    pub fn terminal_statuses(&self) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|(_, s)| s.terminal)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Structural validation. Checks the shape of the graph, not
    /// reachability; unreachable statuses are permitted to exist.
    pub fn validate(&self) -> WorkflowResult<()> {
        let initials: Vec<&str> = self
            .statuses
            .iter()
            .filter(|(_, s)| s.initial)
            .map(|(name, _)| name.as_str())
            .collect();
        if initials.len() != 1 {
            return Err(WorkflowError::InvalidDefinition(format!(
                "graph '{}' must declare exactly one initial status, found {}",
                self.graph,
                initials.len()
            )));
        }
        if self.terminal_statuses().is_empty() {
            return Err(WorkflowError::InvalidDefinition(format!(
                "graph '{}' declares no terminal status",
                self.graph
            )));
        }

        let mut pairs = HashSet::new();
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !self.statuses.contains_key(endpoint) {
                    return Err(WorkflowError::InvalidDefinition(format!(
                        "edge {} -> {} references undefined status '{}'",
                        edge.from, edge.to, endpoint
                    )));
                }
            }
            if let Some(def) = self.statuses.get(&edge.from) {
                if def.terminal {
                    return Err(WorkflowError::InvalidDefinition(format!(
                        "edge {} -> {} leaves terminal status '{}'",
                        edge.from, edge.to, edge.from
                    )));
                }
            }
            if !pairs.insert((edge.from.as_str(), edge.to.as_str())) {
                return Err(WorkflowError::InvalidDefinition(format!(
                    "duplicate edge {} -> {}",
                    edge.from, edge.to
                )));
            }
            match edge.approval {
                ApprovalPolicy::AnyOf { required } if required == 0 => {
                    return Err(WorkflowError::InvalidDefinition(format!(
                        "edge {} -> {} declares a zero-approval quorum",
                        edge.from, edge.to
                    )));
                }
                ApprovalPolicy::None => {}
                _ if edge.approvers.is_empty() => {
                    return Err(WorkflowError::InvalidDefinition(format!(
                        "approval-gated edge {} -> {} declares no approver rules",
                        edge.from, edge.to
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Materialize this definition for a tenant. Returns the name-to-id
    /// mapping of the created statuses.
    pub async fn seed(
        &self,
        store: &dyn WorkflowStore,
        company_id: Uuid,
    ) -> WorkflowResult<SeededGraph> {
        self.validate()?;

        let mut ids: HashMap<String, Uuid> = HashMap::new();
        for (name, def) in &self.statuses {
            let mut status = Status::new(company_id, name.clone());
            status.is_initial = def.initial;
            status.is_final = def.terminal;
            ids.insert(name.clone(), status.status_id);
            store.insert_status(status).await?;
        }

        for def in &self.edges {
            // endpoints verified by validate() above
            let from = ids[&def.from];
            let to = ids[&def.to];
            let mut edge = TransitionEdge::new(company_id, from, to);
            edge.allowed_roles = def.roles.clone();
            edge.approval_policy = def.approval;
            edge.approver_rules = def.approvers.clone();
            edge.sla_hours = def.sla_hours;
            store.insert_edge(edge).await?;
        }

        let initial = self
            .initial_status()
            .and_then(|name| ids.get(name).copied())
            .ok_or_else(|| {
                WorkflowError::InvalidDefinition(format!(
                    "graph '{}' lost its initial status while seeding",
                    self.graph
                ))
            })?;

        Ok(SeededGraph {
            initial_status_id: initial,
            status_ids: ids,
        })
    }
}

/// Result of seeding a definition for one tenant.
#[derive(Debug, Clone)]
pub struct SeededGraph {
    pub initial_status_id: Uuid,
    pub status_ids: HashMap<String, Uuid>,
}

impl SeededGraph {
    /// Id of a seeded status by its definition name.
    pub fn status_id(&self, name: &str) -> Option<Uuid> {
        self.status_ids.get(name).copied()
    }
}

/// Loader for graph definitions
pub struct GraphLoader;

impl GraphLoader {
    /// Load all graph definitions from a directory
    pub fn load_from_dir(dir: &Path) -> WorkflowResult<HashMap<String, GraphDefinition>> {
        let mut definitions = HashMap::new();

        if !dir.exists() {
            return Ok(definitions);
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path
                .extension()
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false)
            {
                let content = std::fs::read_to_string(&path)?;
                let def: GraphDefinition = serde_yaml::from_str(&content)?;
                definitions.insert(def.graph.clone(), def);
            }
        }

        Ok(definitions)
    }

    /// Load a single graph definition from a file
    pub fn load_from_file(path: &Path) -> WorkflowResult<GraphDefinition> {
        let content = std::fs::read_to_string(path)?;
        let def: GraphDefinition = serde_yaml::from_str(&content)?;
        Ok(def)
    }

    /// Load from a YAML string
    pub fn load_from_str(yaml: &str) -> WorkflowResult<GraphDefinition> {
        let def: GraphDefinition = serde_yaml::from_str(yaml)?;
        Ok(def)
    }
}
