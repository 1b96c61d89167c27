//! SLA Evaluation
//!
//! Whether a committed transition happened inside its edge's hour budget.
//! Purely observational: an overdue move is reported and logged, never
//! blocked.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Outcome of evaluating one committed transition against its edge's SLA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlaOutcome {
    OnTime,
    Overdue {
        /// Whole hours past the deadline.
        exceeded_hours: i64,
    },
    /// The edge carries no SLA.
    NoSla,
}

#[derive(Debug, Default)]
pub struct SlaMonitor;

impl SlaMonitor {
    /// Pure function of when the document entered the source status, the
    /// edge's hour budget, and when the transition committed.
    pub fn evaluate(
        &self,
        since: DateTime<Utc>,
        sla_hours: Option<u32>,
        committed_at: DateTime<Utc>,
    ) -> SlaOutcome {
        let Some(hours) = sla_hours else {
            return SlaOutcome::NoSla;
        };
        let deadline = since + Duration::hours(i64::from(hours));
        if committed_at <= deadline {
            SlaOutcome::OnTime
        } else {
            SlaOutcome::Overdue {
                exceeded_hours: (committed_at - deadline).num_hours(),
            }
        }
    }
}
