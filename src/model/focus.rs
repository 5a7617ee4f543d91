use chrono::{DateTime, Utc};
use serde::Serialize;

use super::operation::LabelOperation;
use super::snapshot::TaskRecord;

/// A task currently carrying the focus label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusCandidate {
    pub id: String,
    pub updated_at: Option<DateTime<Utc>>,
    /// Numeric form of the id, only used to break ties
    pub numeric_id: u64,
}

impl FocusCandidate {
    pub fn new(id: impl Into<String>, updated_at: Option<DateTime<Utc>>) -> Self {
        let id = id.into();
        let numeric_id = id.parse().unwrap_or(0);
        FocusCandidate {
            id,
            updated_at,
            numeric_id,
        }
    }

    pub fn from_task(task: &TaskRecord) -> Self {
        FocusCandidate::new(task.id.clone(), task.updated_at)
    }
}

/// Outcome of a focus reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    pub winner: Option<FocusCandidate>,
    /// Every other candidate, strongest first
    pub losers: Vec<FocusCandidate>,
    pub operations: Vec<LabelOperation>,
    /// True when the caller was asked to execute `operations`
    pub applied: bool,
}

impl ReconcileResult {
    pub fn is_noop(&self) -> bool {
        self.operations.is_empty()
    }
}
