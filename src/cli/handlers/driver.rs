use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::io::history::HistoryStore;
use crate::io::store::{ApplyReport, SnapshotStore, StoreError};
use crate::model::config::{ConfigError, EngineConfig};
use crate::model::focus::ReconcileResult;
use crate::ops::engine::{LabelPlan, compute_label_operations_at};
use crate::ops::focus::{focus_candidates, reconcile_focus};

/// Fresh fetches attempted before giving up on a store that keeps moving
pub const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("snapshot kept changing; gave up after {0} attempts")]
    GaveUp(usize),
    #[error("no focus label configured (set labels.focus or --focus-label)")]
    NoFocusLabel,
    #[error("no open task with id {0}")]
    UnknownWinner(String),
}

/// Outcome of one read-decide-write pass
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub attempts: usize,
    pub plan: LabelPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<ReconcileResult>,
    pub report: ApplyReport,
}

/// Fetch, compute and apply once, starting over from a fresh snapshot when
/// the store moved underneath us.
///
/// Label operations and focus reconciliation go out as one batch against
/// the revision they were computed from.
pub fn run_pass(
    store: &dyn SnapshotStore,
    history: Option<&HistoryStore>,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<PassSummary, DriverError> {
    for attempt in 1..=MAX_ATTEMPTS {
        let snapshot = store.fetch()?;
        let plan = compute_label_operations_at(&snapshot, config, now)?;
        let focus = config.focus_label.as_deref().map(|label| {
            reconcile_focus(label, &focus_candidates(&snapshot, label), None, true)
        });

        let mut operations = plan.operations.clone();
        if let Some(focus) = &focus {
            operations.extend(focus.operations.iter().cloned());
        }

        match store.apply(&operations, snapshot.revision) {
            Ok(report) => {
                if let (Some(history), Some(focus), Some(label)) =
                    (history, &focus, config.focus_label.as_deref())
                {
                    history.record_reconcile(label, focus, now, "run")?;
                }
                info!(
                    attempt,
                    active = plan.active.len(),
                    applied = report.applied,
                    failed = report.failures.len(),
                    errors = plan.diagnostics.errors.len(),
                    "pass complete"
                );
                return Ok(PassSummary {
                    attempts: attempt,
                    plan,
                    focus,
                    report,
                });
            }
            Err(StoreError::Stale { expected, found }) => {
                warn!(attempt, expected, found, "snapshot changed during pass, recomputing");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(DriverError::GaveUp(MAX_ATTEMPTS))
}

/// Reconcile the focus label on demand.
///
/// Preview computes from a fresh snapshot and writes nothing. Apply is the
/// same read-decide-write unit as a periodic pass.
pub fn focus_once(
    store: &dyn SnapshotStore,
    history: Option<&HistoryStore>,
    config: &EngineConfig,
    forced_winner: Option<&str>,
    apply: bool,
    now: DateTime<Utc>,
) -> Result<(ReconcileResult, Option<ApplyReport>), DriverError> {
    let label = config.focus_label.as_deref().ok_or(DriverError::NoFocusLabel)?;
    for attempt in 1..=MAX_ATTEMPTS {
        let snapshot = store.fetch()?;
        if let Some(id) = forced_winner
            && !snapshot.task(id).is_some_and(|t| !t.completed)
        {
            return Err(DriverError::UnknownWinner(id.to_string()));
        }
        let result = reconcile_focus(label, &focus_candidates(&snapshot, label), forced_winner, apply);
        if !apply {
            return Ok((result, None));
        }
        match store.apply(&result.operations, snapshot.revision) {
            Ok(report) => {
                if let Some(history) = history {
                    history.record_reconcile(label, &result, now, "focus")?;
                }
                return Ok((result, Some(report)));
            }
            Err(StoreError::Stale { expected, found }) => {
                warn!(attempt, expected, found, "snapshot changed during focus, recomputing");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(DriverError::GaveUp(MAX_ATTEMPTS))
}
