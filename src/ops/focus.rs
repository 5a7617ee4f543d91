use std::cmp::Ordering;
use std::collections::HashSet;

use crate::model::focus::{FocusCandidate, ReconcileResult};
use crate::model::operation::LabelOperation;
use crate::model::snapshot::Snapshot;

/// Every open task currently carrying `label`, in snapshot order
pub fn focus_candidates(snapshot: &Snapshot, label: &str) -> Vec<FocusCandidate> {
    snapshot
        .tasks
        .iter()
        .filter(|t| !t.completed && t.has_label(label))
        .map(FocusCandidate::from_task)
        .collect()
}

/// Total order used to pick a winner: most recently updated first, then the
/// highest numeric id, then the id string itself.
fn strength(a: &FocusCandidate, b: &FocusCandidate) -> Ordering {
    a.updated_at
        .cmp(&b.updated_at)
        .then(a.numeric_id.cmp(&b.numeric_id))
        .then_with(|| a.id.cmp(&b.id))
}

/// Decide which task keeps the singleton `label`.
///
/// A forced winner always wins; when it is not among the candidates it is
/// added to the label. `apply` is only echoed back in the result, the
/// operations are the same either way.
pub fn reconcile_focus(
    label: &str,
    candidates: &[FocusCandidate],
    forced_winner: Option<&str>,
    apply: bool,
) -> ReconcileResult {
    let mut seen = HashSet::new();
    let mut ranked: Vec<FocusCandidate> = candidates
        .iter()
        .filter(|c| seen.insert(c.id.as_str()))
        .cloned()
        .collect();
    ranked.sort_by(|a, b| strength(b, a));

    let mut added = None;
    let winner = match forced_winner {
        Some(id) => match ranked.iter().position(|c| c.id == id) {
            Some(pos) => Some(ranked.remove(pos)),
            None => {
                added = Some(LabelOperation::AddLabel {
                    task_id: id.to_string(),
                    label: label.to_string(),
                });
                Some(FocusCandidate::new(id, None))
            }
        },
        None if ranked.is_empty() => None,
        None => Some(ranked.remove(0)),
    };

    // Removals come first so the label is never on two tasks at once
    let mut operations: Vec<LabelOperation> = ranked
        .iter()
        .map(|loser| LabelOperation::RemoveLabel {
            task_id: loser.id.clone(),
            label: label.to_string(),
        })
        .collect();
    operations.extend(added);

    ReconcileResult {
        winner,
        losers: ranked,
        operations,
        applied: apply,
    }
}
