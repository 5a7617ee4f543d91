use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::model::config::{ConfigError, EngineConfig};
use crate::model::operation::LabelOperation;
use crate::model::snapshot::Snapshot;
use crate::ops::check::Diagnostics;
use crate::ops::header::{project_headers, rename_op};
use crate::ops::propagate::active_set;
use crate::ops::resolve::resolve_hierarchy;

/// Result of one labeling pass over a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelPlan {
    /// Operations to reach the wanted state, in tree order
    pub operations: Vec<LabelOperation>,
    /// Ids of the tasks that should carry the next-action label
    pub active: Vec<String>,
    pub diagnostics: Diagnostics,
}

/// Compute the operations needed to bring the snapshot's labels and
/// checkable states in line with its tags, as of now.
pub fn compute_label_operations(
    snapshot: &Snapshot,
    config: &EngineConfig,
) -> Result<LabelPlan, ConfigError> {
    compute_label_operations_at(snapshot, config, Utc::now())
}

/// Same as [`compute_label_operations`] with an explicit clock.
///
/// Fails only on an invalid configuration. Structural problems in the
/// snapshot are reported in the plan's diagnostics and the affected
/// subtrees are left untouched.
pub fn compute_label_operations_at(
    snapshot: &Snapshot,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<LabelPlan, ConfigError> {
    config.validate()?;

    let resolved = resolve_hierarchy(snapshot, config);
    let tree = &resolved.tree;
    let headers = project_headers(tree);

    let mut active = vec![false; tree.len()];
    if config.next_action_label.is_some() {
        for id in active_set(tree, &headers, config, now) {
            active[id.0] = true;
        }
    }

    let mut plan = LabelPlan {
        diagnostics: resolved.diagnostics.clone(),
        ..Default::default()
    };
    for id in tree.preorder() {
        let node = tree.node(id);
        if let Some(op) = headers.conversion(tree, id) {
            plan.operations.push(op);
        }
        if let Some(op) = rename_op(node, config) {
            plan.operations.push(op);
        }
        let Some(label) = config.next_action_label.as_deref() else {
            continue;
        };
        if !node.kind.is_task() {
            continue;
        }
        if active[id.0] {
            plan.active.push(node.source_id.clone());
        }
        match (active[id.0], node.has_label(label)) {
            (true, false) => plan.operations.push(LabelOperation::AddLabel {
                task_id: node.source_id.clone(),
                label: label.to_string(),
            }),
            (false, true) => plan.operations.push(LabelOperation::RemoveLabel {
                task_id: node.source_id.clone(),
                label: label.to_string(),
            }),
            _ => {}
        }
    }

    debug!(
        nodes = tree.len(),
        active = plan.active.len(),
        operations = plan.operations.len(),
        "computed label plan"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::operation::ItemRef;
    use crate::model::snapshot::{ProjectRecord, TaskRecord};
    use crate::model::tag::NodeKind;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()
    }

    fn task(id: &str, name: &str, labels: &[&str]) -> TaskRecord {
        TaskRecord {
            id: id.into(),
            name: name.into(),
            project_id: "p".into(),
            section_id: None,
            parent_id: None,
            due: None,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            updated_at: None,
            subtask_ids: vec![],
            checkable: true,
            completed: false,
        }
    }

    fn snapshot(project: &str, tasks: Vec<TaskRecord>) -> Snapshot {
        Snapshot {
            projects: vec![ProjectRecord {
                id: "p".into(),
                name: project.into(),
                is_inbox: false,
                section_ids: vec![],
                task_ids: vec![],
            }],
            tasks,
            ..Default::default()
        }
    }

    fn add(id: &str) -> LabelOperation {
        LabelOperation::AddLabel {
            task_id: id.into(),
            label: "next_action".into(),
        }
    }

    fn remove(id: &str) -> LabelOperation {
        LabelOperation::RemoveLabel {
            task_id: id.into(),
            label: "next_action".into(),
        }
    }

    #[test]
    fn adds_and_removes_against_current_labels() {
        let s = snapshot(
            "Work -",
            vec![task("1", "First", &[]), task("2", "Second", &["next_action"])],
        );
        let plan = compute_label_operations_at(&s, &EngineConfig::default(), now()).unwrap();
        assert_eq!(plan.operations, vec![add("1"), remove("2")]);
        assert_eq!(plan.active, vec!["1"]);
    }

    #[test]
    fn already_correct_is_empty() {
        let s = snapshot(
            "Work -",
            vec![task("1", "First", &["next_action"]), task("2", "Second", &[])],
        );
        let plan = compute_label_operations_at(&s, &EngineConfig::default(), now()).unwrap();
        assert!(plan.operations.is_empty());
    }

    #[test]
    fn completed_task_loses_label() {
        let mut done = task("1", "Done", &["next_action"]);
        done.completed = true;
        let s = snapshot("Work -", vec![done, task("2", "Next", &[])]);
        let plan = compute_label_operations_at(&s, &EngineConfig::default(), now()).unwrap();
        assert_eq!(plan.operations, vec![remove("1"), add("2")]);
    }

    #[test]
    fn invalid_config_is_fatal() {
        let config = EngineConfig {
            parallel_suffix: '-',
            ..Default::default()
        };
        let s = snapshot("Work -", vec![task("1", "First", &[])]);
        assert_eq!(
            compute_label_operations_at(&s, &config, now()),
            Err(ConfigError::IdenticalSuffixes('-'))
        );
    }

    #[test]
    fn oversized_horizon_still_labels() {
        let mut due_soon = task("1", "First", &[]);
        due_soon.due = Some(crate::model::snapshot::DueDate::DateTime(
            now() + chrono::Duration::days(1),
        ));
        let config = EngineConfig {
            hide_future_days: 200_000_000,
            ..Default::default()
        };
        let plan = compute_label_operations_at(&snapshot("Work -", vec![due_soon]), &config, now())
            .unwrap();
        assert_eq!(plan.operations, vec![add("1")]);
    }

    #[test]
    fn no_label_configured_only_projects_headers() {
        let config = EngineConfig {
            next_action_label: None,
            ..Default::default()
        };
        let s = snapshot("Work -", vec![task("1", "** Notes", &["next_action"])]);
        let plan = compute_label_operations_at(&s, &config, now()).unwrap();
        assert_eq!(
            plan.operations,
            vec![
                LabelOperation::ConvertToHeader { task_id: "1".into() },
                LabelOperation::Rename {
                    item: ItemRef {
                        kind: NodeKind::Task,
                        id: "1".into()
                    },
                    name: "Notes".into()
                },
            ]
        );
    }

    #[test]
    fn header_conversion_precedes_label_removal() {
        let s = snapshot(
            "Work -",
            vec![task("1", "Notes **", &["next_action"]), task("2", "Real", &[])],
        );
        let plan = compute_label_operations_at(&s, &EngineConfig::default(), now()).unwrap();
        assert_eq!(
            plan.operations,
            vec![
                LabelOperation::ConvertToHeader { task_id: "1".into() },
                LabelOperation::Rename {
                    item: ItemRef {
                        kind: NodeKind::Task,
                        id: "1".into()
                    },
                    name: "Notes".into()
                },
                remove("1"),
                add("2"),
            ]
        );
    }

    #[test]
    fn structural_errors_do_not_stop_the_pass() {
        let mut orphan = task("9", "Orphan", &["next_action"]);
        orphan.parent_id = Some("404".into());
        let s = snapshot("Work -", vec![orphan, task("1", "Fine", &[])]);
        let plan = compute_label_operations_at(&s, &EngineConfig::default(), now()).unwrap();
        assert_eq!(plan.operations, vec![add("1")]);
        assert_eq!(plan.diagnostics.errors.len(), 1);
    }
}
