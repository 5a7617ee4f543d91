use regex::Regex;
use serde::Serialize;

use crate::model::config::EngineConfig;
use crate::model::snapshot::{DueDate, Snapshot, TaskRecord};
use crate::model::tag::NodeKind;
use crate::parse::{TagSyntax, parse_name};

/// Which open tasks to list
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Only tasks carrying this label
    pub label: Option<String>,
    /// Only tasks whose display name matches
    pub contains: Option<Regex>,
}

/// One open task with the names of the items it sits in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRow {
    pub id: String,
    pub name: String,
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DueDate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub next_action: bool,
    pub focus: bool,
    pub depth: usize,
}

/// List open tasks in snapshot order. Names are shown without tag characters.
pub fn list_tasks(snapshot: &Snapshot, filter: &TaskFilter, config: &EngineConfig) -> Vec<TaskRow> {
    let syntax = TagSyntax::from(config);
    let display = |raw: &str, kind: NodeKind| parse_name(raw, kind, &syntax).display_name;

    let mut rows = Vec::new();
    for task in snapshot.tasks.iter().filter(|t| !t.completed) {
        if let Some(label) = &filter.label
            && !task.has_label(label)
        {
            continue;
        }
        let depth = depth_of(snapshot, task);
        let kind = if depth == 0 {
            NodeKind::Task
        } else {
            NodeKind::Subtask
        };
        let name = display(&task.name, kind);
        if let Some(re) = &filter.contains
            && !re.is_match(&name)
        {
            continue;
        }

        let project = snapshot
            .project(&task.project_id)
            .map(|p| display(&p.name, NodeKind::Project))
            .unwrap_or_else(|| task.project_id.clone());
        let section = task
            .section_id
            .as_deref()
            .and_then(|id| snapshot.section(id))
            .map(|s| display(&s.name, NodeKind::Section));
        let has = |label: &Option<String>| label.as_deref().is_some_and(|l| task.has_label(l));

        rows.push(TaskRow {
            id: task.id.clone(),
            name,
            project,
            section,
            due: task.due,
            labels: task.labels.clone(),
            next_action: has(&config.next_action_label),
            focus: has(&config.focus_label),
            depth,
        });
    }
    rows
}

/// Number of parent links above a task; stops at missing parents and loops
fn depth_of(snapshot: &Snapshot, task: &TaskRecord) -> usize {
    let mut depth = 0;
    let mut current = task;
    while let Some(parent_id) = current.parent_id.as_deref().filter(|p| !p.is_empty()) {
        let Some(parent) = snapshot.task(parent_id) else {
            break;
        };
        depth += 1;
        if depth > snapshot.tasks.len() {
            break;
        }
        current = parent;
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::snapshot::{ProjectRecord, SectionRecord};

    fn task(id: &str, name: &str, labels: &[&str]) -> TaskRecord {
        TaskRecord {
            id: id.into(),
            name: name.into(),
            project_id: "p".into(),
            section_id: Some("s".into()),
            parent_id: None,
            due: None,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            updated_at: None,
            subtask_ids: vec![],
            checkable: true,
            completed: false,
        }
    }

    fn sample() -> Snapshot {
        let mut done = task("3", "Finished", &["next_action"]);
        done.completed = true;
        let mut child = task("4", "Call plumber", &[]);
        child.parent_id = Some("1".into());
        Snapshot {
            projects: vec![ProjectRecord {
                id: "p".into(),
                name: "Home =".into(),
                is_inbox: false,
                section_ids: vec![],
                task_ids: vec![],
            }],
            sections: vec![SectionRecord {
                id: "s".into(),
                name: "Repairs -".into(),
                project_id: "p".into(),
                task_ids: vec![],
            }],
            tasks: vec![
                task("1", "Fix sink -", &["next_action"]),
                task("2", "Paint fence", &["focus"]),
                done,
                child,
            ],
            ..Default::default()
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            focus_label: Some("focus".into()),
            ..Default::default()
        }
    }

    #[test]
    fn lists_open_tasks_with_clean_names() {
        let rows = list_tasks(&sample(), &TaskFilter::default(), &config());
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Fix sink", "Paint fence", "Call plumber"]);
        assert_eq!(rows[0].project, "Home");
        assert_eq!(rows[0].section.as_deref(), Some("Repairs"));
        assert!(rows[0].next_action);
        assert!(rows[1].focus);
        assert_eq!(rows[2].depth, 1);
    }

    #[test]
    fn filters_by_label_and_pattern() {
        let filter = TaskFilter {
            label: Some("focus".into()),
            contains: None,
        };
        let rows = list_tasks(&sample(), &filter, &config());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "2");

        let filter = TaskFilter {
            label: None,
            contains: Some(Regex::new("(?i)^call").unwrap()),
        };
        let rows = list_tasks(&sample(), &filter, &config());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "4");
    }
}
