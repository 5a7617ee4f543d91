use serde::Serialize;

use crate::model::config::EngineConfig;
use crate::model::snapshot::Snapshot;
use crate::model::tag::NodeKind;
use crate::ops::resolve::resolve_hierarchy;

/// Non-fatal findings produced while building the hierarchy.
/// Returned alongside partial results, never instead of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub errors: Vec<StructuralError>,
    pub warnings: Vec<TagWarning>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// The snapshot references something that does not exist. The affected
/// subtree is dropped from the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuralError {
    /// A section or task names a project that is not in the snapshot
    MissingProject {
        kind: NodeKind,
        id: String,
        project_id: String,
    },
    /// A parentless task names a section that is not in the snapshot
    MissingSection { task_id: String, section_id: String },
    /// A parentless task's section belongs to another project
    SectionProjectMismatch {
        task_id: String,
        section_id: String,
        project_id: String,
    },
    /// A subtask names a parent that is not in the snapshot
    MissingParent { task_id: String, parent_id: String },
    /// A parent's ordered child list names an id that does not exist
    DanglingChild {
        parent_kind: NodeKind,
        parent_id: String,
        child_id: String,
    },
    /// The same id appears twice; the later record is ignored
    DuplicateId { kind: NodeKind, id: String },
    /// Following parent links from this task loops back on itself
    ParentCycle { task_id: String },
}

impl std::fmt::Display for StructuralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructuralError::MissingProject {
                kind,
                id,
                project_id,
            } => write!(f, "{} {} references missing project {}", kind, id, project_id),
            StructuralError::MissingSection {
                task_id,
                section_id,
            } => write!(f, "task {} references missing section {}", task_id, section_id),
            StructuralError::SectionProjectMismatch {
                task_id,
                section_id,
                project_id,
            } => write!(
                f,
                "task {} is in project {} but its section {} is not",
                task_id, project_id, section_id
            ),
            StructuralError::MissingParent { task_id, parent_id } => {
                write!(f, "task {} references missing parent {}", task_id, parent_id)
            }
            StructuralError::DanglingChild {
                parent_kind,
                parent_id,
                child_id,
            } => write!(
                f,
                "{} {} lists missing child {}",
                parent_kind, parent_id, child_id
            ),
            StructuralError::DuplicateId { kind, id } => write!(f, "duplicate {} id {}", kind, id),
            StructuralError::ParentCycle { task_id } => {
                write!(f, "task {} is part of a parent cycle", task_id)
            }
        }
    }
}

/// A name whose markers were ambiguous and got resolved by precedence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagWarning {
    pub kind: NodeKind,
    pub id: String,
    pub name: String,
    pub detail: String,
}

impl std::fmt::Display for TagWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {:?}: {}", self.kind, self.id, self.name, self.detail)
    }
}

/// Validate a snapshot without computing any operations.
///
/// This is a read-only operation.
pub fn check_snapshot(snapshot: &Snapshot, config: &EngineConfig) -> Diagnostics {
    resolve_hierarchy(snapshot, config).diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::snapshot::{ProjectRecord, SectionRecord, TaskRecord};

    fn task(id: &str, project: &str) -> TaskRecord {
        TaskRecord {
            id: id.into(),
            name: format!("Task {}", id),
            project_id: project.into(),
            section_id: None,
            parent_id: None,
            due: None,
            labels: vec![],
            updated_at: None,
            subtask_ids: vec![],
            checkable: true,
            completed: false,
        }
    }

    fn project(id: &str, name: &str) -> ProjectRecord {
        ProjectRecord {
            id: id.into(),
            name: name.into(),
            is_inbox: false,
            section_ids: vec![],
            task_ids: vec![],
        }
    }

    #[test]
    fn clean_snapshot_has_no_findings() {
        let snapshot = Snapshot {
            projects: vec![project("p", "Work -")],
            tasks: vec![task("1", "p")],
            ..Default::default()
        };
        assert!(check_snapshot(&snapshot, &EngineConfig::default()).is_clean());
    }

    #[test]
    fn reports_each_broken_reference_once() {
        let mut orphan = task("2", "p");
        orphan.parent_id = Some("404".into());
        let mut child_of_orphan = task("3", "p");
        child_of_orphan.parent_id = Some("2".into());
        let mut lost_section = task("4", "p");
        lost_section.section_id = Some("s404".into());

        let snapshot = Snapshot {
            projects: vec![project("p", "Work -")],
            sections: vec![SectionRecord {
                id: "s".into(),
                name: "Gone".into(),
                project_id: "p404".into(),
                task_ids: vec![],
            }],
            tasks: vec![task("1", "nope"), orphan, child_of_orphan, lost_section],
            ..Default::default()
        };
        let diag = check_snapshot(&snapshot, &EngineConfig::default());
        assert_eq!(diag.errors.len(), 4);
        assert!(diag.errors.contains(&StructuralError::MissingParent {
            task_id: "2".into(),
            parent_id: "404".into()
        }));
        assert!(diag.errors.contains(&StructuralError::MissingSection {
            task_id: "4".into(),
            section_id: "s404".into()
        }));
        assert!(diag.errors.iter().any(|e| matches!(
            e,
            StructuralError::MissingProject { kind: NodeKind::Section, .. }
        )));
        assert!(diag.errors.iter().any(|e| matches!(
            e,
            StructuralError::MissingProject { kind: NodeKind::Task, id, .. } if id == "1"
        )));
    }

    #[test]
    fn section_from_another_project_is_reported_and_dropped() {
        let mut stray = task("1", "p");
        stray.section_id = Some("s".into());
        let snapshot = Snapshot {
            projects: vec![project("p", "Work -"), project("q", "Home -")],
            sections: vec![SectionRecord {
                id: "s".into(),
                name: "Errands".into(),
                project_id: "q".into(),
                task_ids: vec![],
            }],
            tasks: vec![stray, task("2", "p")],
            ..Default::default()
        };
        let resolved = resolve_hierarchy(&snapshot, &EngineConfig::default());
        assert_eq!(
            resolved.diagnostics.errors,
            vec![StructuralError::SectionProjectMismatch {
                task_id: "1".into(),
                section_id: "s".into(),
                project_id: "p".into(),
            }]
        );
        assert!(resolved.tree.task("1").is_none());
        assert!(resolved.tree.task("2").is_some());
    }

    #[test]
    fn tag_ambiguity_is_a_warning() {
        let mut t = task("1", "p");
        t.name = "-* Both **".into();
        let snapshot = Snapshot {
            projects: vec![project("p", "Work -")],
            tasks: vec![t],
            ..Default::default()
        };
        let diag = check_snapshot(&snapshot, &EngineConfig::default());
        assert!(diag.errors.is_empty());
        assert_eq!(diag.warnings.len(), 1);
        assert_eq!(diag.warnings[0].id, "1");
    }

    #[test]
    fn diagnostics_serialize_with_type_tag() {
        let diag = Diagnostics {
            errors: vec![StructuralError::ParentCycle {
                task_id: "9".into(),
            }],
            warnings: vec![],
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["errors"][0]["type"], "parent_cycle");
    }
}
