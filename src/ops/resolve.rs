use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::model::config::EngineConfig;
use crate::model::node::{Hierarchy, HierarchyNode, NodeId};
use crate::model::snapshot::{ProjectRecord, SectionRecord, Snapshot, TaskRecord};
use crate::model::tag::{LEVEL_COUNT, Mode, NodeKind, TagSpec};
use crate::ops::check::{Diagnostics, StructuralError, TagWarning};
use crate::parse::{TagSyntax, parse_name};

/// Modes inherited from ancestors, one slot per level
type Levels = [Option<Mode>; LEVEL_COUNT];

/// The resolved tree plus everything found wrong while building it
#[derive(Debug, Clone)]
pub struct Resolved {
    pub tree: Hierarchy,
    pub diagnostics: Diagnostics,
}

/// Build the Project → Section → Task → Subtask tree for one pass.
///
/// Every node's effective mode is resolved on the way down: a node's own tag
/// overrides the modes its ancestors assigned for each level, and the node's
/// effective mode is whatever ends up on its children's level. Children are
/// never consulted. Records with broken references are reported and dropped
/// along with their subtree; inbox projects are skipped without a report.
pub fn resolve_hierarchy(snapshot: &Snapshot, config: &EngineConfig) -> Resolved {
    let mut builder = Builder::new(TagSyntax::from(config));
    builder.index(snapshot);
    builder.classify();
    builder.build();
    builder.detect_cycles();
    Resolved {
        tree: builder.tree,
        diagnostics: builder.diagnostics,
    }
}

trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for TaskRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for SectionRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Order `members` by their position in `listed`; unlisted members follow
/// in snapshot order.
fn in_listed_order<'r, T: Keyed>(listed: &[String], members: Vec<&'r T>) -> Vec<&'r T> {
    let index: HashMap<&'r str, usize> = members
        .iter()
        .enumerate()
        .map(|(i, &m)| (m.key(), i))
        .collect();
    let mut slots: Vec<Option<&'r T>> = members.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(slots.len());
    for id in listed {
        if let Some(member) = index.get(id.as_str()).and_then(|&i| slots[i].take()) {
            out.push(member);
        }
    }
    out.extend(slots.into_iter().flatten());
    out
}

fn non_empty(id: &Option<String>) -> Option<&str> {
    id.as_deref().filter(|s| !s.is_empty())
}

struct Builder<'a> {
    syntax: TagSyntax<'a>,
    tree: Hierarchy,
    diagnostics: Diagnostics,
    projects: IndexMap<&'a str, &'a ProjectRecord>,
    sections: IndexMap<&'a str, &'a SectionRecord>,
    tasks: IndexMap<&'a str, &'a TaskRecord>,
    inbox: HashSet<&'a str>,
    sections_by_project: HashMap<&'a str, Vec<&'a SectionRecord>>,
    sectionless_by_project: HashMap<&'a str, Vec<&'a TaskRecord>>,
    parentless_by_section: HashMap<&'a str, Vec<&'a TaskRecord>>,
    children_by_parent: HashMap<&'a str, Vec<&'a TaskRecord>>,
    /// Tasks that got a structural error of their own
    reported: HashSet<&'a str>,
}

impl<'a> Builder<'a> {
    fn new(syntax: TagSyntax<'a>) -> Self {
        Builder {
            syntax,
            tree: Hierarchy::default(),
            diagnostics: Diagnostics::default(),
            projects: IndexMap::new(),
            sections: IndexMap::new(),
            tasks: IndexMap::new(),
            inbox: HashSet::new(),
            sections_by_project: HashMap::new(),
            sectionless_by_project: HashMap::new(),
            parentless_by_section: HashMap::new(),
            children_by_parent: HashMap::new(),
            reported: HashSet::new(),
        }
    }

    fn error(&mut self, error: StructuralError) {
        tracing::warn!(%error, "structural integrity error");
        self.diagnostics.errors.push(error);
    }

    // -----------------------------------------------------------------------
    // Indexing
    // -----------------------------------------------------------------------

    fn index(&mut self, snapshot: &'a Snapshot) {
        for project in &snapshot.projects {
            if self.projects.contains_key(project.id.as_str()) {
                self.error(StructuralError::DuplicateId {
                    kind: NodeKind::Project,
                    id: project.id.clone(),
                });
                continue;
            }
            if project.is_inbox {
                self.inbox.insert(&project.id);
            }
            self.projects.insert(&project.id, project);
        }
        for section in &snapshot.sections {
            if self.sections.contains_key(section.id.as_str()) {
                self.error(StructuralError::DuplicateId {
                    kind: NodeKind::Section,
                    id: section.id.clone(),
                });
                continue;
            }
            self.sections.insert(&section.id, section);
        }
        for task in &snapshot.tasks {
            if self.tasks.contains_key(task.id.as_str()) {
                self.error(StructuralError::DuplicateId {
                    kind: NodeKind::Task,
                    id: task.id.clone(),
                });
                continue;
            }
            self.tasks.insert(&task.id, task);
        }
    }

    /// Sort every record under the parent its foreign keys name
    fn classify(&mut self) {
        let sections: Vec<&'a SectionRecord> = self.sections.values().copied().collect();
        for section in sections {
            let project_id = section.project_id.as_str();
            if self.inbox.contains(project_id) {
                continue;
            }
            if !self.projects.contains_key(project_id) {
                self.error(StructuralError::MissingProject {
                    kind: NodeKind::Section,
                    id: section.id.clone(),
                    project_id: section.project_id.clone(),
                });
                continue;
            }
            self.sections_by_project
                .entry(project_id)
                .or_default()
                .push(section);
        }

        let tasks: Vec<&'a TaskRecord> = self.tasks.values().copied().collect();
        for task in tasks {
            if self.inbox.contains(task.project_id.as_str()) {
                continue;
            }
            if let Some(parent_id) = non_empty(&task.parent_id) {
                if self.tasks.contains_key(parent_id) {
                    self.children_by_parent
                        .entry(parent_id)
                        .or_default()
                        .push(task);
                } else {
                    self.reported.insert(&task.id);
                    self.error(StructuralError::MissingParent {
                        task_id: task.id.clone(),
                        parent_id: parent_id.to_string(),
                    });
                }
                continue;
            }
            if !self.projects.contains_key(task.project_id.as_str()) {
                self.reported.insert(&task.id);
                self.error(StructuralError::MissingProject {
                    kind: NodeKind::Task,
                    id: task.id.clone(),
                    project_id: task.project_id.clone(),
                });
                continue;
            }
            match non_empty(&task.section_id) {
                Some(section_id) if self.sections.contains_key(section_id) => {
                    let owner = self.sections[section_id].project_id.as_str();
                    if owner != task.project_id {
                        self.reported.insert(&task.id);
                        self.error(StructuralError::SectionProjectMismatch {
                            task_id: task.id.clone(),
                            section_id: section_id.to_string(),
                            project_id: task.project_id.clone(),
                        });
                        continue;
                    }
                    self.parentless_by_section
                        .entry(section_id)
                        .or_default()
                        .push(task);
                }
                Some(section_id) => {
                    self.reported.insert(&task.id);
                    self.error(StructuralError::MissingSection {
                        task_id: task.id.clone(),
                        section_id: section_id.to_string(),
                    });
                }
                None => {
                    self.sectionless_by_project
                        .entry(&task.project_id)
                        .or_default()
                        .push(task);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tree construction
    // -----------------------------------------------------------------------

    fn build(&mut self) {
        let projects: Vec<&'a ProjectRecord> = self.projects.values().copied().collect();
        for project in projects {
            if project.is_inbox {
                continue;
            }
            self.add_project(project);
        }
    }

    fn add_project(&mut self, project: &'a ProjectRecord) {
        let (id, levels) = self.push_parsed(
            NodeKind::Project,
            &project.id,
            &project.name,
            None,
            [None; LEVEL_COUNT],
            None,
        );
        self.tree.roots.push(id);

        for listed in &project.section_ids {
            if !self.sections.contains_key(listed.as_str()) {
                self.error(StructuralError::DanglingChild {
                    parent_kind: NodeKind::Project,
                    parent_id: project.id.clone(),
                    child_id: listed.clone(),
                });
            }
        }
        self.report_dangling_tasks(NodeKind::Project, &project.id, &project.task_ids);

        // Sectionless tasks sit in an implicit section ahead of the real ones
        let sectionless = self
            .sectionless_by_project
            .remove(project.id.as_str())
            .unwrap_or_default();
        if !sectionless.is_empty() {
            let section = self.push_node(
                HierarchyNode {
                    source_id: String::new(),
                    kind: NodeKind::Section,
                    display_name: String::new(),
                    raw_name: String::new(),
                    tag: TagSpec::default(),
                    consumed_name: None,
                    effective_mode: levels[NodeKind::Section.child_level()].unwrap_or(Mode::Unset),
                    due: None,
                    labels: Vec::new(),
                    updated_at: None,
                    checkable: true,
                    completed: false,
                    children: Vec::new(),
                    parent: Some(id),
                    implicit: true,
                },
            );
            for task in in_listed_order(&project.task_ids, sectionless) {
                self.add_task(task, section, NodeKind::Task, levels);
            }
        }

        let sections = self
            .sections_by_project
            .remove(project.id.as_str())
            .unwrap_or_default();
        for section in in_listed_order(&project.section_ids, sections) {
            self.add_section(section, id, levels);
        }
    }

    fn add_section(&mut self, section: &'a SectionRecord, parent: NodeId, inherited: Levels) {
        let (id, levels) = self.push_parsed(
            NodeKind::Section,
            &section.id,
            &section.name,
            None,
            inherited,
            Some(parent),
        );
        self.report_dangling_tasks(NodeKind::Section, &section.id, &section.task_ids);

        let tasks = self
            .parentless_by_section
            .remove(section.id.as_str())
            .unwrap_or_default();
        for task in in_listed_order(&section.task_ids, tasks) {
            self.add_task(task, id, NodeKind::Task, levels);
        }
    }

    fn add_task(&mut self, task: &'a TaskRecord, parent: NodeId, kind: NodeKind, inherited: Levels) {
        let (id, levels) = self.push_parsed(
            kind,
            &task.id,
            &task.name,
            Some(task),
            inherited,
            Some(parent),
        );
        self.tree.tasks.insert(task.id.clone(), id);
        self.report_dangling_tasks(kind, &task.id, &task.subtask_ids);

        let children = self
            .children_by_parent
            .remove(task.id.as_str())
            .unwrap_or_default();
        for child in in_listed_order(&task.subtask_ids, children) {
            self.add_task(child, id, NodeKind::Subtask, levels);
        }
    }

    /// Parse a name, resolve the node's effective mode and push it.
    /// Returns the new node and the levels its children inherit.
    fn push_parsed(
        &mut self,
        kind: NodeKind,
        source_id: &str,
        raw_name: &str,
        task: Option<&TaskRecord>,
        inherited: Levels,
        parent: Option<NodeId>,
    ) -> (NodeId, Levels) {
        let parsed = parse_name(raw_name, kind, &self.syntax);
        for issue in &parsed.issues {
            self.diagnostics.warnings.push(TagWarning {
                kind,
                id: source_id.to_string(),
                name: raw_name.to_string(),
                detail: issue.to_string(),
            });
        }

        let own_level = kind.child_level();
        let mut levels = inherited;
        for (level, slot) in levels.iter_mut().enumerate().skip(own_level) {
            if let Some(mode) = parsed.tag.mode_for_level(own_level, level) {
                *slot = Some(mode);
            }
        }
        let effective_mode = levels[own_level].unwrap_or(Mode::Unset);

        if !parsed.tag.modes.is_empty() {
            debug!(
                %kind,
                id = source_id,
                name = %parsed.display_name,
                type_str = %parsed.tag.type_string(kind),
                "identified tag"
            );
        }

        let node = HierarchyNode {
            source_id: source_id.to_string(),
            kind,
            display_name: parsed.display_name,
            raw_name: raw_name.to_string(),
            tag: parsed.tag,
            consumed_name: parsed.consumed_name,
            effective_mode,
            due: task.and_then(|t| t.due),
            labels: task.map(|t| t.labels.clone()).unwrap_or_default(),
            updated_at: task.and_then(|t| t.updated_at),
            checkable: task.is_none_or(|t| t.checkable),
            completed: task.is_some_and(|t| t.completed),
            children: Vec::new(),
            parent,
            implicit: false,
        };
        (self.push_node(node), levels)
    }

    fn push_node(&mut self, node: HierarchyNode) -> NodeId {
        let id = NodeId(self.tree.nodes.len());
        if let Some(parent) = node.parent {
            self.tree.nodes[parent.0].children.push(id);
        }
        self.tree.nodes.push(node);
        id
    }

    fn report_dangling_tasks(&mut self, parent_kind: NodeKind, parent_id: &str, listed: &[String]) {
        for child in listed {
            if !self.tasks.contains_key(child.as_str()) {
                self.error(StructuralError::DanglingChild {
                    parent_kind,
                    parent_id: parent_id.to_string(),
                    child_id: child.clone(),
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Leftovers
    // -----------------------------------------------------------------------

    /// Report subtasks that were never placed because their parent chain loops
    fn detect_cycles(&mut self) {
        let mut in_cycle: HashSet<&'a str> = HashSet::new();
        let unplaced: Vec<&'a TaskRecord> = self
            .tasks
            .values()
            .copied()
            .filter(|t| !self.tree.tasks.contains_key(t.id.as_str()))
            .filter(|t| !self.inbox.contains(t.project_id.as_str()))
            .collect();

        for task in unplaced {
            if in_cycle.contains(task.id.as_str()) || self.reported.contains(task.id.as_str()) {
                continue;
            }
            let mut path: Vec<&'a str> = vec![task.id.as_str()];
            let mut current = task;
            let cycle_start = loop {
                let Some(parent_id) = non_empty(&current.parent_id) else {
                    break None;
                };
                if self.reported.contains(parent_id) || in_cycle.contains(parent_id) {
                    break None;
                }
                let Some(parent) = self.tasks.get(parent_id).copied() else {
                    break None;
                };
                if let Some(pos) = path.iter().position(|id| *id == parent.id) {
                    break Some(pos);
                }
                path.push(parent.id.as_str());
                current = parent;
            };
            if let Some(pos) = cycle_start {
                in_cycle.extend(path[pos..].iter().copied());
                self.error(StructuralError::ParentCycle {
                    task_id: path[pos].to_string(),
                });
            }
        }
    }
}
