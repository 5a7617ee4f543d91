use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::snapshot::DueDate;
use super::tag::{Mode, NodeKind, TagSpec};

/// Index of a node in a [`Hierarchy`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// One project, section or task in the resolved tree
#[derive(Debug, Clone)]
pub struct HierarchyNode {
    /// Id in the task service. Empty for the implicit section that holds a
    /// project's sectionless tasks.
    pub source_id: String,
    pub kind: NodeKind,
    /// Name with tag characters stripped
    pub display_name: String,
    pub raw_name: String,
    pub tag: TagSpec,
    /// Raw name with consumed command markers removed, if it carried any
    pub consumed_name: Option<String>,
    /// Resolved mode governing this node's children
    pub effective_mode: Mode,
    pub due: Option<DueDate>,
    pub labels: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub checkable: bool,
    pub completed: bool,
    pub children: Vec<NodeId>,
    /// Non-owning back reference; used for inheritance lookups only
    pub parent: Option<NodeId>,
    /// True for the synthetic section grouping sectionless tasks
    pub implicit: bool,
}

impl HierarchyNode {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Arena-backed Project → Section → Task → Subtask tree for one pass
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    pub nodes: Vec<HierarchyNode>,
    /// Project nodes in snapshot order
    pub roots: Vec<NodeId>,
    /// Task and subtask nodes by source id
    pub tasks: IndexMap<String, NodeId>,
}

impl Hierarchy {
    pub fn node(&self, id: NodeId) -> &HierarchyNode {
        &self.nodes[id.0]
    }

    pub fn task(&self, source_id: &str) -> Option<&HierarchyNode> {
        self.tasks.get(source_id).map(|&id| self.node(id))
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.node(id).parent,
        }
    }

    /// All nodes in pre-order, projects in snapshot order
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// The node and its whole subtree in pre-order
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub struct Ancestors<'a> {
    tree: &'a Hierarchy,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.node(id).parent;
        Some(id)
    }
}
