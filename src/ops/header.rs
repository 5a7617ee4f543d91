use crate::model::config::EngineConfig;
use crate::model::node::{Hierarchy, HierarchyNode, NodeId};
use crate::model::operation::{ItemRef, LabelOperation};

/// Checkable state each task should end up in after this pass.
///
/// A header or uncheck marker applies to the item carrying it and to every
/// task below it; the nearest marked ancestor-or-self wins. Tasks with no
/// marked ancestor keep whatever state they already have.
#[derive(Debug, Clone)]
pub struct HeaderProjection {
    /// `Some(false)` = header wanted, `Some(true)` = checkable wanted
    wanted: Vec<Option<bool>>,
}

/// Resolve the wanted checkable state for every node in one top-down pass.
/// Disabled nodes take part like any other.
pub fn project_headers(tree: &Hierarchy) -> HeaderProjection {
    let mut wanted: Vec<Option<bool>> = vec![None; tree.len()];
    for id in tree.preorder() {
        let node = tree.node(id);
        let own = if node.tag.header {
            Some(false)
        } else if node.tag.uncheckable_to_checkable {
            Some(true)
        } else {
            None
        };
        wanted[id.0] = own.or_else(|| node.parent.and_then(|p| wanted[p.0]));
    }
    HeaderProjection { wanted }
}

impl HeaderProjection {
    /// Whether the task counts as checkable once this pass is applied
    pub fn is_checkable(&self, tree: &Hierarchy, id: NodeId) -> bool {
        self.wanted[id.0].unwrap_or(tree.node(id).checkable)
    }

    /// The conversion a task needs, if its current state differs from the
    /// wanted one
    pub fn conversion(&self, tree: &Hierarchy, id: NodeId) -> Option<LabelOperation> {
        let node = tree.node(id);
        if !node.kind.is_task() {
            return None;
        }
        match self.wanted[id.0] {
            Some(false) if node.checkable => Some(LabelOperation::ConvertToHeader {
                task_id: node.source_id.clone(),
            }),
            Some(true) if !node.checkable => Some(LabelOperation::ConvertToCheckable {
                task_id: node.source_id.clone(),
            }),
            _ => None,
        }
    }
}

/// Strip a consumed command marker from the item's name
pub fn rename_op(node: &HierarchyNode, config: &EngineConfig) -> Option<LabelOperation> {
    if !config.consume_markers || node.implicit {
        return None;
    }
    let name = node.consumed_name.as_ref()?;
    Some(LabelOperation::Rename {
        item: ItemRef {
            kind: node.kind,
            id: node.source_id.clone(),
        },
        name: name.clone(),
    })
}
