use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::config::EngineConfig;
use crate::model::node::{Hierarchy, NodeId};
use crate::model::tag::Mode;
use crate::ops::due_gate::is_gated;
use crate::ops::header::HeaderProjection;

/// How a node was reached by the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    /// Picked by a sequential or parallel boundary above it
    Selected,
    /// Below an unset container; only its own mode can start a branch
    Free,
}

/// Per-pass view of the tree used to pick next actions
struct Propagation<'t> {
    tree: &'t Hierarchy,
    excluded: Vec<bool>,
    gated: Vec<bool>,
}

/// Compute the tasks that should carry the next-action label, in tree order.
///
/// Excluded tasks (completed, blocked, headers, disabled) are removed from
/// the candidate tree together with their subtree. Gated tasks stay in the
/// tree but are never active themselves.
pub fn active_set(
    tree: &Hierarchy,
    headers: &HeaderProjection,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Vec<NodeId> {
    let mut excluded = vec![false; tree.len()];
    let mut gated = vec![false; tree.len()];

    for id in tree.preorder() {
        let node = tree.node(id);
        let inherited = node.parent.is_some_and(|p| excluded[p.0]);
        let own = if node.kind.is_task() {
            node.tag.disabled
                || node.completed
                || config.blocking_labels.iter().any(|l| node.has_label(l))
                || !headers.is_checkable(tree, id)
        } else {
            node.tag.disabled
        };
        excluded[id.0] = inherited || own;

        if node.kind.is_task() && !excluded[id.0] {
            gated[id.0] = is_gated(node.due.as_ref(), now, config.hide_future_days);
            if gated[id.0] {
                debug!(task = %node.source_id, name = %node.display_name, "gated by due date");
            }
        }
    }

    let walk = Propagation {
        tree,
        excluded,
        gated,
    };
    let mut out = Vec::new();
    for &root in &tree.roots {
        walk.activate(root, Reach::Free, &mut out);
    }
    out
}

impl Propagation<'_> {
    fn eligible(&self, id: NodeId) -> bool {
        !self.excluded[id.0] && !self.gated[id.0]
    }

    /// Push the active nodes found at or below `id`; true if any were found
    fn activate(&self, id: NodeId, reach: Reach, out: &mut Vec<NodeId>) -> bool {
        if self.excluded[id.0] {
            return false;
        }
        let node = self.tree.node(id);
        let is_task = node.kind.is_task();

        let found = match node.effective_mode {
            Mode::Unset if is_task => false,
            Mode::Unset => {
                let mut any = false;
                for &child in &node.children {
                    any |= self.activate(child, Reach::Free, out);
                }
                any
            }
            Mode::Sequential => node
                .children
                .iter()
                .any(|&child| self.activate(child, Reach::Selected, out)),
            Mode::Parallel => {
                let mut any = false;
                for &child in &node.children {
                    any |= self.activate(child, Reach::Selected, out);
                }
                any
            }
        };
        if found {
            return true;
        }

        // Waterfall: a task is only active when nothing below it is
        if is_task && reach == Reach::Selected && self.eligible(id) {
            out.push(id);
            return true;
        }
        false
    }
}
