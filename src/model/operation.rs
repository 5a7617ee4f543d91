use serde::{Deserialize, Serialize};

use super::tag::NodeKind;

/// Reference to any item that can be renamed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: NodeKind,
    pub id: String,
}

/// A single change the driver must apply against the task service.
/// The engine only produces these; it never applies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LabelOperation {
    AddLabel { task_id: String, label: String },
    RemoveLabel { task_id: String, label: String },
    ConvertToHeader { task_id: String },
    ConvertToCheckable { task_id: String },
    /// Rewrite a raw name after a one-shot command marker was consumed
    Rename { item: ItemRef, name: String },
}

impl LabelOperation {
    /// The id of the item this operation touches
    pub fn target_id(&self) -> &str {
        match self {
            LabelOperation::AddLabel { task_id, .. }
            | LabelOperation::RemoveLabel { task_id, .. }
            | LabelOperation::ConvertToHeader { task_id }
            | LabelOperation::ConvertToCheckable { task_id } => task_id,
            LabelOperation::Rename { item, .. } => &item.id,
        }
    }
}

impl std::fmt::Display for LabelOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelOperation::AddLabel { task_id, label } => write!(f, "+@{} {}", label, task_id),
            LabelOperation::RemoveLabel { task_id, label } => {
                write!(f, "-@{} {}", label, task_id)
            }
            LabelOperation::ConvertToHeader { task_id } => write!(f, "header {}", task_id),
            LabelOperation::ConvertToCheckable { task_id } => write!(f, "checkable {}", task_id),
            LabelOperation::Rename { item, name } => {
                write!(f, "rename {} {} -> {:?}", item.kind, item.id, name)
            }
        }
    }
}
