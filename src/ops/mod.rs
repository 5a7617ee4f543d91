pub mod check;
pub mod due_gate;
pub mod engine;
pub mod focus;
pub mod header;
pub mod propagate;
pub mod query;
pub mod resolve;

pub use check::{Diagnostics, StructuralError, TagWarning, check_snapshot};
pub use engine::{LabelPlan, compute_label_operations, compute_label_operations_at};
pub use focus::{focus_candidates, reconcile_focus};
pub use resolve::{Resolved, resolve_hierarchy};
