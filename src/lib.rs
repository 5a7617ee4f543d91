pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
pub mod parse;
pub mod util;

pub use model::{EngineConfig, FocusCandidate, LabelOperation, ReconcileResult, Snapshot};
pub use ops::{LabelPlan, compute_label_operations, compute_label_operations_at, reconcile_focus};
