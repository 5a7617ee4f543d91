use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::io::lock::{DEFAULT_LOCK_TIMEOUT, FileLock, LockError};
use crate::io::workspace::{Workspace, WorkspaceError};
use crate::model::operation::LabelOperation;
use crate::model::snapshot::{Snapshot, TaskRecord};
use crate::model::tag::NodeKind;

/// Source of snapshots and sink for the operations computed from them
pub trait SnapshotStore {
    fn fetch(&self) -> Result<Snapshot, StoreError>;

    /// Apply `operations` if the store is still at `expected_revision`.
    /// Operations that cannot be applied are reported, not fatal.
    fn apply(
        &self,
        operations: &[LabelOperation],
        expected_revision: u64,
    ) -> Result<ApplyReport, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot changed since it was read (expected revision {expected}, found {found})")]
    Stale { expected: u64, found: u64 },
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// What happened to one batch of operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Revision after the write
    pub revision: u64,
    pub applied: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<OpFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpFailure {
    pub operation: LabelOperation,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("no task with id {0}")]
    UnknownTask(String),
    #[error("no {kind} with id {id}")]
    UnknownItem { kind: NodeKind, id: String },
}

fn find_task<'s>(snapshot: &'s mut Snapshot, id: &str) -> Result<&'s mut TaskRecord, ApplyError> {
    snapshot
        .tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| ApplyError::UnknownTask(id.to_string()))
}

/// Apply one operation to an in-memory snapshot.
/// Adding a label a task already has (or removing one it lacks) is a no-op.
pub fn apply_operation(snapshot: &mut Snapshot, op: &LabelOperation) -> Result<(), ApplyError> {
    match op {
        LabelOperation::AddLabel { task_id, label } => {
            let task = find_task(snapshot, task_id)?;
            if !task.has_label(label) {
                task.labels.push(label.clone());
            }
        }
        LabelOperation::RemoveLabel { task_id, label } => {
            find_task(snapshot, task_id)?.labels.retain(|l| l != label);
        }
        LabelOperation::ConvertToHeader { task_id } => {
            find_task(snapshot, task_id)?.checkable = false;
        }
        LabelOperation::ConvertToCheckable { task_id } => {
            find_task(snapshot, task_id)?.checkable = true;
        }
        LabelOperation::Rename { item, name } => {
            let unknown = || ApplyError::UnknownItem {
                kind: item.kind,
                id: item.id.clone(),
            };
            let slot = match item.kind {
                NodeKind::Project => snapshot
                    .projects
                    .iter_mut()
                    .find(|p| p.id == item.id)
                    .map(|p| &mut p.name),
                NodeKind::Section => snapshot
                    .sections
                    .iter_mut()
                    .find(|s| s.id == item.id)
                    .map(|s| &mut s.name),
                NodeKind::Task | NodeKind::Subtask => snapshot
                    .tasks
                    .iter_mut()
                    .find(|t| t.id == item.id)
                    .map(|t| &mut t.name),
            };
            *slot.ok_or_else(unknown)? = name.clone();
        }
    }
    Ok(())
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Snapshot kept in `autolabel/snapshot.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    path: PathBuf,
    lock_timeout: Duration,
}

impl FileStore {
    pub fn new(workspace: &Workspace) -> Self {
        FileStore {
            dir: workspace.dir.clone(),
            path: workspace.snapshot_path(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    fn read(&self) -> Result<Snapshot, WorkspaceError> {
        let text = fs::read_to_string(&self.path).map_err(|e| WorkspaceError::ReadError {
            path: self.path.clone(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| WorkspaceError::JsonError {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write(&self, snapshot: &Snapshot) -> Result<(), WorkspaceError> {
        let mut json = serde_json::to_string_pretty(snapshot).map_err(|e| WorkspaceError::JsonError {
            path: self.path.clone(),
            source: e,
        })?;
        json.push('\n');
        atomic_write(&self.path, json.as_bytes()).map_err(|e| WorkspaceError::WriteError {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl SnapshotStore for FileStore {
    fn fetch(&self) -> Result<Snapshot, StoreError> {
        Ok(self.read()?)
    }

    fn apply(
        &self,
        operations: &[LabelOperation],
        expected_revision: u64,
    ) -> Result<ApplyReport, StoreError> {
        let _lock = FileLock::acquire(&self.dir, self.lock_timeout)?;
        let mut snapshot = self.read()?;
        if snapshot.revision != expected_revision {
            warn!(
                expected = expected_revision,
                found = snapshot.revision,
                "snapshot moved, refusing stale operations"
            );
            return Err(StoreError::Stale {
                expected: expected_revision,
                found: snapshot.revision,
            });
        }

        let mut report = ApplyReport {
            revision: snapshot.revision,
            ..Default::default()
        };
        if operations.is_empty() {
            return Ok(report);
        }

        for op in operations {
            match apply_operation(&mut snapshot, op) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!(operation = %op, error = %e, "operation failed");
                    report.failures.push(OpFailure {
                        operation: op.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        snapshot.revision += 1;
        self.write(&snapshot)?;
        report.revision = snapshot.revision;

        info!(
            applied = report.applied,
            failed = report.failures.len(),
            revision = report.revision,
            "applied operations"
        );
        Ok(report)
    }
}
