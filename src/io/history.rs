use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::io::lock::{DEFAULT_LOCK_TIMEOUT, FileLock};
use crate::io::store::{StoreError, atomic_write};
use crate::io::workspace::{Workspace, WorkspaceError};
use crate::model::focus::ReconcileResult;

/// One stretch of time a task held the focus label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub label: String,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// What triggered the session: `run`, `focus`
    pub source: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<String>,
}

impl FocusSession {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    sessions: Vec<FocusSession>,
}

/// Focus sessions kept in `autolabel/history.json`
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(workspace: &Workspace) -> Self {
        HistoryStore {
            dir: workspace.dir.clone(),
            path: workspace.history_path(),
        }
    }

    fn read(&self) -> Result<HistoryFile, WorkspaceError> {
        if !self.path.exists() {
            return Ok(HistoryFile::default());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| WorkspaceError::ReadError {
            path: self.path.clone(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| WorkspaceError::JsonError {
            path: self.path.clone(),
            source: e,
        })
    }

    fn write(&self, file: &HistoryFile) -> Result<(), WorkspaceError> {
        let json = serde_json::to_string_pretty(file).map_err(|e| WorkspaceError::JsonError {
            path: self.path.clone(),
            source: e,
        })?;
        atomic_write(&self.path, format!("{}\n", json).as_bytes()).map_err(|e| {
            WorkspaceError::WriteError {
                path: self.path.clone(),
                source: e,
            }
        })
    }

    /// Read-modify-write under the workspace lock. The closure returns
    /// whether anything changed.
    fn update(&self, edit: impl FnOnce(&mut HistoryFile) -> bool) -> Result<bool, StoreError> {
        let _lock = FileLock::acquire(&self.dir, DEFAULT_LOCK_TIMEOUT)?;
        let mut file = self.read()?;
        let changed = edit(&mut file);
        if changed {
            self.write(&file)?;
        }
        Ok(changed)
    }

    /// Open a session for `task_id`. Does nothing if one is already open.
    pub fn start_session(
        &self,
        label: &str,
        task_id: &str,
        assigned_at: DateTime<Utc>,
        source: &str,
        reason: &str,
    ) -> Result<bool, StoreError> {
        self.update(|file| {
            let open = file
                .sessions
                .iter()
                .any(|s| s.is_open() && s.label == label && s.task_id == task_id);
            if open {
                return false;
            }
            file.sessions.push(FocusSession {
                label: label.to_string(),
                task_id: task_id.to_string(),
                started_at: assigned_at,
                ended_at: None,
                source: source.to_string(),
                reason: reason.to_string(),
                end_reason: None,
            });
            true
        })
    }

    /// Close the open session for `task_id`, if there is one
    pub fn end_session(
        &self,
        label: &str,
        task_id: &str,
        ended_at: DateTime<Utc>,
        reason: &str,
    ) -> Result<bool, StoreError> {
        self.update(|file| {
            let Some(session) = file
                .sessions
                .iter_mut()
                .rev()
                .find(|s| s.is_open() && s.label == label && s.task_id == task_id)
            else {
                return false;
            };
            session.ended_at = Some(ended_at);
            session.end_reason = Some(reason.to_string());
            true
        })
    }

    /// Sessions for `label` (all labels when `None`), most recent first
    pub fn list_sessions(&self, label: Option<&str>, limit: usize) -> Result<Vec<FocusSession>, StoreError> {
        let file = self.read()?;
        let mut sessions: Vec<FocusSession> = file
            .sessions
            .into_iter()
            .filter(|s| label.is_none_or(|l| s.label == l))
            .collect();
        sessions.reverse();
        // Stable sort keeps later-recorded sessions first among equal starts
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    /// Record an applied reconciliation: the winner's session starts, every
    /// loser's open session ends, and so does any open session whose task no
    /// longer carries the label at all.
    pub fn record_reconcile(
        &self,
        label: &str,
        result: &ReconcileResult,
        at: DateTime<Utc>,
        source: &str,
    ) -> Result<(), StoreError> {
        for loser in &result.losers {
            if self.end_session(label, &loser.id, at, "superseded")? {
                debug!(task = %loser.id, "focus session ended");
            }
        }
        let winner = result.winner.as_ref().map(|w| w.id.as_str());
        self.update(|file| {
            let mut changed = false;
            for session in file.sessions.iter_mut() {
                if session.is_open() && session.label == label && Some(session.task_id.as_str()) != winner {
                    debug!(task = %session.task_id, "focus label gone, session ended");
                    session.ended_at = Some(at);
                    session.end_reason = Some("label removed".to_string());
                    changed = true;
                }
            }
            changed
        })?;
        if let Some(winner) = &result.winner {
            let reason = if result.losers.is_empty() {
                "sole holder"
            } else {
                "won reconciliation"
            };
            if self.start_session(label, &winner.id, at, source, reason)? {
                debug!(task = %winner.id, "focus session started");
            }
        }
        Ok(())
    }
}
