use std::fs;
use std::path::{Path, PathBuf};

use crate::io::store::atomic_write;
use crate::model::config::WorkspaceConfig;

pub const WORKSPACE_DIR: &str = "autolabel";
pub const CONFIG_FILE: &str = "config.toml";
pub const SNAPSHOT_FILE: &str = "snapshot.json";
pub const HISTORY_FILE: &str = "history.json";

/// Error type for workspace I/O
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("not an autolabel workspace: no autolabel/ directory found")]
    NotAWorkspace,
    #[error("workspace already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("could not edit config.toml: {0}")]
    ConfigEditError(#[from] toml_edit::TomlError),
    #[error("could not parse {path}: {source}")]
    JsonError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// An `autolabel/` directory and the files inside it
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub dir: PathBuf,
}

impl Workspace {
    pub fn at(root: &Path) -> Self {
        Workspace {
            root: root.to_path_buf(),
            dir: root.join(WORKSPACE_DIR),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    /// Parse config.toml; a missing file means all defaults
    pub fn load_config(&self) -> Result<WorkspaceConfig, WorkspaceError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(WorkspaceConfig::default());
        }
        let text = fs::read_to_string(&path).map_err(|e| WorkspaceError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        Ok(toml::from_str(&text)?)
    }
}

/// Find the workspace by walking up from `start`, looking for an
/// `autolabel/` directory with a config.toml in it.
pub fn discover_workspace(start: &Path) -> Result<Workspace, WorkspaceError> {
    let mut current = start.to_path_buf();
    loop {
        let dir = current.join(WORKSPACE_DIR);
        if dir.is_dir() && dir.join(CONFIG_FILE).exists() {
            return Ok(Workspace::at(&current));
        }
        if !current.pop() {
            return Err(WorkspaceError::NotAWorkspace);
        }
    }
}

const CONFIG_TEMPLATE: &str = r#"# autolabel workspace configuration

[labels]
# Label given to every task that is actionable right now ("" disables)
next_action = "next_action"
# Singleton label kept on at most one task
# focus = "focus"
# Tasks carrying any of these are skipped with their subtasks
blocking = []

[tags]
parallel = "="
sequential = "-"
header = "**"
uncheck = "-*"
disable = "*"
consume_markers = true

[schedule]
delay_secs = 5
# Tasks due further ahead than this many days are not next actions (0 = off)
hide_future_days = 0
"#;

/// Create `autolabel/` with a commented config, an empty snapshot and an
/// empty focus history.
pub fn init_workspace(root: &Path) -> Result<Workspace, WorkspaceError> {
    let workspace = Workspace::at(root);
    if workspace.config_path().exists() {
        return Err(WorkspaceError::AlreadyExists(workspace.dir.clone()));
    }
    fs::create_dir_all(&workspace.dir).map_err(|e| WorkspaceError::WriteError {
        path: workspace.dir.clone(),
        source: e,
    })?;

    let files: [(PathBuf, &str); 3] = [
        (workspace.config_path(), CONFIG_TEMPLATE),
        (workspace.snapshot_path(), "{\n  \"revision\": 0\n}\n"),
        (workspace.history_path(), "{\n  \"sessions\": []\n}\n"),
    ];
    for (path, content) in files {
        if path.exists() {
            continue;
        }
        atomic_write(&path, content.as_bytes())
            .map_err(|e| WorkspaceError::WriteError { path, source: e })?;
    }
    Ok(workspace)
}
