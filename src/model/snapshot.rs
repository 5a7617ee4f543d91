use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time copy of every project, section and task in the account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Bumped by the store on every write; used to detect concurrent changes
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
    #[serde(default)]
    pub sections: Vec<SectionRecord>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    /// Raw name including any tag characters
    pub name: String,
    /// Inbox projects are never labeled
    #[serde(default)]
    pub is_inbox: bool,
    /// Sections in display order
    #[serde(default)]
    pub section_ids: Vec<String>,
    /// Sectionless parentless tasks in display order
    #[serde(default)]
    pub task_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub id: String,
    pub name: String,
    pub project_id: String,
    /// Parentless tasks in display order
    #[serde(default)]
    pub task_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    pub project_id: String,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub due: Option<DueDate>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Direct children in display order
    #[serde(default)]
    pub subtask_ids: Vec<String>,
    /// False when the task is a non-checkable header
    #[serde(default = "default_true")]
    pub checkable: bool,
    #[serde(default)]
    pub completed: bool,
}

fn default_true() -> bool {
    true
}

impl TaskRecord {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A due date as the task service reports it: either a calendar date or an
/// exact instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DueDate {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl DueDate {
    /// The instant used for horizon comparisons. A date-only due date counts
    /// from midnight UTC.
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            DueDate::DateTime(dt) => *dt,
            DueDate::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

impl std::fmt::Display for DueDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DueDate::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            DueDate::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Snapshot {
    pub fn task(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut TaskRecord> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn project(&self, id: &str) -> Option<&ProjectRecord> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn section(&self, id: &str) -> Option<&SectionRecord> {
        self.sections.iter().find(|s| s.id == id)
    }
}
