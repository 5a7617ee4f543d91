use serde::{Deserialize, Serialize};

/// Everything the engine needs to decide label operations.
/// Passed explicitly into every entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Label marking next actions; `None` disables propagation output
    pub next_action_label: Option<String>,
    /// Singleton focus label; `None` disables reconciliation
    pub focus_label: Option<String>,
    pub parallel_suffix: char,
    pub sequential_suffix: char,
    /// Prefix/suffix command that turns an item's tasks into headers
    pub header_marker: String,
    /// Prefix command that restores an item's tasks to checkable
    pub uncheck_marker: String,
    /// Leading/trailing character that disables propagation for a subtree
    pub disable_marker: char,
    /// Tasks due further ahead than this are never next actions (0 = off)
    pub hide_future_days: u32,
    /// Tasks carrying any of these labels are skipped with their subtree
    pub blocking_labels: Vec<String>,
    /// Strip header/uncheck command markers from names once acted on
    pub consume_markers: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            next_action_label: Some(default_next_action()),
            focus_label: None,
            parallel_suffix: '=',
            sequential_suffix: '-',
            header_marker: "**".to_string(),
            uncheck_marker: "-*".to_string(),
            disable_marker: '*',
            hide_future_days: 0,
            blocking_labels: Vec::new(),
            consume_markers: true,
        }
    }
}

/// Fatal configuration problems. Propagation must not run with these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("parallel and sequential suffix are both '{0}'")]
    IdenticalSuffixes(char),
    #[error("suffix '{0}' collides with the disable marker")]
    SuffixIsDisableMarker(char),
    #[error("suffix '{0}' must be a visible, non-whitespace character")]
    InvalidSuffix(char),
    #[error("{0} marker must not be empty")]
    EmptyMarker(&'static str),
    #[error("header and uncheck markers are both '{0}'")]
    IdenticalMarkers(String),
    #[error("{0} label name must not be empty")]
    EmptyLabel(&'static str),
    #[error("next-action and focus labels are both '{0}'")]
    SameLabel(String),
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for c in [self.parallel_suffix, self.sequential_suffix] {
            if c.is_whitespace() || c.is_control() {
                return Err(ConfigError::InvalidSuffix(c));
            }
            if c == self.disable_marker {
                return Err(ConfigError::SuffixIsDisableMarker(c));
            }
        }
        if self.parallel_suffix == self.sequential_suffix {
            return Err(ConfigError::IdenticalSuffixes(self.parallel_suffix));
        }
        if self.header_marker.is_empty() {
            return Err(ConfigError::EmptyMarker("header"));
        }
        if self.uncheck_marker.is_empty() {
            return Err(ConfigError::EmptyMarker("uncheck"));
        }
        if self.header_marker == self.uncheck_marker {
            return Err(ConfigError::IdenticalMarkers(self.header_marker.clone()));
        }
        if self.next_action_label.as_deref() == Some("") {
            return Err(ConfigError::EmptyLabel("next-action"));
        }
        if self.focus_label.as_deref() == Some("") {
            return Err(ConfigError::EmptyLabel("focus"));
        }
        if let (Some(a), Some(b)) = (&self.next_action_label, &self.focus_label)
            && a == b
        {
            return Err(ConfigError::SameLabel(a.clone()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Workspace file (autolabel/config.toml)
// ---------------------------------------------------------------------------

/// Configuration from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub tags: TagConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Empty string disables next-action labeling
    #[serde(default = "default_next_action")]
    pub next_action: String,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub blocking: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            next_action: default_next_action(),
            focus: None,
            blocking: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagConfig {
    #[serde(default = "default_parallel")]
    pub parallel: char,
    #[serde(default = "default_sequential")]
    pub sequential: char,
    #[serde(default = "default_header")]
    pub header: String,
    #[serde(default = "default_uncheck")]
    pub uncheck: String,
    #[serde(default = "default_disable")]
    pub disable: char,
    #[serde(default = "default_true")]
    pub consume_markers: bool,
}

impl Default for TagConfig {
    fn default() -> Self {
        TagConfig {
            parallel: default_parallel(),
            sequential: default_sequential(),
            header: default_header(),
            uncheck: default_uncheck(),
            disable: default_disable(),
            consume_markers: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between periodic passes
    #[serde(default = "default_delay")]
    pub delay_secs: u64,
    #[serde(default)]
    pub hide_future_days: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            delay_secs: default_delay(),
            hide_future_days: 0,
        }
    }
}

fn default_next_action() -> String {
    "next_action".to_string()
}

fn default_parallel() -> char {
    '='
}

fn default_sequential() -> char {
    '-'
}

fn default_header() -> String {
    "**".to_string()
}

fn default_uncheck() -> String {
    "-*".to_string()
}

fn default_disable() -> char {
    '*'
}

fn default_true() -> bool {
    true
}

fn default_delay() -> u64 {
    5
}

impl WorkspaceConfig {
    /// Build the engine configuration described by this file
    pub fn engine(&self) -> EngineConfig {
        let next_action = Some(self.labels.next_action.clone()).filter(|l| !l.is_empty());
        EngineConfig {
            next_action_label: next_action,
            focus_label: self.labels.focus.clone().filter(|l| !l.is_empty()),
            parallel_suffix: self.tags.parallel,
            sequential_suffix: self.tags.sequential,
            header_marker: self.tags.header.clone(),
            uncheck_marker: self.tags.uncheck.clone(),
            disable_marker: self.tags.disable,
            hide_future_days: self.schedule.hide_future_days,
            blocking_labels: self.labels.blocking.clone(),
            consume_markers: self.tags.consume_markers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn identical_suffixes_are_fatal() {
        let config = EngineConfig {
            parallel_suffix: '-',
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::IdenticalSuffixes('-'))
        );
    }

    #[test]
    fn suffix_may_not_be_disable_marker() {
        let config = EngineConfig {
            sequential_suffix: '*',
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SuffixIsDisableMarker('*'))
        );
    }

    #[test]
    fn labels_must_differ() {
        let config = EngineConfig {
            focus_label: Some("next_action".into()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::SameLabel(_))));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: WorkspaceConfig = toml::from_str("").unwrap();
        let engine = config.engine();
        assert_eq!(engine, EngineConfig::default());
        assert_eq!(config.schedule.delay_secs, 5);
    }

    #[test]
    fn empty_next_action_disables_labeling() {
        let config: WorkspaceConfig = toml::from_str(
            r#"
[labels]
next_action = ""
focus = "focus"
"#,
        )
        .unwrap();
        let engine = config.engine();
        assert_eq!(engine.next_action_label, None);
        assert_eq!(engine.focus_label.as_deref(), Some("focus"));
    }

    #[test]
    fn file_overrides_tags() {
        let config: WorkspaceConfig = toml::from_str(
            r#"
[tags]
parallel = "+"
sequential = "~"

[schedule]
hide_future_days = 7
"#,
        )
        .unwrap();
        let engine = config.engine();
        assert_eq!(engine.parallel_suffix, '+');
        assert_eq!(engine.sequential_suffix, '~');
        assert_eq!(engine.hide_future_days, 7);
        assert_eq!(engine.header_marker, "**");
    }
}
