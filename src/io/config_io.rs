use std::fs;

use crate::io::store::atomic_write;
use crate::io::workspace::{Workspace, WorkspaceError};
use crate::model::config::{ConfigError, WorkspaceConfig};

/// Why `config set` refused a key or value
#[derive(Debug, thiserror::Error)]
pub enum SetError {
    #[error("unknown config key '{0}'")]
    UnknownKey(String),
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("resulting config is invalid: {0}")]
    Invalid(#[from] ConfigError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Text,
    OptionalText,
    Char,
    Bool,
    Integer,
    List,
}

const KEYS: &[(&str, &str, ValueKind)] = &[
    ("labels", "next_action", ValueKind::Text),
    ("labels", "focus", ValueKind::OptionalText),
    ("labels", "blocking", ValueKind::List),
    ("tags", "parallel", ValueKind::Char),
    ("tags", "sequential", ValueKind::Char),
    ("tags", "header", ValueKind::Text),
    ("tags", "uncheck", ValueKind::Text),
    ("tags", "disable", ValueKind::Char),
    ("tags", "consume_markers", ValueKind::Bool),
    ("schedule", "delay_secs", ValueKind::Integer),
    ("schedule", "hide_future_days", ValueKind::Integer),
];

/// Read the workspace config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing.
pub fn read_config(
    workspace: &Workspace,
) -> Result<(WorkspaceConfig, toml_edit::DocumentMut), WorkspaceError> {
    let path = workspace.config_path();
    let text = fs::read_to_string(&path).map_err(|e| WorkspaceError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    let config: WorkspaceConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(workspace: &Workspace, doc: &toml_edit::DocumentMut) -> Result<(), WorkspaceError> {
    let path = workspace.config_path();
    atomic_write(&path, doc.to_string().as_bytes())
        .map_err(|e| WorkspaceError::WriteError { path, source: e })
}

/// Set `table.key` in the document. An empty value for `labels.focus`
/// removes the key.
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, value: &str) -> Result<(), SetError> {
    let Some((table, field, kind)) = key
        .split_once('.')
        .and_then(|(t, f)| KEYS.iter().find(|(kt, kf, _)| *kt == t && *kf == f))
        .copied()
    else {
        return Err(SetError::UnknownKey(key.to_string()));
    };
    let invalid = |expected| SetError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    };

    let item = match kind {
        ValueKind::Text => toml_edit::value(value),
        ValueKind::OptionalText if value.is_empty() => {
            if let Some(t) = doc.get_mut(table).and_then(|t| t.as_table_mut()) {
                t.remove(field);
            }
            return Ok(());
        }
        ValueKind::OptionalText => toml_edit::value(value),
        ValueKind::Char => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => toml_edit::value(c.to_string()),
                _ => return Err(invalid("a single character")),
            }
        }
        ValueKind::Bool => match value {
            "true" => toml_edit::value(true),
            "false" => toml_edit::value(false),
            _ => return Err(invalid("true or false")),
        },
        ValueKind::Integer => match value.parse::<u32>() {
            Ok(n) => toml_edit::value(i64::from(n)),
            Err(_) => return Err(invalid("a non-negative integer")),
        },
        ValueKind::List => {
            let mut array = toml_edit::Array::new();
            for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                array.push(part);
            }
            toml_edit::value(array)
        }
    };

    if !doc.contains_key(table) {
        doc[table] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[table][field] = item;
    Ok(())
}

/// Apply one `config set` edit on disk, refusing edits that leave the
/// engine configuration invalid.
pub fn update_config(workspace: &Workspace, key: &str, value: &str) -> Result<WorkspaceConfig, SetError> {
    let (_, mut doc) = read_config(workspace)?;
    set_value(&mut doc, key, value)?;
    let updated: WorkspaceConfig =
        toml::from_str(&doc.to_string()).map_err(WorkspaceError::ConfigParseError)?;
    updated.engine().validate()?;
    write_config(workspace, &doc)?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::workspace::init_workspace;
    use tempfile::TempDir;

    fn sample_config() -> &'static str {
        r#"# keep me
[labels]
next_action = "next"   # trailing comment

[schedule]
delay_secs = 10
"#
    }

    #[test]
    fn round_trip_preserves_layout() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::at(tmp.path());
        fs::create_dir_all(&workspace.dir).unwrap();
        fs::write(workspace.config_path(), sample_config()).unwrap();

        let (config, doc) = read_config(&workspace).unwrap();
        assert_eq!(config.labels.next_action, "next");
        write_config(&workspace, &doc).unwrap();
        let written = fs::read_to_string(workspace.config_path()).unwrap();
        assert_eq!(written, sample_config());
    }

    #[test]
    fn set_keeps_comments() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        set_value(&mut doc, "labels.focus", "focus").unwrap();
        set_value(&mut doc, "schedule.hide_future_days", "3").unwrap();
        let text = doc.to_string();
        assert!(text.contains("# keep me"));
        assert!(text.contains("focus = \"focus\""));
        let config: WorkspaceConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.schedule.hide_future_days, 3);
        assert_eq!(config.schedule.delay_secs, 10);
    }

    #[test]
    fn set_creates_missing_table_and_lists() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        set_value(&mut doc, "labels.blocking", "waiting, someday").unwrap();
        set_value(&mut doc, "tags.parallel", "+").unwrap();
        let config: WorkspaceConfig = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.labels.blocking, vec!["waiting", "someday"]);
        assert_eq!(config.tags.parallel, '+');
    }

    #[test]
    fn empty_focus_removes_key() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        set_value(&mut doc, "labels.focus", "focus").unwrap();
        set_value(&mut doc, "labels.focus", "").unwrap();
        let config: WorkspaceConfig = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.labels.focus, None);
    }

    #[test]
    fn rejects_bad_keys_and_values() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        assert!(matches!(
            set_value(&mut doc, "labels.colour", "x"),
            Err(SetError::UnknownKey(_))
        ));
        assert!(matches!(
            set_value(&mut doc, "tags.parallel", "=="),
            Err(SetError::InvalidValue { .. })
        ));
        assert!(matches!(
            set_value(&mut doc, "schedule.delay_secs", "-1"),
            Err(SetError::InvalidValue { .. })
        ));
    }

    #[test]
    fn update_refuses_invalid_engine_config() {
        let tmp = TempDir::new().unwrap();
        let workspace = init_workspace(tmp.path()).unwrap();
        let before = fs::read_to_string(workspace.config_path()).unwrap();
        let err = update_config(&workspace, "tags.parallel", "-").unwrap_err();
        assert!(matches!(err, SetError::Invalid(ConfigError::IdenticalSuffixes('-'))));
        assert_eq!(fs::read_to_string(workspace.config_path()).unwrap(), before);

        let updated = update_config(&workspace, "labels.focus", "focus").unwrap();
        assert_eq!(updated.labels.focus.as_deref(), Some("focus"));
    }
}
