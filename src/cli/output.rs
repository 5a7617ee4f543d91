use std::fmt::Write;

use serde::Serialize;

use crate::io::history::FocusSession;
use crate::model::focus::ReconcileResult;
use crate::model::operation::LabelOperation;
use crate::model::snapshot::Snapshot;
use crate::model::tag::{Mode, NodeKind};
use crate::ops::check::Diagnostics;
use crate::ops::query::TaskRow;
use crate::parse::ParsedName;
use crate::util::text::{display_width, pad_to_width, truncate_to_width};

const NAME_WIDTH: usize = 40;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ParseJson {
    pub kind: NodeKind,
    pub display_name: String,
    #[serde(rename = "type")]
    pub type_str: String,
    pub modes: Vec<Mode>,
    pub disabled: bool,
    pub header: bool,
    pub uncheck: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl ParseJson {
    pub fn new(parsed: &ParsedName, kind: NodeKind) -> Self {
        ParseJson {
            kind,
            display_name: parsed.display_name.clone(),
            type_str: parsed.tag.type_string(kind),
            modes: parsed.tag.modes.clone(),
            disabled: parsed.tag.disabled,
            header: parsed.tag.header,
            uncheck: parsed.tag.uncheckable_to_checkable,
            consumed_name: parsed.consumed_name.clone(),
            issues: parsed.issues.iter().map(|i| i.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

/// Name of whatever an operation targets, for display next to its id
fn target_name(snapshot: &Snapshot, op: &LabelOperation) -> String {
    let id = op.target_id();
    if let LabelOperation::Rename { item, .. } = op {
        let name = match item.kind {
            NodeKind::Project => snapshot.project(id).map(|p| p.name.as_str()),
            NodeKind::Section => snapshot.section(id).map(|s| s.name.as_str()),
            NodeKind::Task | NodeKind::Subtask => snapshot.task(id).map(|t| t.name.as_str()),
        };
        return name.unwrap_or_default().to_string();
    }
    snapshot
        .task(id)
        .map(|t| t.name.clone())
        .unwrap_or_default()
}

pub fn render_operations(operations: &[LabelOperation], snapshot: &Snapshot) -> String {
    if operations.is_empty() {
        return "Nothing to do.\n".to_string();
    }
    let rendered: Vec<String> = operations.iter().map(|op| op.to_string()).collect();
    let width = rendered
        .iter()
        .map(|s| display_width(s))
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for (op, text) in operations.iter().zip(&rendered) {
        let name = truncate_to_width(&target_name(snapshot, op), NAME_WIDTH);
        let _ = writeln!(out, "  {}  {}", pad_to_width(text, width), name);
    }
    out
}

pub fn render_diagnostics(diagnostics: &Diagnostics) -> String {
    let mut out = String::new();
    if !diagnostics.errors.is_empty() {
        out.push_str("Errors:\n");
        for err in &diagnostics.errors {
            let _ = writeln!(out, "  {}", err);
        }
    }
    if !diagnostics.warnings.is_empty() {
        if !diagnostics.errors.is_empty() {
            out.push('\n');
        }
        out.push_str("Warnings:\n");
        for warn in &diagnostics.warnings {
            let _ = writeln!(out, "  {}", warn);
        }
    }
    out
}

pub fn render_tasks(rows: &[TaskRow]) -> String {
    let names: Vec<String> = rows
        .iter()
        .map(|r| truncate_to_width(&format!("{}{}", "  ".repeat(r.depth), r.name), NAME_WIDTH))
        .collect();
    let id_width = rows.iter().map(|r| r.id.len()).max().unwrap_or(0);
    let name_width = names
        .iter()
        .map(|n| display_width(n))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (row, name) in rows.iter().zip(&names) {
        let flags = format!(
            "{}{}",
            if row.next_action { 'N' } else { ' ' },
            if row.focus { 'F' } else { ' ' }
        );
        let place = match &row.section {
            Some(section) => format!("{} / {}", row.project, section),
            None => row.project.clone(),
        };
        let due = row.due.map(|d| format!("  due {}", d)).unwrap_or_default();
        let line = format!(
            "{} {}  {}  {}{}",
            flags,
            pad_to_width(&row.id, id_width),
            pad_to_width(name, name_width),
            place,
            due
        );
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

pub fn render_parsed(parsed: &ParsedName, kind: NodeKind) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "name:  {}", parsed.display_name);
    let _ = writeln!(out, "kind:  {}", kind);
    let _ = writeln!(out, "type:  {}", parsed.tag.type_string(kind));
    let mut flags = Vec::new();
    if parsed.tag.disabled {
        flags.push("disabled");
    }
    if parsed.tag.header {
        flags.push("header");
    }
    if parsed.tag.uncheckable_to_checkable {
        flags.push("uncheck");
    }
    if !flags.is_empty() {
        let _ = writeln!(out, "flags: {}", flags.join(", "));
    }
    if let Some(name) = &parsed.consumed_name {
        let _ = writeln!(out, "after: {}", name);
    }
    for issue in &parsed.issues {
        let _ = writeln!(out, "warning: {}", issue);
    }
    out
}

pub fn render_reconcile(result: &ReconcileResult) -> String {
    let mut out = String::new();
    match &result.winner {
        Some(winner) => {
            let _ = writeln!(out, "winner: {}", winner.id);
        }
        None => out.push_str("no focus candidates\n"),
    }
    for loser in &result.losers {
        let _ = writeln!(out, "loser:  {}", loser.id);
    }
    for op in &result.operations {
        let _ = writeln!(out, "  {}", op);
    }
    if !result.operations.is_empty() && !result.applied {
        out.push_str("(preview; rerun with --apply to write)\n");
    }
    out
}

pub fn render_sessions(sessions: &[FocusSession]) -> String {
    if sessions.is_empty() {
        return "No focus sessions.\n".to_string();
    }
    let id_width = sessions.iter().map(|s| s.task_id.len()).max().unwrap_or(0);
    let mut out = String::new();
    for s in sessions {
        let started = s.started_at.format("%Y-%m-%d %H:%M");
        let ended = match s.ended_at {
            Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
            None => "open".to_string(),
        };
        let _ = writeln!(
            out,
            "{}  {} .. {}  {} ({})",
            pad_to_width(&s.task_id, id_width),
            started,
            ended,
            s.reason,
            s.source
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::snapshot::{ProjectRecord, TaskRecord};
    use crate::parse::{TagSyntax, parse_name};

    fn snapshot() -> Snapshot {
        Snapshot {
            projects: vec![ProjectRecord {
                id: "p".into(),
                name: "Home =".into(),
                is_inbox: false,
                section_ids: vec![],
                task_ids: vec![],
            }],
            tasks: vec![TaskRecord {
                id: "12".into(),
                name: "Buy milk".into(),
                project_id: "p".into(),
                section_id: None,
                parent_id: None,
                due: None,
                labels: vec![],
                updated_at: None,
                subtask_ids: vec![],
                checkable: true,
                completed: false,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn operations_align_names() {
        let ops = vec![
            LabelOperation::AddLabel {
                task_id: "12".into(),
                label: "next_action".into(),
            },
            LabelOperation::ConvertToHeader { task_id: "12".into() },
        ];
        assert_eq!(
            render_operations(&ops, &snapshot()),
            "  +@next_action 12  Buy milk\n  header 12         Buy milk\n"
        );
    }

    #[test]
    fn parsed_name_lists_flags() {
        let parsed = parse_name("** Errands -", NodeKind::Section, &TagSyntax::default());
        insta::assert_snapshot!(render_parsed(&parsed, NodeKind::Section), @r"
        name:  Errands
        kind:  section
        type:  xss
        flags: header
        after: Errands -
        ");
    }

    #[test]
    fn empty_plan_says_so() {
        assert_eq!(render_operations(&[], &snapshot()), "Nothing to do.\n");
    }
}
