use serde::{Deserialize, Serialize};

/// Processing mode for the children of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Only the first eligible child is active
    Sequential,
    /// Every eligible leaf is active
    Parallel,
    /// No tag at this level
    Unset,
}

impl Mode {
    /// Short form used in logs and text output (`s`, `p`, `x`)
    pub fn short(self) -> char {
        match self {
            Mode::Sequential => 's',
            Mode::Parallel => 'p',
            Mode::Unset => 'x',
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Sequential => write!(f, "sequential"),
            Mode::Parallel => write!(f, "parallel"),
            Mode::Unset => write!(f, "unset"),
        }
    }
}

/// The kind of an item in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Project,
    Section,
    /// A parentless task
    Task,
    /// A task at any depth below a parentless task
    Subtask,
}

/// Levels below a project: sections (0), tasks in a section (1), subtasks (2).
/// Every subtask depth shares level 2.
pub const LEVEL_COUNT: usize = 3;

impl NodeKind {
    /// The level that this kind's children live on
    pub fn child_level(self) -> usize {
        match self {
            NodeKind::Project => 0,
            NodeKind::Section => 1,
            NodeKind::Task | NodeKind::Subtask => 2,
        }
    }

    /// How many mode characters a name of this kind may carry
    pub fn max_modes(self) -> usize {
        LEVEL_COUNT - self.child_level()
    }

    pub fn is_task(self) -> bool {
        matches!(self, NodeKind::Task | NodeKind::Subtask)
    }

    pub fn parse(s: &str) -> Option<NodeKind> {
        match s {
            "project" => Some(NodeKind::Project),
            "section" => Some(NodeKind::Section),
            "task" => Some(NodeKind::Task),
            "subtask" => Some(NodeKind::Subtask),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Project => write!(f, "project"),
            NodeKind::Section => write!(f, "section"),
            NodeKind::Task => write!(f, "task"),
            NodeKind::Subtask => write!(f, "subtask"),
        }
    }
}

/// Decoded tag information for one item name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagSpec {
    /// One mode per level below the item, already shorthand-expanded.
    /// Empty when the name carries no mode characters.
    pub modes: Vec<Mode>,
    /// Disable marker present (leading or trailing)
    pub disabled: bool,
    /// Header command present: make the item and its descendants non-checkable
    pub header: bool,
    /// Uncheck command present: restore the item and its descendants to checkable
    pub uncheckable_to_checkable: bool,
}

impl TagSpec {
    /// Mode this tag assigns to the given absolute level, if any.
    ///
    /// `own_level` is the child level of the item carrying the tag.
    pub fn mode_for_level(&self, own_level: usize, level: usize) -> Option<Mode> {
        let idx = level.checked_sub(own_level)?;
        self.modes.get(idx).copied()
    }

    /// Render modes in `s`/`p` notation, padded with `x` to the full width
    pub fn type_string(&self, kind: NodeKind) -> String {
        let pad = LEVEL_COUNT - kind.max_modes();
        let mut out: String = std::iter::repeat_n('x', pad).collect();
        if self.modes.is_empty() {
            out.extend(std::iter::repeat_n('x', kind.max_modes()));
        } else {
            out.extend(self.modes.iter().map(|m| m.short()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_levels_and_widths() {
        assert_eq!(NodeKind::Project.max_modes(), 3);
        assert_eq!(NodeKind::Section.max_modes(), 2);
        assert_eq!(NodeKind::Task.max_modes(), 1);
        assert_eq!(NodeKind::Subtask.max_modes(), 1);
        assert_eq!(NodeKind::Subtask.child_level(), 2);
    }

    #[test]
    fn mode_for_level_indexes_from_own_level() {
        let tag = TagSpec {
            modes: vec![Mode::Sequential, Mode::Parallel, Mode::Sequential],
            ..Default::default()
        };
        assert_eq!(tag.mode_for_level(0, 0), Some(Mode::Sequential));
        assert_eq!(tag.mode_for_level(0, 1), Some(Mode::Parallel));
        assert_eq!(tag.mode_for_level(0, 2), Some(Mode::Sequential));

        let section = TagSpec {
            modes: vec![Mode::Parallel, Mode::Sequential],
            ..Default::default()
        };
        assert_eq!(section.mode_for_level(1, 0), None);
        assert_eq!(section.mode_for_level(1, 1), Some(Mode::Parallel));
        assert_eq!(section.mode_for_level(1, 2), Some(Mode::Sequential));
    }

    #[test]
    fn empty_tag_assigns_nothing() {
        let tag = TagSpec::default();
        assert_eq!(tag.mode_for_level(0, 2), None);
    }

    #[test]
    fn type_string_pads_with_x() {
        let tag = TagSpec {
            modes: vec![Mode::Sequential, Mode::Parallel],
            ..Default::default()
        };
        assert_eq!(tag.type_string(NodeKind::Section), "xsp");
        assert_eq!(TagSpec::default().type_string(NodeKind::Task), "xxx");
    }
}
