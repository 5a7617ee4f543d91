use std::ops::Range;

use crate::model::config::EngineConfig;
use crate::model::tag::{Mode, NodeKind, TagSpec};

/// The characters and markers that make up the tag language
#[derive(Debug, Clone, Copy)]
pub struct TagSyntax<'a> {
    pub parallel: char,
    pub sequential: char,
    pub header: &'a str,
    pub uncheck: &'a str,
    pub disable: char,
}

impl<'a> From<&'a EngineConfig> for TagSyntax<'a> {
    fn from(config: &'a EngineConfig) -> Self {
        TagSyntax {
            parallel: config.parallel_suffix,
            sequential: config.sequential_suffix,
            header: &config.header_marker,
            uncheck: &config.uncheck_marker,
            disable: config.disable_marker,
        }
    }
}

impl Default for TagSyntax<'static> {
    fn default() -> Self {
        TagSyntax {
            parallel: '=',
            sequential: '-',
            header: "**",
            uncheck: "-*",
            disable: '*',
        }
    }
}

impl TagSyntax<'_> {
    /// Map a suffix character to the mode it encodes
    fn classify(&self, c: char) -> Option<Mode> {
        [
            (self.parallel, Mode::Parallel),
            (self.sequential, Mode::Sequential),
        ]
        .iter()
        .find(|(ch, _)| *ch == c)
        .map(|(_, mode)| *mode)
    }
}

/// Something odd about a name that was resolved by a fixed rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagIssue {
    /// Both header and uncheck commands present; header wins
    HeaderOverridesUncheck,
    /// More mode characters than the item kind has levels; the leading
    /// extras stay part of the display name
    ExcessModes { found: usize, allowed: usize },
}

impl std::fmt::Display for TagIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagIssue::HeaderOverridesUncheck => {
                write!(f, "header and uncheck markers both present; header wins")
            }
            TagIssue::ExcessModes { found, allowed } => write!(
                f,
                "{} mode characters but only {} allowed; extras kept in the name",
                found, allowed
            ),
        }
    }
}

/// Result of decoding one raw name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub display_name: String,
    pub tag: TagSpec,
    pub issues: Vec<TagIssue>,
    /// The raw name with header/uncheck command markers removed, when any
    /// were present
    pub consumed_name: Option<String>,
}

/// Repeat the last mode until `width` levels are covered.
/// An empty run stays empty (fully unset).
pub fn expand_modes(run: &[Mode], width: usize) -> Vec<Mode> {
    match run.last() {
        None => Vec::new(),
        Some(&last) => {
            let mut modes: Vec<Mode> = run.iter().copied().take(width).collect();
            modes.resize(width, last);
            modes
        }
    }
}

/// Decode the tag characters carried by a project, section or task name.
///
/// Leading end: one command marker (header or uncheck), then an optional
/// disable marker. Trailing end: an optional header marker, an optional
/// disable marker, then the contiguous run of mode characters.
pub fn parse_name(raw: &str, kind: NodeKind, syntax: &TagSyntax<'_>) -> ParsedName {
    let text = raw.trim();
    let mut start = 0;
    let mut end = text.len();
    let mut tag = TagSpec::default();
    let mut issues = Vec::new();
    let mut command_spans: Vec<Range<usize>> = Vec::new();

    // Leading command marker
    if text.starts_with(syntax.header) {
        tag.header = true;
        command_spans.push(0..syntax.header.len());
        start = skip_ws_forward(text, syntax.header.len(), end);
    } else if text.starts_with(syntax.uncheck) {
        tag.uncheckable_to_checkable = true;
        command_spans.push(0..syntax.uncheck.len());
        start = skip_ws_forward(text, syntax.uncheck.len(), end);
    }

    // Leading disable marker
    if text[start..end].starts_with(syntax.disable) {
        tag.disabled = true;
        start = skip_ws_forward(text, start + syntax.disable.len_utf8(), end);
    }

    // Trailing header marker
    if text[start..end].ends_with(syntax.header) {
        tag.header = true;
        let marker_start = end - syntax.header.len();
        command_spans.push(marker_start..end);
        end = skip_ws_backward(text, start, marker_start);
    }

    // Trailing disable marker
    if text[start..end].ends_with(syntax.disable) {
        tag.disabled = true;
        end = skip_ws_backward(text, start, end - syntax.disable.len_utf8());
    }

    // Trailing run of mode characters
    let mut run = Vec::new();
    let mut run_start = end;
    for (i, c) in text[start..end].char_indices().rev() {
        match syntax.classify(c) {
            Some(mode) => {
                run.push(mode);
                run_start = start + i;
            }
            None => break,
        }
    }
    run.reverse();

    let allowed = kind.max_modes();
    if run.len() > allowed {
        issues.push(TagIssue::ExcessModes {
            found: run.len(),
            allowed,
        });
        let extra = run.len() - allowed;
        let kept_bytes: usize = text[run_start..end]
            .chars()
            .take(extra)
            .map(char::len_utf8)
            .sum();
        run_start += kept_bytes;
        run.drain(..extra);
    }
    tag.modes = expand_modes(&run, allowed);

    if tag.header && tag.uncheckable_to_checkable {
        tag.uncheckable_to_checkable = false;
        issues.push(TagIssue::HeaderOverridesUncheck);
    }

    let consumed_name = if command_spans.is_empty() {
        None
    } else {
        Some(remove_spans(text, &command_spans))
    };

    ParsedName {
        display_name: text[start..run_start].trim_end().to_string(),
        tag,
        issues,
        consumed_name,
    }
}

/// Convenience wrapper returning only the decoded tag
pub fn parse_tag(raw: &str, kind: NodeKind, syntax: &TagSyntax<'_>) -> TagSpec {
    parse_name(raw, kind, syntax).tag
}

fn skip_ws_forward(text: &str, from: usize, limit: usize) -> usize {
    let rest = &text[from..limit];
    from + (rest.len() - rest.trim_start().len())
}

fn skip_ws_backward(text: &str, limit: usize, to: usize) -> usize {
    limit + text[limit..to].trim_end().len()
}

fn remove_spans(text: &str, spans: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    let mut sorted = spans.to_vec();
    sorted.sort_by_key(|r| r.start);
    for span in sorted {
        if span.start >= pos {
            out.push_str(&text[pos..span.start]);
            pos = span.end;
        }
    }
    out.push_str(&text[pos..]);
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Mode::{Parallel as P, Sequential as S};

    fn parse(raw: &str, kind: NodeKind) -> ParsedName {
        parse_name(raw, kind, &TagSyntax::default())
    }

    // --- Shorthand expansion ---

    #[test]
    fn section_single_char_fills_both_levels() {
        let parsed = parse("Errands =", NodeKind::Section);
        assert_eq!(parsed.tag.modes, vec![P, P]);
        assert_eq!(parsed.display_name, "Errands");
    }

    #[test]
    fn project_two_chars_repeat_last() {
        let parsed = parse("Home =-", NodeKind::Project);
        assert_eq!(parsed.tag.modes, vec![P, S, S]);
        assert_eq!(parsed.display_name, "Home");
    }

    #[test]
    fn project_full_width_kept_verbatim() {
        assert_eq!(parse("Work -=-", NodeKind::Project).tag.modes, vec![S, P, S]);
        assert_eq!(parse("Work ==", NodeKind::Project).tag.modes, vec![P, P, P]);
        assert_eq!(parse("Work -", NodeKind::Project).tag.modes, vec![S, S, S]);
    }

    #[test]
    fn task_takes_one_level() {
        assert_eq!(parse("Task -", NodeKind::Task).tag.modes, vec![S]);
        assert_eq!(parse("Task =", NodeKind::Subtask).tag.modes, vec![P]);
    }

    #[test]
    fn no_suffix_is_fully_unset() {
        let parsed = parse("No suffix", NodeKind::Project);
        assert!(parsed.tag.modes.is_empty());
        assert_eq!(parsed.display_name, "No suffix");
        assert!(parsed.issues.is_empty());
        assert!(parsed.consumed_name.is_none());
    }

    #[test]
    fn expand_boundaries() {
        assert_eq!(expand_modes(&[], 3), Vec::<Mode>::new());
        assert_eq!(expand_modes(&[S], 1), vec![S]);
        assert_eq!(expand_modes(&[P, S, P], 3), vec![P, S, P]);
        assert_eq!(expand_modes(&[P], 2), vec![P, P]);
    }

    // --- Scanning ---

    #[test]
    fn only_contiguous_trailing_run_counts() {
        let parsed = parse("A = B", NodeKind::Section);
        assert!(parsed.tag.modes.is_empty());
        assert_eq!(parsed.display_name, "A = B");

        let parsed = parse("A -x=", NodeKind::Project);
        assert_eq!(parsed.tag.modes, vec![P, P, P]);
        assert_eq!(parsed.display_name, "A -x");
    }

    #[test]
    fn suffix_without_space_is_still_a_tag() {
        let parsed = parse("Pay bills-", NodeKind::Task);
        assert_eq!(parsed.tag.modes, vec![S]);
        assert_eq!(parsed.display_name, "Pay bills");
    }

    #[test]
    fn excess_mode_chars_stay_in_name() {
        let parsed = parse("Task =-", NodeKind::Task);
        assert_eq!(parsed.tag.modes, vec![S]);
        assert_eq!(parsed.display_name, "Task =");
        assert_eq!(
            parsed.issues,
            vec![TagIssue::ExcessModes {
                found: 2,
                allowed: 1
            }]
        );
    }

    #[test]
    fn custom_suffix_characters() {
        let syntax = TagSyntax {
            parallel: '+',
            sequential: '~',
            ..TagSyntax::default()
        };
        let parsed = parse_name("Garden ~+", NodeKind::Project, &syntax);
        assert_eq!(parsed.tag.modes, vec![S, P, P]);
        assert_eq!(parsed.display_name, "Garden");
        // Default characters mean nothing now
        assert!(parse_tag("Garden -", NodeKind::Project, &syntax).modes.is_empty());
    }

    // --- Markers ---

    #[test]
    fn disable_marker_leading_or_trailing() {
        let lead = parse("*Kanban", NodeKind::Section);
        assert!(lead.tag.disabled);
        assert_eq!(lead.display_name, "Kanban");

        let trail = parse("Kanban *", NodeKind::Section);
        assert!(trail.tag.disabled);
        assert_eq!(trail.display_name, "Kanban");
        assert!(trail.consumed_name.is_none());
    }

    #[test]
    fn disable_marker_after_mode_run() {
        let parsed = parse("Board -*", NodeKind::Section);
        assert!(parsed.tag.disabled);
        assert_eq!(parsed.tag.modes, vec![S, S]);
        assert_eq!(parsed.display_name, "Board");
    }

    #[test]
    fn header_prefix_is_consumed() {
        let parsed = parse("** Reference =", NodeKind::Section);
        assert!(parsed.tag.header);
        assert_eq!(parsed.tag.modes, vec![P, P]);
        assert_eq!(parsed.display_name, "Reference");
        assert_eq!(parsed.consumed_name.as_deref(), Some("Reference ="));
    }

    #[test]
    fn header_suffix_is_consumed() {
        let parsed = parse("Notes **", NodeKind::Task);
        assert!(parsed.tag.header);
        assert!(!parsed.tag.disabled);
        assert_eq!(parsed.display_name, "Notes");
        assert_eq!(parsed.consumed_name.as_deref(), Some("Notes"));
    }

    #[test]
    fn uncheck_prefix() {
        let parsed = parse("-* Chores -", NodeKind::Project);
        assert!(parsed.tag.uncheckable_to_checkable);
        assert!(!parsed.tag.header);
        assert_eq!(parsed.tag.modes, vec![S, S, S]);
        assert_eq!(parsed.display_name, "Chores");
        assert_eq!(parsed.consumed_name.as_deref(), Some("Chores -"));
    }

    #[test]
    fn header_beats_uncheck() {
        let parsed = parse("-* Mixed **", NodeKind::Task);
        assert!(parsed.tag.header);
        assert!(!parsed.tag.uncheckable_to_checkable);
        assert_eq!(parsed.issues, vec![TagIssue::HeaderOverridesUncheck]);
        assert_eq!(parsed.consumed_name.as_deref(), Some("Mixed"));
    }

    #[test]
    fn header_and_disable_coexist() {
        let parsed = parse("** *Archive", NodeKind::Section);
        assert!(parsed.tag.header);
        assert!(parsed.tag.disabled);
        assert_eq!(parsed.display_name, "Archive");
        assert_eq!(parsed.consumed_name.as_deref(), Some("*Archive"));
    }

    #[test]
    fn name_made_only_of_tags() {
        let parsed = parse("===", NodeKind::Project);
        assert_eq!(parsed.tag.modes, vec![P, P, P]);
        assert_eq!(parsed.display_name, "");
    }

    #[test]
    fn surrounding_whitespace_ignored() {
        let parsed = parse("  Home =  ", NodeKind::Project);
        assert_eq!(parsed.tag.modes, vec![P, P, P]);
        assert_eq!(parsed.display_name, "Home");
    }
}
