pub mod tag_parser;

pub use tag_parser::{ParsedName, TagIssue, TagSyntax, expand_modes, parse_name, parse_tag};
