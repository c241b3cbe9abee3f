//! Canvas node references
//!
//! An embed such as `![[boards/plan.canvas#3f9a0c]]` is rendered by the host
//! as a placeholder whose `src` attribute holds `boards/plan.canvas#3f9a0c`.
//! [`NodeReference::parse`] splits that string into the canvas path and the
//! node id.

use crate::error::{EmbedError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

// Path characters are allow-listed so that ordinary note embeds such as
// `note#heading` or `a.canvas#^block` never match.
static NODE_REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w\s\-/.]+\.canvas)#([a-f0-9]+)$").expect("node reference regex")
});

/// A reference to one node inside a canvas document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeReference {
    /// Canvas path as written in the embed, not yet resolved.
    pub canvas_path: String,
    /// Lowercase hex node id.
    pub node_id: String,
}

impl NodeReference {
    pub fn new(canvas_path: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            canvas_path: canvas_path.into(),
            node_id: node_id.into(),
        }
    }

    /// Parse a placeholder `src` string.
    pub fn parse(src: &str) -> Result<Self> {
        let caps = NODE_REFERENCE_REGEX
            .captures(src)
            .ok_or_else(|| EmbedError::Parse(src.to_string()))?;

        Ok(Self {
            canvas_path: caps[1].to_string(),
            node_id: caps[2].to_string(),
        })
    }

    /// Whether `src` is a canvas node reference, without allocating.
    pub fn is_node_reference(src: &str) -> bool {
        NODE_REFERENCE_REGEX.is_match(src)
    }
}

impl fmt::Display for NodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.canvas_path, self.node_id)
    }
}

impl FromStr for NodeReference {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_simple_reference() {
        let reference = NodeReference::parse("note.canvas#abc123").unwrap();
        assert_eq!(reference.canvas_path, "note.canvas");
        assert_eq!(reference.node_id, "abc123");
    }

    #[test]
    fn test_parse_nested_path_with_spaces() {
        let reference = NodeReference::parse("Projects/Q3 plan/board-v2.canvas#0f9e").unwrap();
        assert_eq!(reference.canvas_path, "Projects/Q3 plan/board-v2.canvas");
        assert_eq!(reference.node_id, "0f9e");
    }

    #[test]
    fn test_rejects_non_canvas_targets() {
        assert!(NodeReference::parse("note.md#abc123").is_err());
        assert!(NodeReference::parse("note#heading").is_err());
        assert!(NodeReference::parse("note.canvas").is_err());
        assert!(!NodeReference::is_node_reference("photo.png"));
        assert!(NodeReference::is_node_reference("note.canvas#abc123"));
    }

    #[test]
    fn test_rejects_non_hex_ids() {
        assert!(NodeReference::parse("note.canvas#ABC123").is_err());
        assert!(NodeReference::parse("note.canvas#^block").is_err());
        assert!(NodeReference::parse("note.canvas#xyz").is_err());
        assert!(NodeReference::parse("note.canvas#").is_err());
    }

    #[test]
    fn test_rejects_disallowed_path_characters() {
        assert!(NodeReference::parse("a|b.canvas#abc").is_err());
        assert!(NodeReference::parse("[[a.canvas#abc]]").is_err());
        assert!(NodeReference::parse("a.canvas#abc extra").is_err());
    }

    #[test]
    fn test_parse_error_carries_input() {
        let err = NodeReference::parse("bad#ref").unwrap_err();
        assert_eq!(err, EmbedError::Parse("bad#ref".to_string()));
    }

    #[test]
    fn test_display_matches_source() {
        let reference: NodeReference = "dir/board.canvas#beef".parse().unwrap();
        assert_eq!(reference.to_string(), "dir/board.canvas#beef");
    }

    proptest! {
        #[test]
        fn prop_grammar_strings_parse_exactly(
            stem in "[a-zA-Z0-9_ ./-]{1,24}",
            id in "[a-f0-9]{1,16}",
        ) {
            let src = format!("{stem}.canvas#{id}");
            let reference = NodeReference::parse(&src).unwrap();
            prop_assert_eq!(reference.canvas_path, format!("{stem}.canvas"));
            prop_assert_eq!(reference.node_id, id);
        }

        #[test]
        fn prop_forbidden_characters_never_parse(
            stem in "[a-z]{1,8}",
            bad in "[|\\[\\]!?*<>:\"]",
            id in "[a-f0-9]{1,8}",
        ) {
            let src = format!("{stem}{bad}.canvas#{id}");
            prop_assert!(NodeReference::parse(&src).is_err());
        }
    }
}
