//! Line-level conversation parsing: splits raw text into typed nodes.
//!
//! Each non-blank line becomes one node. Lines matching `Author: message`
//! get a role inferred from the author label; marker phrases such as
//! `ctx::` or `eureka::` populate `float_markers`; everything else falls
//! back to a plain message node (a parse warning, never an error).

use std::sync::LazyLock;

use regex::Regex;

use crate::node::{
    FloatMarkers, FloatNode, Intent, NodeContent, NodeType, Position, Role, Semantic,
};

static AUTHOR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][\w .\-]{0,63}):\s+(\S.*)$").unwrap());
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9']+").unwrap());
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(ctx|dispatch|bridge|highlight|eureka|decision|ritual)::\s*([^\n]*)")
        .unwrap()
});

const MARKER_LABEL_MAX: usize = 80;

/// Pluggable author-label classifier. The default is a substring
/// heuristic; callers may substitute a lookup table or model.
pub type RoleClassifier = fn(&str) -> Role;

/// Default classifier: an author label containing "assistant"
/// (case-insensitive) is the assistant, anyone else is human.
pub fn default_role_classifier(author: &str) -> Role {
    if author.to_lowercase().contains("assistant") {
        Role::Assistant
    } else {
        Role::Human
    }
}

/// Tokenize text into lowercase words. Apostrophes survive inside words,
/// leading and trailing ones are trimmed.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Scan a line for marker phrases. Returns the markers (if any) and
/// whether a `ritual::` phrase was seen, which retypes the node.
fn scan_markers(line: &str) -> (Option<FloatMarkers>, bool) {
    let mut markers = FloatMarkers::default();
    let mut ritual = false;

    for cap in MARKER.captures_iter(line) {
        let label: String = cap[2].trim().chars().take(MARKER_LABEL_MAX).collect();
        match cap[1].to_lowercase().as_str() {
            "ctx" => markers.context = Some(label),
            "dispatch" => markers.dispatch = Some(label),
            "bridge" => markers.bridge = Some(label),
            "highlight" => markers.highlight = Some(label),
            "eureka" => markers.eureka = Some(label),
            "decision" => markers.decision = Some(label),
            "ritual" => ritual = true,
            _ => unreachable!(),
        }
    }

    if markers.is_empty() {
        (None, ritual)
    } else {
        (Some(markers), ritual)
    }
}

/// Parse raw conversation text into an ordered node sequence.
///
/// Indices are assigned sequentially from 0 in input order; depth is
/// always 0 here (the base parser infers no nesting). Empty input
/// yields an empty sequence, which callers treat as an empty result.
pub fn parse_lines(text: &str, classify: RoleClassifier) -> Vec<FloatNode> {
    let mut nodes = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let index = nodes.len();
        nodes.push(parse_line(line, index, classify));
    }

    nodes
}

fn parse_line(line: &str, index: usize, classify: RoleClassifier) -> FloatNode {
    let (markers, ritual) = scan_markers(line);

    let (role, author, body) = match AUTHOR_LINE.captures(line) {
        // Marker phrases use a doubled colon, so a marker-prefixed line
        // never matches AUTHOR_LINE (no whitespace after the first ':').
        Some(cap) => {
            let author = cap[1].trim().to_string();
            let body = cap[2].to_string();
            (Some(classify(&author)), Some(author), body)
        }
        None => (None, None, line.to_string()),
    };

    let node_type = if ritual {
        NodeType::Ritual
    } else if markers.as_ref().is_some_and(|m| m.dispatch.is_some()) {
        NodeType::Dispatch
    } else {
        NodeType::Message
    };

    let mut content = NodeContent::raw_only(body);
    if let Some(author) = author {
        content.structured = Some(serde_json::json!({ "author": author }));
    }

    let semantic = content.raw.contains('?').then(|| Semantic {
        intent: Some(Intent::Question),
        tone: None,
        certainty: None,
    });

    FloatNode {
        id: uuid::Uuid::new_v4(),
        node_type,
        role,
        content,
        semantic,
        float_markers: markers,
        children: Vec::new(),
        position: Position::top_level(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<FloatNode> {
        parse_lines(text, default_role_classifier)
    }

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(tokenize("Hello, world!"), vec!["hello", "world"]);
    }

    #[test]
    fn test_tokenize_apostrophes() {
        assert_eq!(tokenize("Don't 'quote' me"), vec!["don't", "quote", "me"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \t\n ").is_empty());
    }

    #[test]
    fn test_author_line_roles() {
        let nodes = parse("Alice: Hello\nAssistant: Hi there");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].role, Some(Role::Human));
        assert_eq!(nodes[1].role, Some(Role::Assistant));
        assert_eq!(nodes[0].content.raw, "Hello");
    }

    #[test]
    fn test_assistant_substring_case_insensitive() {
        assert_eq!(default_role_classifier("My ASSISTANT bot"), Role::Assistant);
        assert_eq!(default_role_classifier("Bob"), Role::Human);
    }

    #[test]
    fn test_author_preserved_in_structured() {
        let nodes = parse("Alice: Hello");
        let structured = nodes[0].content.structured.as_ref().unwrap();
        assert_eq!(structured["author"], "Alice");
    }

    #[test]
    fn test_unlabeled_line_is_generic_message() {
        let nodes = parse("just a thought with no author");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].role, None);
        assert_eq!(nodes[0].node_type, NodeType::Message);
        assert_eq!(nodes[0].content.raw, "just a thought with no author");
    }

    #[test]
    fn test_indices_contiguous_from_zero() {
        let nodes = parse("a\n\nb\n   \nc: hello\n");
        let indices: Vec<usize> = nodes.iter().map(|n| n.position.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(nodes.iter().all(|n| n.position.depth == 0));
    }

    #[test]
    fn test_empty_input_yields_no_nodes() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n  \n").is_empty());
    }

    #[test]
    fn test_question_sets_intent() {
        let nodes = parse("Alice: How are you?\nBob: Fine");
        assert_eq!(
            nodes[0].semantic.as_ref().unwrap().intent,
            Some(Intent::Question)
        );
        assert!(nodes[1].semantic.is_none());
    }

    #[test]
    fn test_marker_line_not_mistaken_for_author() {
        let nodes = parse("dispatch:: shipping the zine tonight");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].role, None);
        assert_eq!(nodes[0].node_type, NodeType::Dispatch);
        let markers = nodes[0].float_markers.as_ref().unwrap();
        assert_eq!(markers.dispatch.as_deref(), Some("shipping the zine tonight"));
    }

    #[test]
    fn test_inline_marker_inside_authored_line() {
        let nodes = parse("Alice: big insight here eureka:: the graph is the product");
        assert_eq!(nodes[0].role, Some(Role::Human));
        let markers = nodes[0].float_markers.as_ref().unwrap();
        assert_eq!(markers.eureka.as_deref(), Some("the graph is the product"));
    }

    #[test]
    fn test_ritual_marker_retypes_node() {
        let nodes = parse("ritual:: morning pages");
        assert_eq!(nodes[0].node_type, NodeType::Ritual);
    }

    #[test]
    fn test_ctx_marker() {
        let nodes = parse("ctx:: 2024-03-01 working session");
        let markers = nodes[0].float_markers.as_ref().unwrap();
        assert_eq!(markers.context.as_deref(), Some("2024-03-01 working session"));
    }

    #[test]
    fn test_marker_label_truncated() {
        let long = "x".repeat(300);
        let nodes = parse(&format!("bridge:: {long}"));
        let markers = nodes[0].float_markers.as_ref().unwrap();
        assert_eq!(markers.bridge.as_ref().unwrap().len(), 80);
    }

    #[test]
    fn test_fresh_ids_per_node() {
        let nodes = parse("a\nb\nc");
        let mut ids: Vec<_> = nodes.iter().map(|n| n.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }
}
