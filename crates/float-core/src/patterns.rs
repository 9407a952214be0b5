//! Pattern counters derived purely from nodes, edges, and markers.

use serde::{Deserialize, Serialize};

use crate::edge::{EdgeType, FloatEdge};
use crate::node::{FloatNode, NodeType};

/// Five non-negative counters summarizing conversational structure.
/// `ctx_markers` and `float_dispatches` are distinct: the former counts
/// `context` markers, the latter `dispatch` markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternStats {
    pub ctx_markers: u32,
    pub float_dispatches: u32,
    pub ritual_invocations: u32,
    pub bridge_creates: u32,
    pub persona_switches: u32,
}

/// Pure function over the document; recomputing on an unchanged
/// document is idempotent.
pub fn compute_patterns(nodes: &[FloatNode], edges: &[FloatEdge]) -> PatternStats {
    let ctx_markers = nodes.iter().filter(|n| n.has_marker("context")).count() as u32;
    let float_dispatches = nodes.iter().filter(|n| n.has_marker("dispatch")).count() as u32;
    let ritual_invocations = nodes
        .iter()
        .filter(|n| n.node_type == NodeType::Ritual)
        .count() as u32;

    let bridge_edges = edges
        .iter()
        .filter(|e| e.edge_type == EdgeType::Bridges)
        .count();
    let bridge_markers = nodes.iter().filter(|n| n.has_marker("bridge")).count();
    let bridge_creates = (bridge_edges + bridge_markers) as u32;

    let persona_switches = nodes
        .windows(2)
        .filter(|pair| pair[0].role != pair[1].role)
        .count() as u32;

    PatternStats {
        ctx_markers,
        float_dispatches,
        ritual_invocations,
        bridge_creates,
        persona_switches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::infer_edges;
    use crate::parser::{default_role_classifier, parse_lines};

    fn parse(text: &str) -> Vec<FloatNode> {
        parse_lines(text, default_role_classifier)
    }

    #[test]
    fn test_marker_counters_are_distinct() {
        let nodes = parse("ctx:: session start\ndispatch:: launch the zine\nctx:: later");
        let stats = compute_patterns(&nodes, &[]);
        assert_eq!(stats.ctx_markers, 2);
        assert_eq!(stats.float_dispatches, 1);
    }

    #[test]
    fn test_ritual_count() {
        let nodes = parse("ritual:: morning pages\nAlice: regular message");
        let stats = compute_patterns(&nodes, &[]);
        assert_eq!(stats.ritual_invocations, 1);
    }

    #[test]
    fn test_bridge_creates_sums_edges_and_markers() {
        let nodes = parse("bridge:: to yesterday's thread\nAlice: hello");
        let mut edges = infer_edges(&nodes);
        edges.push(FloatEdge::new(
            EdgeType::Bridges,
            nodes[0].id,
            nodes[1].id,
            None,
        ));
        let stats = compute_patterns(&nodes, &edges);
        assert_eq!(stats.bridge_creates, 2);
    }

    #[test]
    fn test_persona_switches() {
        let nodes = parse("Assistant: hi\nUser: hello\nUser: more\nAssistant: reply");
        let stats = compute_patterns(&nodes, &[]);
        // assistant→human, human→human (no), human→assistant
        assert_eq!(stats.persona_switches, 2);
    }

    #[test]
    fn test_idempotent() {
        let nodes = parse("ctx:: a\nAssistant: hi\nUser: bye");
        let edges = infer_edges(&nodes);
        let a = compute_patterns(&nodes, &edges);
        let b = compute_patterns(&nodes, &edges);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_document() {
        let stats = compute_patterns(&[], &[]);
        assert_eq!(stats, PatternStats::default());
    }
}
