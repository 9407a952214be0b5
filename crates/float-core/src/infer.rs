//! Deterministic edge inference over a parsed node sequence.
//!
//! Adjacency rules run first and are authoritative; later rules never
//! duplicate an existing (type, source, target) triple. Re-running on
//! the same nodes yields an identical edge set modulo edge ids.

use std::collections::HashSet;

use uuid::Uuid;

use crate::concept::significant_terms;
use crate::edge::{EdgeType, FloatEdge};
use crate::node::FloatNode;

/// Non-adjacent nodes sharing at least this many significant terms
/// get a `references` edge.
const REFERENCE_OVERLAP_MIN: usize = 2;

/// Shared-term count that saturates the `references` edge weight.
const REFERENCE_OVERLAP_SATURATION: usize = 4;

/// Infer the edge set for a node sequence.
///
/// Rules, in precedence order:
/// 1. `responds_to` i → i-1 with weight 1.0 when the speaker changed;
///    `elaborates` i → i-1 when the same speaker continued.
/// 2. `questions` i → i-1 when the node text contains a question mark
///    and rule 1 produced no `responds_to` for that pair.
/// 3. `references` i → j for non-adjacent pairs (j < i-1) sharing
///    enough significant terms.
pub fn infer_edges(nodes: &[FloatNode]) -> Vec<FloatEdge> {
    let mut edges: Vec<FloatEdge> = Vec::new();
    let mut seen: HashSet<(EdgeType, Uuid, Uuid)> = HashSet::new();

    let mut push = |edges: &mut Vec<FloatEdge>,
                    seen: &mut HashSet<(EdgeType, Uuid, Uuid)>,
                    edge: FloatEdge| {
        if edge.source != edge.target && seen.insert(edge.dedup_key()) {
            edges.push(edge);
        }
    };

    // Rule 1: turn-taking over adjacent pairs.
    for i in 1..nodes.len() {
        let (prev, curr) = (&nodes[i - 1], &nodes[i]);
        let edge_type = if curr.role == prev.role {
            EdgeType::Elaborates
        } else {
            EdgeType::RespondsTo
        };
        let weight = match edge_type {
            EdgeType::RespondsTo => Some(1.0),
            _ => None,
        };
        push(&mut edges, &mut seen, FloatEdge::new(edge_type, curr.id, prev.id, weight));
    }

    // Rule 2: questions point at the nearest earlier node unless that
    // pair already carries a responds_to edge.
    for i in 1..nodes.len() {
        let (prev, curr) = (&nodes[i - 1], &nodes[i]);
        if !curr.content.raw.contains('?') {
            continue;
        }
        if seen.contains(&(EdgeType::RespondsTo, curr.id, prev.id)) {
            continue;
        }
        push(
            &mut edges,
            &mut seen,
            FloatEdge::new(EdgeType::Questions, curr.id, prev.id, None),
        );
    }

    // Rule 3: keyword overlap across non-adjacent pairs.
    let term_sets: Vec<_> = nodes.iter().map(significant_terms).collect();
    for i in 2..nodes.len() {
        for j in 0..i.saturating_sub(1) {
            let shared = term_sets[i].intersection(&term_sets[j]).count();
            if shared < REFERENCE_OVERLAP_MIN {
                continue;
            }
            let weight = shared.min(REFERENCE_OVERLAP_SATURATION) as f64
                / REFERENCE_OVERLAP_SATURATION as f64;
            push(
                &mut edges,
                &mut seen,
                FloatEdge::new(EdgeType::References, nodes[i].id, nodes[j].id, Some(weight)),
            );
        }
    }

    edges
}
