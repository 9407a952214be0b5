//! Emergent themes: weighted concepts clustered from node text.
//!
//! The deterministic strategy here is pure term frequency. The
//! oracle-backed strategy lives with the oracle client and must produce
//! the same `Concept` shape, falling back to this one on any failure.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::node::FloatNode;
use crate::parser::tokenize;

/// A pointer from a concept back into the node sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeReference {
    pub node_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
}

/// A weighted, named theme aggregating references to multiple nodes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Concept {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub appearances: Vec<NodeReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<NodeReference>,
    pub weight: f64,
}

/// At most this many concepts survive extraction, highest weight first.
pub const MAX_CONCEPTS: usize = 10;

/// Words too common to anchor a concept.
const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "an", "and", "are", "as", "at", "be", "been", "but", "by",
    "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he", "her",
    "here", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "like", "me",
    "my", "no", "not", "of", "on", "or", "our", "out", "she", "so", "some", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "this", "to", "up", "was", "we",
    "were", "what", "when", "which", "who", "will", "with", "would", "you", "your",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Significant terms of one node: tokenized, stop words and short
/// tokens removed, deduplicated.
pub fn significant_terms(node: &FloatNode) -> BTreeSet<String> {
    tokenize(&node.content.raw)
        .into_iter()
        .filter(|t| t.len() >= 3 && !is_stop_word(t))
        .collect()
}

/// Deterministic concept extraction by term frequency.
///
/// A term shared by at least two nodes (or appearing at all, when the
/// document has a single node) becomes a concept titled by the term.
/// Weight is the fraction of nodes containing the term, clamped to
/// [0, 1]; every contributing node is listed with strength 1.0.
pub fn extract_concepts(nodes: &[FloatNode]) -> BTreeMap<String, Concept> {
    if nodes.is_empty() {
        return BTreeMap::new();
    }

    let mut term_nodes: BTreeMap<String, Vec<&FloatNode>> = BTreeMap::new();
    for node in nodes {
        for term in significant_terms(node) {
            term_nodes.entry(term).or_default().push(node);
        }
    }

    let min_nodes = if nodes.len() == 1 { 1 } else { 2 };
    let total = nodes.len() as f64;

    let mut candidates: Vec<Concept> = term_nodes
        .into_iter()
        .filter(|(_, containing)| containing.len() >= min_nodes)
        .map(|(term, containing)| {
            let weight = (containing.len() as f64 / total).clamp(0.0, 1.0);
            let appearances = containing
                .iter()
                .map(|node| NodeReference {
                    node_id: node.id,
                    chunk: Some(excerpt(&node.content.raw)),
                    context: None,
                    strength: Some(1.0),
                })
                .collect();
            Concept {
                title: term,
                description: None,
                appearances,
                references: Vec::new(),
                weight,
            }
        })
        .collect();

    // Highest weight first; title breaks ties so the cut is stable.
    candidates.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.title.cmp(&b.title))
    });
    candidates.truncate(MAX_CONCEPTS);

    let mut concepts = BTreeMap::new();
    for concept in candidates {
        merge_concept(&mut concepts, concept);
    }
    concepts
}

/// Insert a concept, merging on title collision: appearances are
/// concatenated and the maximum weight wins.
pub fn merge_concept(concepts: &mut BTreeMap<String, Concept>, incoming: Concept) {
    match concepts.get_mut(&incoming.title) {
        Some(existing) => {
            existing.weight = existing.weight.max(incoming.weight).clamp(0.0, 1.0);
            existing.appearances.extend(incoming.appearances);
            existing.references.extend(incoming.references);
            if existing.description.is_none() {
                existing.description = incoming.description;
            }
        }
        None => {
            concepts.insert(incoming.title.clone(), incoming);
        }
    }
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 120;
    if text.len() <= MAX {
        text.to_string()
    } else {
        let mut end = MAX;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &text[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{default_role_classifier, parse_lines};

    fn nodes(text: &str) -> Vec<FloatNode> {
        parse_lines(text, default_role_classifier)
    }

    #[test]
    fn test_stop_words_sorted_for_binary_search() {
        let mut sorted = STOP_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOP_WORDS);
    }

    #[test]
    fn test_shared_term_becomes_concept() {
        let nodes = nodes("Alice: the quantum experiment worked\nBob: quantum results look solid");
        let concepts = extract_concepts(&nodes);
        let quantum = concepts.get("quantum").expect("shared term clustered");
        assert_eq!(quantum.appearances.len(), 2);
        assert!((quantum.weight - 1.0).abs() < 1e-12);
        assert!(quantum.appearances.iter().all(|r| r.strength == Some(1.0)));
    }

    #[test]
    fn test_unshared_terms_dropped() {
        let nodes = nodes("Alice: purple elephants\nBob: orange giraffes");
        let concepts = extract_concepts(&nodes);
        assert!(concepts.is_empty());
    }

    #[test]
    fn test_single_node_document_keeps_terms() {
        let nodes = nodes("solo reflection about gardens and gardens again");
        let concepts = extract_concepts(&nodes);
        assert!(concepts.contains_key("gardens"));
        assert!((concepts["gardens"].weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weight_is_containing_fraction() {
        let nodes = nodes("a: project kickoff\nb: project scope\nc: unrelated lunch plans\nd: more lunch talk");
        let concepts = extract_concepts(&nodes);
        assert!((concepts["project"].weight - 0.5).abs() < 1e-12);
        assert!((concepts["lunch"].weight - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_stop_words_never_concepts() {
        let nodes = nodes("Alice: this is the thing\nBob: this is the thing");
        let concepts = extract_concepts(&nodes);
        assert!(!concepts.contains_key("this"));
        assert!(!concepts.contains_key("the"));
        // "thing" is content-bearing and shared
        assert!(concepts.contains_key("thing"));
    }

    #[test]
    fn test_cap_at_max_concepts() {
        let mut lines = Vec::new();
        // 15 shared terms across two nodes
        let terms: Vec<String> = (0..15).map(|i| format!("term{i:02}")).collect();
        lines.push(format!("Alice: {}", terms.join(" ")));
        lines.push(format!("Bob: {}", terms.join(" ")));
        let nodes = nodes(&lines.join("\n"));
        let concepts = extract_concepts(&nodes);
        assert_eq!(concepts.len(), MAX_CONCEPTS);
    }

    #[test]
    fn test_merge_keeps_max_weight_and_all_appearances() {
        let mut concepts = BTreeMap::new();
        let a = Concept {
            title: "drift".into(),
            description: None,
            appearances: vec![],
            references: vec![],
            weight: 0.4,
        };
        let b = Concept {
            title: "drift".into(),
            description: Some("movement of ideas".into()),
            appearances: vec![NodeReference {
                node_id: Uuid::new_v4(),
                chunk: None,
                context: None,
                strength: Some(0.9),
            }],
            references: vec![],
            weight: 0.7,
        };
        merge_concept(&mut concepts, a);
        merge_concept(&mut concepts, b);
        assert_eq!(concepts.len(), 1);
        let merged = &concepts["drift"];
        assert!((merged.weight - 0.7).abs() < 1e-12);
        assert_eq!(merged.appearances.len(), 1);
        assert_eq!(merged.description.as_deref(), Some("movement of ideas"));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let text = "Alice: memory systems and memory palaces\nBob: palaces of memory\nCara: systems thinking";
        let a = extract_concepts(&nodes(text));
        let b = extract_concepts(&nodes(text));
        let keys_a: Vec<_> = a.keys().collect();
        let keys_b: Vec<_> = b.keys().collect();
        assert_eq!(keys_a, keys_b);
        for (k, c) in &a {
            assert_eq!(c.appearances.len(), b[k].appearances.len());
        }
    }
}
