//! The FloatAST root document: assembly and validation.
//!
//! The assembler owns node/edge/concept construction for one parse
//! pass; afterwards the document is immutable as far as the query
//! engine and fragment extractor are concerned.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::concept::{Concept, extract_concepts};
use crate::edge::FloatEdge;
use crate::error::{ValidationError, ValidationWarning};
use crate::infer::infer_edges;
use crate::node::FloatNode;
use crate::parser::{RoleClassifier, default_role_classifier, parse_lines};
use crate::patterns::{PatternStats, compute_patterns};
use crate::time::now_iso8601;

/// Wire format version of documents this build produces.
pub const AST_VERSION: &str = "1.0";

/// Kind of document an AST represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AstType {
    Conversation,
    Artifact,
    Bridge,
    Dispatch,
}

/// Creation/modification timestamps plus optional duration and a
/// continuity link to a prior document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Temporal {
    pub created: String,
    pub modified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continues: Option<Uuid>,
}

impl Temporal {
    pub fn now() -> Self {
        let now = now_iso8601();
        Self {
            created: now.clone(),
            modified: now,
            duration_secs: None,
            continues: None,
        }
    }
}

/// Document origin and optional classification fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Routing hints for downstream renderers. The engine validates and
/// passes these through; it never renders.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transforms {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<Vec<String>>,
    pub depth_level: u8,
}

impl Default for Transforms {
    fn default() -> Self {
        Self {
            target: "thread".to_string(),
            routing: None,
            depth_level: 1,
        }
    }
}

/// Versioned graph document representing a parsed conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FloatAST {
    pub id: Uuid,
    pub version: String,
    #[serde(rename = "type")]
    pub ast_type: AstType,
    pub temporal: Temporal,
    pub metadata: Metadata,
    pub nodes: Vec<FloatNode>,
    #[serde(default)]
    pub edges: Vec<FloatEdge>,
    #[serde(default)]
    pub concepts: BTreeMap<String, Concept>,
    #[serde(default)]
    pub patterns: PatternStats,
    #[serde(default)]
    pub transforms: Transforms,
}

impl FloatAST {
    /// Parse raw conversation text into an assembled document using the
    /// default role classifier.
    pub fn parse_conversation(text: &str, title: &str) -> Self {
        Self::parse_conversation_with(text, title, default_role_classifier)
    }

    /// Parse with a caller-supplied role classifier.
    ///
    /// Empty input (no non-blank lines) produces a document with an
    /// empty node sequence; callers treat that as an empty result, not
    /// an error.
    pub fn parse_conversation_with(text: &str, title: &str, classify: RoleClassifier) -> Self {
        let nodes = parse_lines(text, classify);
        let edges = infer_edges(&nodes);
        let concepts = extract_concepts(&nodes);
        let patterns = compute_patterns(&nodes, &edges);

        Self {
            id: Uuid::new_v4(),
            version: AST_VERSION.to_string(),
            ast_type: AstType::Conversation,
            temporal: Temporal::now(),
            metadata: Metadata {
                source: title.to_string(),
                ..Default::default()
            },
            nodes,
            edges,
            concepts,
            patterns,
            transforms: Transforms::default(),
        }
    }

    /// All node ids in the document, children included.
    pub fn node_ids(&self) -> HashSet<Uuid> {
        fn walk(nodes: &[FloatNode], out: &mut HashSet<Uuid>) {
            for node in nodes {
                out.insert(node.id);
                walk(&node.children, out);
            }
        }
        let mut ids = HashSet::new();
        walk(&self.nodes, &mut ids);
        ids
    }

    /// Node raw text concatenated in position order, the oracle's view
    /// of the document.
    pub fn concatenated_text(&self) -> String {
        let mut ordered: Vec<&FloatNode> = self.nodes.iter().collect();
        ordered.sort_by_key(|n| n.position.index);
        ordered
            .iter()
            .map(|n| n.content.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check every document invariant. Fatal violations come back as an
    /// error locating the offending entity; tolerated oddities (such as
    /// self-loop edges from external input) come back as warnings.
    pub fn validate(&self) -> Result<Vec<ValidationWarning>, ValidationError> {
        let major = self.version.split('.').next().unwrap_or("");
        if major != "1" {
            return Err(ValidationError::UnknownVersion(self.version.clone()));
        }

        if !(1..=5).contains(&self.transforms.depth_level) {
            return Err(ValidationError::BadDepthLevel(self.transforms.depth_level));
        }

        // Node ids unique, top-level indices unique and increasing
        let mut depths: HashMap<Uuid, u32> = HashMap::new();
        let mut parents: Vec<(Uuid, Uuid, u32)> = Vec::new();
        let mut collect = |node: &FloatNode| -> Result<(), ValidationError> {
            if depths.insert(node.id, node.position.depth).is_some() {
                return Err(ValidationError::DuplicateNodeId(node.id));
            }
            if let Some(parent) = node.position.parent {
                parents.push((node.id, parent, node.position.depth));
            }
            Ok(())
        };
        fn walk(
            nodes: &[FloatNode],
            collect: &mut impl FnMut(&FloatNode) -> Result<(), ValidationError>,
        ) -> Result<(), ValidationError> {
            for node in nodes {
                collect(node)?;
                walk(&node.children, collect)?;
            }
            Ok(())
        }
        walk(&self.nodes, &mut collect)?;

        let mut seen_indices = HashSet::new();
        let mut prev: Option<usize> = None;
        for node in &self.nodes {
            let index = node.position.index;
            if !seen_indices.insert(index) {
                return Err(ValidationError::DuplicateIndex {
                    node: node.id,
                    index,
                });
            }
            if let Some(p) = prev
                && index <= p
            {
                return Err(ValidationError::NonMonotonicIndex {
                    node: node.id,
                    index,
                    prev: p,
                });
            }
            prev = Some(index);
        }

        for (node, parent, depth) in parents {
            match depths.get(&parent) {
                None => return Err(ValidationError::MissingParent { node, parent }),
                Some(&parent_depth) => {
                    if depth != parent_depth + 1 {
                        return Err(ValidationError::ParentMismatch {
                            node,
                            expected_depth: parent_depth + 1,
                            actual_depth: depth,
                        });
                    }
                }
            }
        }

        let mut warnings = Vec::new();
        for edge in &self.edges {
            for endpoint in [edge.source, edge.target] {
                if !depths.contains_key(&endpoint) {
                    return Err(ValidationError::DanglingEdge {
                        edge: edge.id,
                        node: endpoint,
                    });
                }
            }
            if let Some(w) = edge.weight
                && !(0.0..=1.0).contains(&w)
            {
                return Err(ValidationError::WeightOutOfRange {
                    entity: format!("edge {}", edge.id),
                    value: w,
                });
            }
            if edge.is_self_loop() {
                warnings.push(ValidationWarning::SelfLoop { edge: edge.id });
            }
        }

        for (title, concept) in &self.concepts {
            if !(0.0..=1.0).contains(&concept.weight) {
                return Err(ValidationError::WeightOutOfRange {
                    entity: format!("concept {title:?}"),
                    value: concept.weight,
                });
            }
            for reference in concept.appearances.iter().chain(&concept.references) {
                if !depths.contains_key(&reference.node_id) {
                    return Err(ValidationError::DanglingConceptRef {
                        concept: title.clone(),
                        node: reference.node_id,
                    });
                }
                if let Some(s) = reference.strength
                    && !(0.0..=1.0).contains(&s)
                {
                    return Err(ValidationError::WeightOutOfRange {
                        entity: format!("concept {title:?} reference"),
                        value: s,
                    });
                }
            }
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeType;

    const SAMPLE: &str = "Assistant: Yes, I can help.\nUser: Great, thanks!\nUser: One more thing?";

    #[test]
    fn test_assembled_document_validates() {
        let ast = FloatAST::parse_conversation(SAMPLE, "help session");
        let warnings = ast.validate().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(ast.version, AST_VERSION);
        assert_eq!(ast.metadata.source, "help session");
        assert_eq!(ast.nodes.len(), 3);
    }

    #[test]
    fn test_empty_input_is_empty_not_error() {
        let ast = FloatAST::parse_conversation("", "empty");
        assert!(ast.nodes.is_empty());
        assert!(ast.edges.is_empty());
        assert!(ast.validate().is_ok());
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let mut ast = FloatAST::parse_conversation(SAMPLE, "t");
        ast.nodes[1].id = ast.nodes[0].id;
        assert!(matches!(
            ast.validate(),
            Err(ValidationError::DuplicateNodeId(_))
        ));
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut ast = FloatAST::parse_conversation(SAMPLE, "t");
        ast.edges.push(FloatEdge::new(
            EdgeType::Bridges,
            ast.nodes[0].id,
            Uuid::new_v4(),
            None,
        ));
        assert!(matches!(
            ast.validate(),
            Err(ValidationError::DanglingEdge { .. })
        ));
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let mut ast = FloatAST::parse_conversation(SAMPLE, "t");
        ast.edges[0].weight = Some(1.5);
        assert!(matches!(
            ast.validate(),
            Err(ValidationError::WeightOutOfRange { .. })
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut ast = FloatAST::parse_conversation(SAMPLE, "t");
        ast.version = "2.0".to_string();
        assert_eq!(
            ast.validate(),
            Err(ValidationError::UnknownVersion("2.0".to_string()))
        );
    }

    #[test]
    fn test_depth_level_bounds() {
        let mut ast = FloatAST::parse_conversation(SAMPLE, "t");
        ast.transforms.depth_level = 0;
        assert!(matches!(
            ast.validate(),
            Err(ValidationError::BadDepthLevel(0))
        ));
        ast.transforms.depth_level = 5;
        assert!(ast.validate().is_ok());
    }

    #[test]
    fn test_self_loop_flagged_not_fatal() {
        let mut ast = FloatAST::parse_conversation(SAMPLE, "t");
        let id = ast.nodes[0].id;
        ast.edges
            .push(FloatEdge::new(EdgeType::References, id, id, None));
        let warnings = ast.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ValidationWarning::SelfLoop { .. }));
    }

    #[test]
    fn test_parent_depth_invariant() {
        let mut ast = FloatAST::parse_conversation(SAMPLE, "t");
        let parent_id = ast.nodes[0].id;
        ast.nodes[1].position.parent = Some(parent_id);
        ast.nodes[1].position.depth = 2; // parent depth 0, so must be 1
        assert!(matches!(
            ast.validate(),
            Err(ValidationError::ParentMismatch { .. })
        ));
        ast.nodes[1].position.depth = 1;
        assert!(ast.validate().is_ok());
    }

    #[test]
    fn test_dangling_concept_reference_rejected() {
        let mut ast = FloatAST::parse_conversation(
            "Alice: shared topic words\nBob: shared topic words too",
            "t",
        );
        let title = ast.concepts.keys().next().unwrap().clone();
        ast.concepts.get_mut(&title).unwrap().appearances[0].node_id = Uuid::new_v4();
        assert!(matches!(
            ast.validate(),
            Err(ValidationError::DanglingConceptRef { .. })
        ));
    }

    #[test]
    fn test_concatenated_text_in_index_order() {
        let ast = FloatAST::parse_conversation("a: one\nb: two\nc: three", "t");
        assert_eq!(ast.concatenated_text(), "one\ntwo\nthree");
    }

    #[test]
    fn test_serde_roundtrip_counts() {
        let ast = FloatAST::parse_conversation(
            "Assistant: graph talk about graphs\nUser: more graph talk\nUser: graphs everywhere?",
            "roundtrip",
        );
        let json = serde_json::to_string(&ast).unwrap();
        let back: FloatAST = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes.len(), ast.nodes.len());
        assert_eq!(back.edges.len(), ast.edges.len());
        let keys: Vec<_> = ast.concepts.keys().collect();
        let back_keys: Vec<_> = back.concepts.keys().collect();
        assert_eq!(keys, back_keys);
    }
}
