//! FLOAT conversation-graph engine.
//!
//! Converts raw dialogue text into a versioned, queryable graph
//! document (FloatAST), infers typed relationships and weighted
//! concepts between nodes, evaluates FloatQL queries with stable
//! ordering, and extracts query-relevant fragments with a
//! deterministic fallback when no semantic oracle is available.
//!
//! Zero I/O: pure engine with no opinions about transport,
//! persistence, or the oracle's implementation.

pub mod ast;
pub mod concept;
pub mod edge;
pub mod error;
pub mod fragment;
pub mod infer;
pub mod node;
pub mod parser;
pub mod patterns;
pub mod query;
pub mod serde_compat;
pub mod storage;
pub mod time;

pub use ast::{AST_VERSION, AstType, FloatAST, Metadata, Temporal, Transforms};
pub use concept::{Concept, MAX_CONCEPTS, NodeReference, extract_concepts, merge_concept};
pub use edge::{EdgeType, FloatEdge};
pub use error::{
    CoreError, QueryError, Result, StorageError, ValidationError, ValidationWarning,
};
pub use fragment::{
    DEFAULT_MAX_FRAGMENTS, FALLBACK_CATEGORY, Fragment, MAX_FRAGMENTS, clamp_max,
    extract_fragments_fallback,
};
pub use infer::infer_edges;
pub use node::{
    FloatMarkers, FloatNode, Intent, NodeContent, NodeType, Position, Role, Semantic,
};
pub use parser::{RoleClassifier, default_role_classifier, parse_lines, tokenize};
pub use patterns::{PatternStats, compute_patterns};
pub use query::{
    Aggregate, AggregateResult, Bounds, ContainsFilter, Direction, FloatQuery, OneOrMany,
    OrderBy, QueryEngine, QueryResponse, QueryView, RoutingDecision, Select, Selection,
    SemanticFilter, TemporalFilter, Transform, Where,
};
pub use serde_compat::{export_json, import_json};
pub use storage::{AstStorage, Conversation, MemoryStore, parse_and_store};
pub use time::{now_iso8601, now_unix_secs, unix_to_iso8601};
