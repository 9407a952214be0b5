use std::fmt;

use uuid::Uuid;

/// Fatal invariant violations found when validating an assembled document.
/// Each variant carries enough detail to locate the offending entity.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    DuplicateNodeId(Uuid),
    DuplicateIndex { node: Uuid, index: usize },
    NonMonotonicIndex { node: Uuid, index: usize, prev: usize },
    DanglingEdge { edge: Uuid, node: Uuid },
    ParentMismatch { node: Uuid, expected_depth: u32, actual_depth: u32 },
    MissingParent { node: Uuid, parent: Uuid },
    WeightOutOfRange { entity: String, value: f64 },
    DanglingConceptRef { concept: String, node: Uuid },
    BadDepthLevel(u8),
    UnknownVersion(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateNodeId(id) => write!(f, "duplicate node id {id}"),
            ValidationError::DuplicateIndex { node, index } => {
                write!(f, "node {node} reuses position index {index}")
            }
            ValidationError::NonMonotonicIndex { node, index, prev } => {
                write!(f, "node {node} has index {index} after {prev}")
            }
            ValidationError::DanglingEdge { edge, node } => {
                write!(f, "edge {edge} references missing node {node}")
            }
            ValidationError::ParentMismatch {
                node,
                expected_depth,
                actual_depth,
            } => write!(
                f,
                "node {node} depth {actual_depth} does not match parent depth + 1 = {expected_depth}"
            ),
            ValidationError::MissingParent { node, parent } => {
                write!(f, "node {node} names missing parent {parent}")
            }
            ValidationError::WeightOutOfRange { entity, value } => {
                write!(f, "{entity} has weight {value} outside [0, 1]")
            }
            ValidationError::DanglingConceptRef { concept, node } => {
                write!(f, "concept {concept:?} references missing node {node}")
            }
            ValidationError::BadDepthLevel(level) => {
                write!(f, "transforms.depth_level {level} outside [1, 5]")
            }
            ValidationError::UnknownVersion(v) => write!(f, "unsupported document version {v:?}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Non-fatal findings attached to an otherwise valid document.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    SelfLoop { edge: Uuid },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::SelfLoop { edge } => write!(f, "edge {edge} is a self-loop"),
        }
    }
}

/// FloatQL requests that fail validation are rejected before any
/// evaluation starts; no partial results are ever returned.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    UnknownField(String),
    UnknownType(String),
    UnknownRole(String),
    UnknownIntent(String),
    InvalidBounds { field: String, min: f64, max: f64 },
    Malformed(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::UnknownField(name) => write!(f, "unknown query field {name:?}"),
            QueryError::UnknownType(name) => write!(f, "unknown node or edge type {name:?}"),
            QueryError::UnknownRole(name) => write!(f, "unknown role {name:?}"),
            QueryError::UnknownIntent(name) => write!(f, "unknown intent {name:?}"),
            QueryError::InvalidBounds { field, min, max } => {
                write!(f, "{field}: min {min} exceeds max {max}")
            }
            QueryError::Malformed(msg) => write!(f, "malformed query: {msg}"),
        }
    }
}

impl std::error::Error for QueryError {}

/// Storage seam error; implementations wrap their backend failures here.
#[derive(Debug)]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage error: {}", self.message)
    }
}

impl std::error::Error for StorageError {}

/// Umbrella error for float-core operations.
#[derive(Debug)]
pub enum CoreError {
    Validation(ValidationError),
    Query(QueryError),
    Json(serde_json::Error),
    Storage(StorageError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Validation(e) => write!(f, "validation failed: {e}"),
            CoreError::Query(e) => write!(f, "query rejected: {e}"),
            CoreError::Json(e) => write!(f, "JSON error: {e}"),
            CoreError::Storage(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<ValidationError> for CoreError {
    fn from(e: ValidationError) -> Self {
        CoreError::Validation(e)
    }
}

impl From<QueryError> for CoreError {
    fn from(e: QueryError) -> Self {
        CoreError::Query(e)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Json(e)
    }
}

impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        CoreError::Storage(e)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
