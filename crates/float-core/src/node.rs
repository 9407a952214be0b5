use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of content unit a node represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Message,
    Artifact,
    Annotation,
    Dispatch,
    Ritual,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Message => "message",
            NodeType::Artifact => "artifact",
            NodeType::Annotation => "annotation",
            NodeType::Dispatch => "dispatch",
            NodeType::Ritual => "ritual",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "message" => Some(NodeType::Message),
            "artifact" => Some(NodeType::Artifact),
            "annotation" => Some(NodeType::Annotation),
            "dispatch" => Some(NodeType::Dispatch),
            "ritual" => Some(NodeType::Ritual),
            _ => None,
        }
    }
}

/// Speaker role attributed to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "human" => Some(Role::Human),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// Coarse communicative intent attached by semantic analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    Statement,
    Request,
    Reflection,
    Decision,
}

/// Node text in raw and optionally processed forms.
/// `structured` carries extra payload such as the original author label.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeContent {
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<serde_json::Value>,
}

impl NodeContent {
    pub fn raw_only(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            processed: None,
            structured: None,
        }
    }
}

/// Optional semantic annotations. `certainty` is confined to [0, 1].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Semantic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certainty: Option<f64>,
}

/// Sparse named annotations recognized in conversation text.
/// Each marker carries a short label taken from the triggering phrase.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatMarkers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eureka: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
}

impl FloatMarkers {
    pub fn is_empty(&self) -> bool {
        self.context.is_none()
            && self.dispatch.is_none()
            && self.bridge.is_none()
            && self.highlight.is_none()
            && self.eureka.is_none()
            && self.decision.is_none()
    }
}

/// Placement of a node within its document.
/// `index` is zero-based and strictly increasing in parse order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub index: usize,
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uuid>,
}

impl Position {
    pub fn top_level(index: usize) -> Self {
        Self {
            index,
            depth: 0,
            parent: None,
        }
    }
}

/// A single content unit in a FloatAST.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FloatNode {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub content: NodeContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<Semantic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float_markers: Option<FloatMarkers>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FloatNode>,
    pub position: Position,
}

impl FloatNode {
    pub fn new(node_type: NodeType, content: NodeContent, index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_type,
            role: None,
            content,
            semantic: None,
            float_markers: None,
            children: Vec::new(),
            position: Position::top_level(index),
        }
    }

    /// Lowercased raw text, used by keyword matching.
    pub fn lower_text(&self) -> String {
        self.content.raw.to_lowercase()
    }

    pub fn has_marker(&self, name: &str) -> bool {
        let Some(m) = &self.float_markers else {
            return false;
        };
        match name {
            "context" => m.context.is_some(),
            "dispatch" => m.dispatch.is_some(),
            "bridge" => m.bridge.is_some(),
            "highlight" => m.highlight.is_some(),
            "eureka" => m.eureka.is_some(),
            "decision" => m.decision.is_some(),
            _ => false,
        }
    }
}
