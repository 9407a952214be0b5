use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Typed relationship between two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    RespondsTo,
    References,
    Contradicts,
    Elaborates,
    Summarizes,
    Questions,
    Implements,
    Bridges,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::RespondsTo => "responds_to",
            EdgeType::References => "references",
            EdgeType::Contradicts => "contradicts",
            EdgeType::Elaborates => "elaborates",
            EdgeType::Summarizes => "summarizes",
            EdgeType::Questions => "questions",
            EdgeType::Implements => "implements",
            EdgeType::Bridges => "bridges",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "responds_to" => Some(EdgeType::RespondsTo),
            "references" => Some(EdgeType::References),
            "contradicts" => Some(EdgeType::Contradicts),
            "elaborates" => Some(EdgeType::Elaborates),
            "summarizes" => Some(EdgeType::Summarizes),
            "questions" => Some(EdgeType::Questions),
            "implements" => Some(EdgeType::Implements),
            "bridges" => Some(EdgeType::Bridges),
            _ => None,
        }
    }
}

/// Directed, typed, optionally weighted relationship between two nodes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FloatEdge {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub source: Uuid,
    pub target: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl FloatEdge {
    pub fn new(edge_type: EdgeType, source: Uuid, target: Uuid, weight: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            edge_type,
            source,
            target,
            weight,
            metadata: None,
        }
    }

    /// Self-loops are never produced by inference but may arrive from
    /// external documents; validation flags them.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Deduplication key for the inferrer: identical (type, source, target)
    /// must not appear twice.
    pub fn dedup_key(&self) -> (EdgeType, Uuid, Uuid) {
        (self.edge_type, self.source, self.target)
    }
}
