//! Semantic oracle client with a strict degrade contract.
//!
//! Every call is bounded by a timeout and every response is validated
//! against the expected shape before it is trusted. Any transport,
//! timeout, or shape failure comes back as `Degrade`,
//! which routes the caller to the deterministic path. Oracle trouble
//! is logged, never surfaced as a user-facing error.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use float_core::{Concept, FloatAST, Fragment, NodeReference, merge_concept};

use crate::config::OracleConfig;

/// Reason the oracle path was abandoned for the deterministic one.
#[derive(Debug)]
pub enum Degrade {
    Disabled,
    Transport(String),
    Timeout,
    Shape(String),
}

impl fmt::Display for Degrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degrade::Disabled => write!(f, "oracle not configured"),
            Degrade::Transport(msg) => write!(f, "oracle transport failed: {msg}"),
            Degrade::Timeout => write!(f, "oracle call timed out"),
            Degrade::Shape(msg) => write!(f, "oracle response rejected: {msg}"),
        }
    }
}

/// Two-branch outcome: a validated shape, or a reason to degrade.
pub type OracleOutcome<T> = Result<T, Degrade>;

// --- Wire shapes the oracle must produce ---

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFragment {
    text: String,
    relevance: RelevanceField,
    keywords: Vec<String>,
    category: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RelevanceField {
    Text(String),
    Score(f64),
}

impl RelevanceField {
    fn into_string(self) -> String {
        match self {
            RelevanceField::Text(s) => s,
            RelevanceField::Score(n) => format!("{n}"),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConcept {
    title: String,
    #[serde(default)]
    description: Option<String>,
    node_ids: Vec<Uuid>,
    weight: f64,
}

pub struct OracleClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OracleClient {
    /// Build a client, or None when no endpoint is configured.
    pub fn from_config(config: &OracleConfig) -> Option<Self> {
        let endpoint = config.endpoint.clone()?;
        let timeout = config.timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .ok()?;
        Some(Self {
            http,
            endpoint,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "float-oracle".to_string()),
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    async fn complete(&self, prompt: String) -> OracleOutcome<String> {
        let mut request = self.http.post(&self.endpoint).json(&serde_json::json!({
            "model": self.model,
            "prompt": prompt,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| Degrade::Timeout)?
            .map_err(|e| Degrade::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Degrade::Transport(format!("status {}", response.status())));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Degrade::Shape(e.to_string()))?;
        Ok(completion.content)
    }

    /// Primary fragment path: query + full document text in, at most
    /// `max` validated fragments out.
    pub async fn fragments(
        &self,
        ast: &FloatAST,
        query: &str,
        max: usize,
    ) -> OracleOutcome<Vec<Fragment>> {
        let prompt = format!(
            "Extract up to {max} fragments relevant to the query below from the \
             conversation text. Respond with only a JSON array of objects shaped \
             {{\"text\": string, \"relevance\": string, \"keywords\": string[], \
             \"category\": string}}.\n\nQuery: {query}\n\nConversation:\n{}",
            ast.concatenated_text()
        );

        let content = self.complete(prompt).await?;
        let raw: Vec<RawFragment> =
            serde_json::from_str(&content).map_err(|e| Degrade::Shape(e.to_string()))?;

        let fragments: Vec<Fragment> = raw
            .into_iter()
            .take(max)
            .map(|f| Fragment {
                text: f.text,
                relevance: f.relevance.into_string(),
                keywords: f.keywords,
                category: f.category,
            })
            .collect();
        Ok(fragments)
    }

    /// Primary concept path: node text in, 5-10 validated concepts out.
    /// Weights and node references are checked against the document
    /// before the result is accepted.
    pub async fn concepts(&self, ast: &FloatAST) -> OracleOutcome<BTreeMap<String, Concept>> {
        let node_text: String = ast
            .nodes
            .iter()
            .map(|n| format!("[{}] {}\n", n.id, n.content.raw))
            .collect();
        let prompt = format!(
            "Identify 5-10 emergent concepts in the conversation below. Respond \
             with only a JSON array of objects shaped {{\"title\": string, \
             \"description\": string?, \"node_ids\": string[], \"weight\": number \
             in [0,1]}}, where node_ids reference the bracketed ids.\n\n{node_text}"
        );

        let content = self.complete(prompt).await?;
        let raw: Vec<RawConcept> =
            serde_json::from_str(&content).map_err(|e| Degrade::Shape(e.to_string()))?;

        let known = ast.node_ids();
        let mut concepts = BTreeMap::new();
        for concept in raw {
            if !(0.0..=1.0).contains(&concept.weight) {
                return Err(Degrade::Shape(format!(
                    "concept {:?} weight {} out of range",
                    concept.title, concept.weight
                )));
            }
            if let Some(bad) = concept.node_ids.iter().find(|id| !known.contains(id)) {
                return Err(Degrade::Shape(format!(
                    "concept {:?} references unknown node {bad}",
                    concept.title
                )));
            }
            let appearances = concept
                .node_ids
                .iter()
                .map(|&node_id| NodeReference {
                    node_id,
                    chunk: None,
                    context: None,
                    strength: None,
                })
                .collect();
            merge_concept(
                &mut concepts,
                Concept {
                    title: concept.title,
                    description: concept.description,
                    appearances,
                    references: Vec::new(),
                    weight: concept.weight,
                },
            );
        }
        Ok(concepts)
    }
}
