//! FloatQL: declarative select/filter/aggregate/transform queries
//! evaluated against one immutable FloatAST.
//!
//! Requests are validated in full before any evaluation starts; an
//! unknown field, type, or contradictory bound is rejected with no
//! partial results. Evaluation never mutates the source document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::FloatAST;
use crate::concept::Concept;
use crate::edge::{EdgeType, FloatEdge};
use crate::error::QueryError;
use crate::node::{FloatNode, NodeType, Role};
use crate::patterns::PatternStats;

// --- Request grammar ---

/// A complete FloatQL request. All fields optional; an empty query
/// returns the full document view.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FloatQuery {
    pub select: Option<Select>,
    #[serde(rename = "where")]
    pub where_: Option<Where>,
    pub aggregate: Option<Aggregate>,
    pub transform: Option<Transform>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl FloatQuery {
    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        serde_json::from_str(json).map_err(|e| QueryError::Malformed(e.to_string()))
    }
}

/// Which top-level collections to include, each optionally narrowed to
/// a field allow-list.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Select {
    pub nodes: Option<Selection>,
    pub concepts: Option<Selection>,
    pub patterns: Option<Selection>,
    pub edges: Option<Selection>,
}

/// `true`/`false` to toggle a collection, or a list of field names to
/// narrow its entries.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Flag(bool),
    Fields(Vec<String>),
}

impl Selection {
    fn enabled(&self) -> bool {
        match self {
            Selection::Flag(enabled) => *enabled,
            Selection::Fields(_) => true,
        }
    }

    fn fields(&self) -> Option<&[String]> {
        match self {
            Selection::Flag(_) => None,
            Selection::Fields(fields) => Some(fields),
        }
    }
}

/// One string or a set of strings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            OneOrMany::One(s) => std::slice::from_ref(s).iter().map(String::as_str),
            OneOrMany::Many(v) => v[..].iter().map(String::as_str),
        }
    }
}

/// Conjunction of predicates; a node or edge passes iff every
/// specified predicate matches. An absent predicate always passes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Where {
    #[serde(rename = "type")]
    pub type_: Option<OneOrMany>,
    pub role: Option<String>,
    pub temporal: Option<TemporalFilter>,
    pub semantic: Option<SemanticFilter>,
    pub contains: Option<ContainsFilter>,
    pub personas: Option<Vec<String>>,
    pub mode: Option<String>,
}

/// Inclusive document-level timestamp bounds plus duration bounds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TemporalFilter {
    pub after: Option<String>,
    pub before: Option<String>,
    pub duration: Option<Bounds>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SemanticFilter {
    pub intent: Option<Vec<String>>,
    pub tone: Option<Vec<String>>,
    pub certainty: Option<Bounds>,
}

/// Numeric min/max bounds, both inclusive.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|m| value >= m) && self.max.is_none_or(|m| value <= m)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ContainsFilter {
    pub text: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub concepts: Option<Vec<String>>,
}

/// Aggregation request: post-filter counts, a group-by field, and an
/// optional one-line summary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Aggregate {
    pub counts: bool,
    pub group_by: Option<String>,
    pub summarize: bool,
}

/// Renderer routing request. The engine validates and passes this
/// through; it does not render.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transform {
    pub target: String,
    #[serde(default)]
    pub options: Option<serde_json::Value>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

// --- Response shapes ---

/// Either a filtered/aggregated view or a routing decision, never both.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Routing(RoutingDecision),
    View(QueryView),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub target: String,
    pub options: serde_json::Value,
}

/// Filtered projection of a document. Node and edge entries are JSON
/// values so field allow-lists can narrow them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueryView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concepts: Option<BTreeMap<String, Concept>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<PatternStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateResult>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AggregateResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<BTreeMap<String, usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<BTreeMap<String, usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

// --- Engine ---

const ORDERABLE_FIELDS: &[&str] = &["certainty", "id", "position.index", "title", "type", "weight"];
const GROUPABLE_FIELDS: &[&str] = &["role", "type"];
const KNOWN_INTENTS: &[&str] = &["decision", "question", "reflection", "request", "statement"];
const KNOWN_MARKERS: &[&str] = &["bridge", "context", "decision", "dispatch", "eureka", "highlight"];

/// Stateless evaluator over an immutable document.
pub struct QueryEngine;

impl QueryEngine {
    /// Validate then evaluate. A request carrying `transform` yields a
    /// routing decision and no view.
    pub fn evaluate(ast: &FloatAST, query: &FloatQuery) -> Result<QueryResponse, QueryError> {
        Self::validate(query)?;

        if let Some(transform) = &query.transform {
            return Ok(QueryResponse::Routing(RoutingDecision {
                target: transform.target.clone(),
                options: transform
                    .options
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({})),
            }));
        }

        Ok(QueryResponse::View(Self::evaluate_view(ast, query)))
    }

    /// Fail-fast request validation; runs before any evaluation.
    pub fn validate(query: &FloatQuery) -> Result<(), QueryError> {
        if let Some(where_) = &query.where_ {
            if let Some(types) = &where_.type_ {
                for t in types.iter() {
                    if NodeType::from_str_opt(t).is_none() && EdgeType::from_str_opt(t).is_none() {
                        return Err(QueryError::UnknownType(t.to_string()));
                    }
                }
            }
            if let Some(role) = &where_.role
                && Role::from_str_opt(role).is_none()
            {
                return Err(QueryError::UnknownRole(role.clone()));
            }
            if let Some(semantic) = &where_.semantic {
                for intent in semantic.intent.iter().flatten() {
                    if !KNOWN_INTENTS.contains(&intent.as_str()) {
                        return Err(QueryError::UnknownIntent(intent.clone()));
                    }
                }
                if let Some(bounds) = &semantic.certainty {
                    check_bounds("semantic.certainty", bounds)?;
                }
            }
            if let Some(temporal) = &where_.temporal {
                if let Some(bounds) = &temporal.duration {
                    check_bounds("temporal.duration", bounds)?;
                }
                if let (Some(after), Some(before)) = (&temporal.after, &temporal.before)
                    && after > before
                {
                    return Err(QueryError::Malformed(
                        "temporal.after exceeds temporal.before".to_string(),
                    ));
                }
            }
            if let Some(contains) = &where_.contains {
                for marker in contains.patterns.iter().flatten() {
                    if !KNOWN_MARKERS.contains(&marker.as_str()) {
                        return Err(QueryError::UnknownField(format!(
                            "contains.patterns.{marker}"
                        )));
                    }
                }
            }
        }

        for order in &query.order_by {
            if !ORDERABLE_FIELDS.contains(&order.field.as_str()) {
                return Err(QueryError::UnknownField(format!("order_by.{}", order.field)));
            }
        }
        if let Some(aggregate) = &query.aggregate
            && let Some(group_by) = &aggregate.group_by
            && !GROUPABLE_FIELDS.contains(&group_by.as_str())
        {
            return Err(QueryError::UnknownField(format!("group_by.{group_by}")));
        }
        if let Some(transform) = &query.transform
            && transform.target.trim().is_empty()
        {
            return Err(QueryError::Malformed("transform.target is empty".to_string()));
        }

        Ok(())
    }

    fn evaluate_view(ast: &FloatAST, query: &FloatQuery) -> QueryView {
        let where_ = query.where_.as_ref();
        let gate_open = where_.is_none_or(|w| document_gate(ast, w));

        let mut nodes: Vec<&FloatNode> = if gate_open {
            ast.nodes
                .iter()
                .filter(|n| where_.is_none_or(|w| node_passes(ast, n, w)))
                .collect()
        } else {
            Vec::new()
        };
        let mut edges: Vec<&FloatEdge> = if gate_open {
            ast.edges
                .iter()
                .filter(|e| where_.is_none_or(|w| edge_passes(e, w)))
                .collect()
        } else {
            Vec::new()
        };
        let mut concepts: Vec<(&String, &Concept)> = if gate_open {
            ast.concepts
                .iter()
                .filter(|(title, _)| {
                    where_
                        .and_then(|w| w.contains.as_ref())
                        .and_then(|c| c.concepts.as_ref())
                        .is_none_or(|wanted| wanted.contains(title))
                })
                .collect()
        } else {
            Vec::new()
        };

        // Aggregation is computed post-filter, before pagination.
        let aggregate = query.aggregate.as_ref().map(|spec| {
            aggregate_result(spec, &nodes, &edges, concepts.len())
        });

        order_nodes(&mut nodes, &query.order_by);
        order_edges(&mut edges, &query.order_by);
        order_concepts(&mut concepts, &query.order_by);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        let nodes: Vec<&FloatNode> = nodes.into_iter().skip(offset).take(limit).collect();
        let edges: Vec<&FloatEdge> = edges.into_iter().skip(offset).take(limit).collect();
        let concepts: Vec<(&String, &Concept)> =
            concepts.into_iter().skip(offset).take(limit).collect();

        let select = query.select.as_ref();
        let want = |pick: fn(&Select) -> Option<&Selection>| -> Option<Option<&[String]>> {
            match select {
                None => Some(None),
                Some(s) => match pick(s) {
                    Some(sel) if sel.enabled() => Some(sel.fields()),
                    _ => None,
                },
            }
        };

        let mut view = QueryView::default();
        if let Some(fields) = want(|s| s.nodes.as_ref()) {
            view.nodes = Some(nodes.iter().map(|n| project(n, fields)).collect());
        }
        if let Some(fields) = want(|s| s.edges.as_ref()) {
            view.edges = Some(edges.iter().map(|e| project(e, fields)).collect());
        }
        if want(|s| s.concepts.as_ref()).is_some() {
            view.concepts = Some(
                concepts
                    .iter()
                    .map(|(title, c)| ((*title).clone(), (*c).clone()))
                    .collect(),
            );
        }
        if want(|s| s.patterns.as_ref()).is_some() {
            view.patterns = Some(ast.patterns);
        }
        view.aggregate = aggregate;
        view
    }
}

fn check_bounds(field: &str, bounds: &Bounds) -> Result<(), QueryError> {
    if let (Some(min), Some(max)) = (bounds.min, bounds.max)
        && min > max
    {
        return Err(QueryError::InvalidBounds {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// Document-level predicates: mode, personas, and temporal bounds apply
/// to the AST as a whole. A closed gate empties every collection.
fn document_gate(ast: &FloatAST, where_: &Where) -> bool {
    if let Some(mode) = &where_.mode
        && ast.metadata.mode.as_deref() != Some(mode.as_str())
    {
        return false;
    }
    if let Some(personas) = &where_.personas
        && !personas.iter().all(|p| ast.metadata.personas.contains(p))
    {
        return false;
    }
    if let Some(temporal) = &where_.temporal {
        if let Some(after) = &temporal.after
            && ast.temporal.created.as_str() < after.as_str()
        {
            return false;
        }
        if let Some(before) = &temporal.before
            && ast.temporal.created.as_str() > before.as_str()
        {
            return false;
        }
        if let Some(bounds) = &temporal.duration {
            // A missing duration never satisfies a numeric bound.
            match ast.temporal.duration_secs {
                Some(d) if bounds.contains(d as f64) => {}
                _ if bounds.min.is_none() && bounds.max.is_none() => {}
                _ => return false,
            }
        }
    }
    true
}

fn node_passes(ast: &FloatAST, node: &FloatNode, where_: &Where) -> bool {
    if let Some(types) = &where_.type_
        && !types.iter().any(|t| t == node.node_type.as_str())
    {
        return false;
    }
    if let Some(role) = &where_.role {
        match node.role {
            Some(r) if r.as_str() == role => {}
            _ => return false,
        }
    }
    if let Some(semantic) = &where_.semantic {
        if let Some(intents) = &semantic.intent {
            let node_intent = node.semantic.as_ref().and_then(|s| s.intent);
            match node_intent {
                Some(i) if intents.iter().any(|w| w == intent_str(i)) => {}
                _ => return false,
            }
        }
        if let Some(tones) = &semantic.tone {
            let node_tone = node.semantic.as_ref().and_then(|s| s.tone.as_deref());
            match node_tone {
                Some(t) if tones.iter().any(|w| w == t) => {}
                _ => return false,
            }
        }
        if let Some(bounds) = &semantic.certainty
            && (bounds.min.is_some() || bounds.max.is_some())
        {
            // Missing optional field never satisfies a numeric bound.
            match node.semantic.as_ref().and_then(|s| s.certainty) {
                Some(c) if bounds.contains(c) => {}
                _ => return false,
            }
        }
    }
    if let Some(contains) = &where_.contains {
        if let Some(text) = &contains.text
            && !node.lower_text().contains(&text.to_lowercase())
        {
            return false;
        }
        if let Some(markers) = &contains.patterns
            && !markers.iter().all(|m| node.has_marker(m))
        {
            return false;
        }
        if let Some(concepts) = &contains.concepts {
            let member = |title: &String| {
                ast.concepts
                    .get(title)
                    .is_some_and(|c| c.appearances.iter().any(|r| r.node_id == node.id))
            };
            if !concepts.iter().all(member) {
                return false;
            }
        }
    }
    true
}

/// Edges carry no role/semantic/content, so only the type predicate
/// applies; node-only predicates auto-pass.
fn edge_passes(edge: &FloatEdge, where_: &Where) -> bool {
    if let Some(types) = &where_.type_
        && !types.iter().any(|t| t == edge.edge_type.as_str())
    {
        return false;
    }
    true
}

fn intent_str(intent: crate::node::Intent) -> &'static str {
    use crate::node::Intent;
    match intent {
        Intent::Question => "question",
        Intent::Statement => "statement",
        Intent::Request => "request",
        Intent::Reflection => "reflection",
        Intent::Decision => "decision",
    }
}

/// Default node order is position.index ascending; explicit keys are
/// applied in sequence with index ascending as the final tie-break.
fn order_nodes(nodes: &mut [&FloatNode], order_by: &[OrderBy]) {
    nodes.sort_by(|a, b| {
        for order in order_by {
            let ord = match order.field.as_str() {
                "position.index" => a.position.index.cmp(&b.position.index),
                "certainty" => {
                    let ca = a.semantic.as_ref().and_then(|s| s.certainty);
                    let cb = b.semantic.as_ref().and_then(|s| s.certainty);
                    ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
                }
                "id" => a.id.to_string().cmp(&b.id.to_string()),
                "type" => a.node_type.as_str().cmp(b.node_type.as_str()),
                _ => std::cmp::Ordering::Equal,
            };
            let ord = apply_direction(ord, order.direction);
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        a.position.index.cmp(&b.position.index)
    });
}

/// Edge ties (and the default order) break by id lexicographic order.
fn order_edges(edges: &mut [&FloatEdge], order_by: &[OrderBy]) {
    edges.sort_by(|a, b| {
        for order in order_by {
            let ord = match order.field.as_str() {
                "weight" => a
                    .weight
                    .partial_cmp(&b.weight)
                    .unwrap_or(std::cmp::Ordering::Equal),
                "type" => a.edge_type.as_str().cmp(b.edge_type.as_str()),
                "id" => a.id.to_string().cmp(&b.id.to_string()),
                _ => std::cmp::Ordering::Equal,
            };
            let ord = apply_direction(ord, order.direction);
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        a.id.to_string().cmp(&b.id.to_string())
    });
}

/// Concepts default to weight descending, title ascending on ties.
fn order_concepts(concepts: &mut [(&String, &Concept)], order_by: &[OrderBy]) {
    concepts.sort_by(|(title_a, a), (title_b, b)| {
        for order in order_by {
            let ord = match order.field.as_str() {
                "weight" => a
                    .weight
                    .partial_cmp(&b.weight)
                    .unwrap_or(std::cmp::Ordering::Equal),
                "title" => title_a.cmp(title_b),
                _ => std::cmp::Ordering::Equal,
            };
            let ord = apply_direction(ord, order.direction);
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| title_a.cmp(title_b))
    });
}

fn apply_direction(ord: std::cmp::Ordering, direction: Direction) -> std::cmp::Ordering {
    match direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
    }
}

fn aggregate_result(
    spec: &Aggregate,
    nodes: &[&FloatNode],
    edges: &[&FloatEdge],
    concept_count: usize,
) -> AggregateResult {
    let mut result = AggregateResult::default();

    if spec.counts {
        let mut counts = BTreeMap::new();
        counts.insert("nodes".to_string(), nodes.len());
        counts.insert("edges".to_string(), edges.len());
        counts.insert("concepts".to_string(), concept_count);
        result.counts = Some(counts);
    }

    if let Some(group_by) = &spec.group_by {
        let mut groups: BTreeMap<String, usize> = BTreeMap::new();
        for node in nodes {
            let key = match group_by.as_str() {
                "role" => node.role.map(|r| r.as_str()).unwrap_or("none").to_string(),
                "type" => node.node_type.as_str().to_string(),
                _ => continue,
            };
            *groups.entry(key).or_insert(0) += 1;
        }
        result.groups = Some(groups);
    }

    if spec.summarize {
        result.summary = Some(format!(
            "{} nodes, {} edges, {} concepts",
            nodes.len(),
            edges.len(),
            concept_count
        ));
    }

    result
}

/// Serialize an entity, optionally narrowed to an allow-list of
/// top-level fields.
fn project<T: Serialize>(entity: &T, fields: Option<&[String]>) -> serde_json::Value {
    let mut value = serde_json::to_value(entity).unwrap_or(serde_json::Value::Null);
    if let (Some(fields), serde_json::Value::Object(map)) = (fields, &mut value) {
        map.retain(|key, _| fields.iter().any(|f| f == key));
    }
    value
}
