//! Fragment extraction: ranked excerpts answering a free-text query.
//!
//! This module holds the deterministic fallback path; the oracle-backed
//! primary path lives with the oracle client and produces the same
//! `Fragment` shape, so callers never know which path ran.

use serde::{Deserialize, Serialize};

use crate::ast::FloatAST;
use crate::parser::tokenize;

/// Fragments returned when the caller does not specify a maximum.
pub const DEFAULT_MAX_FRAGMENTS: usize = 10;

/// Hard ceiling on requested fragments; bounds oracle cost.
pub const MAX_FRAGMENTS: usize = 20;

/// Category label used by the deterministic path.
pub const FALLBACK_CATEGORY: &str = "keyword-match";

/// A ranked excerpt. Constructed fresh per extraction call, never
/// mutated afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub relevance: String,
    pub keywords: Vec<String>,
    pub category: String,
}

/// Clamp a caller-supplied fragment budget to the configured ceiling.
pub fn clamp_max(max: Option<usize>) -> usize {
    max.unwrap_or(DEFAULT_MAX_FRAGMENTS).min(MAX_FRAGMENTS)
}

/// Deterministic keyword extraction.
///
/// Scores every node by the number of distinct query words appearing
/// as substrings of its lowercased text, drops zero scores, sorts by
/// score descending with position index ascending as the tie-break,
/// and truncates to `max` (after clamping). Calling twice with the
/// same inputs yields byte-identical output.
pub fn extract_fragments_fallback(ast: &FloatAST, query: &str, max: Option<usize>) -> Vec<Fragment> {
    let limit = clamp_max(max);
    let mut seen = std::collections::HashSet::new();
    let words: Vec<String> = tokenize(query)
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect();
    if words.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, usize, Vec<String>)> = Vec::new(); // (score, index, matched)
    for (position, node) in ast.nodes.iter().enumerate() {
        let text = node.lower_text();
        let matched: Vec<String> = words
            .iter()
            .filter(|w| text.contains(w.as_str()))
            .cloned()
            .collect();
        if !matched.is_empty() {
            scored.push((matched.len(), position, matched));
        }
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.truncate(limit);

    let total = words.len();
    scored
        .into_iter()
        .map(|(score, position, matched)| Fragment {
            text: ast.nodes[position].content.raw.clone(),
            relevance: format!("matched {score} of {total} query terms"),
            keywords: matched,
            category: FALLBACK_CATEGORY.to_string(),
        })
        .collect()
}
