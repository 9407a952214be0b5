//! Dual-path orchestration: try the oracle, fall back deterministically.
//!
//! Both paths return the same shapes, so callers never learn which one
//! ran. Oracle failures are logged and recovered locally; the
//! deterministic result is the hard ceiling, never an error.

use float_core::{FloatAST, Fragment, clamp_max, extract_concepts, extract_fragments_fallback};

use crate::oracle::OracleClient;

/// Extract at most `max` (clamped) fragments for a free-text query.
pub async fn extract_fragments(
    client: Option<&OracleClient>,
    ast: &FloatAST,
    query: &str,
    max: Option<usize>,
) -> Vec<Fragment> {
    let limit = clamp_max(max);

    if let Some(client) = client {
        match client.fragments(ast, query, limit).await {
            Ok(fragments) => {
                tracing::debug!(count = fragments.len(), "oracle fragments accepted");
                return fragments;
            }
            Err(reason) => {
                tracing::warn!("degrading to keyword extraction: {reason}");
            }
        }
    }

    extract_fragments_fallback(ast, query, Some(limit))
}

/// Replace the document's concepts with oracle-derived ones when the
/// oracle cooperates; otherwise keep the deterministic term-frequency
/// concepts already assembled.
pub async fn enrich_concepts(client: Option<&OracleClient>, ast: &mut FloatAST) {
    let Some(client) = client else {
        return;
    };
    match client.concepts(ast).await {
        Ok(concepts) if !concepts.is_empty() => {
            tracing::debug!(count = concepts.len(), "oracle concepts accepted");
            ast.concepts = concepts;
        }
        Ok(_) => {
            tracing::warn!("oracle returned no concepts, keeping deterministic set");
            ast.concepts = extract_concepts(&ast.nodes);
        }
        Err(reason) => {
            tracing::warn!("degrading to term-frequency concepts: {reason}");
        }
    }
}
