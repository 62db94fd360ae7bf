//! Similarity search over indexed clauses.
//!
//! Thin app-side wrapper around [`clause_harness_core::search`]: fills in the
//! configured default `k`, requires an enabled embedder, and prints results
//! for `clx search`.

use anyhow::Result;
use clause_harness_core::index::{ReferenceFilter, SearchFilters};
use clause_harness_core::models::SearchHit;
use clause_harness_core::search::{search, SearchRequest};
use clause_harness_core::ClauseError;

use crate::app::AppContext;

/// Run a similarity search against the store.
///
/// `k` falls back to `retrieval.default_k`. An empty query yields no hits
/// without touching the embedder.
pub async fn search_clauses(
    ctx: &AppContext,
    query: &str,
    k: Option<usize>,
    filters: SearchFilters,
) -> std::result::Result<Vec<SearchHit>, ClauseError> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }
    if !ctx.embeddings_enabled() {
        return Err(ClauseError::ProviderDisabled(
            "embedding provider is disabled; search requires [embedding].provider".to_string(),
        ));
    }

    let req = SearchRequest::new(query)
        .with_k(k.unwrap_or(ctx.config.retrieval.default_k))
        .with_filters(filters);
    search(ctx.store.as_ref(), ctx.embedder.as_ref(), &req).await
}

/// CLI entry point for `clx search`.
pub async fn run_search(
    ctx: &AppContext,
    query: &str,
    k: Option<usize>,
    reference: ReferenceFilter,
    document_id: Option<String>,
) -> Result<()> {
    let filters = SearchFilters {
        reference,
        document_id,
    };
    let hits = search_clauses(ctx, query, k, filters).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let label = hit.item.category.as_deref().unwrap_or("clause");
        let tag = if hit.item.is_reference { " [reference]" } else { "" };
        println!("{}. [{:.3}] {}{}", i + 1, hit.similarity, label, tag);
        if let Some(ref doc) = hit.item.document_id {
            println!("    document: {}", doc);
        }
        println!(
            "    excerpt: \"{}\"",
            excerpt(&hit.item.text, 160).replace('\n', " ").trim()
        );
        println!("    id: {}", hit.item.id);
        println!();
    }
    Ok(())
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}
