//! Clause drafting: generate, rewrite, summarize.
//!
//! Generation is retrieval-augmented. The closest reference clauses become
//! style examples in the prompt; if retrieval fails or finds nothing the
//! prompt says so and generation goes ahead anyway.

use anyhow::Result;
use clause_harness_core::index::SearchFilters;
use clause_harness_core::models::SearchHit;
use clause_harness_core::search::{retrieve_context, SearchRequest};
use clause_harness_core::ClauseError;
use serde::Serialize;

use crate::app::AppContext;
use crate::completion::NO_EXAMPLES;

/// A generated clause and the reference clauses it was modeled on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedClause {
    pub generated_clause: String,
    pub examples: Vec<SearchHit>,
}

/// Format retrieved clauses as numbered prompt examples.
pub fn format_examples(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_EXAMPLES.to_string();
    }
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("Example {}:\n{}", i + 1, hit.item.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

pub async fn generate_clause(
    ctx: &AppContext,
    instruction: &str,
) -> std::result::Result<GeneratedClause, ClauseError> {
    require_text(instruction, "instruction")?;

    let examples = if ctx.embeddings_enabled() {
        let req = SearchRequest::new(instruction)
            .with_k(ctx.config.retrieval.generate_examples)
            .with_filters(SearchFilters::only_reference());
        retrieve_context(ctx.store.as_ref(), ctx.embedder.as_ref(), &req).await
    } else {
        tracing::warn!("embedding provider disabled; generating without examples");
        Vec::new()
    };

    let context = format_examples(&examples);
    let generated_clause = ctx
        .completion
        .generate_clause(instruction, &context)
        .await?;

    tracing::info!(examples = examples.len(), "generated clause");
    Ok(GeneratedClause {
        generated_clause,
        examples,
    })
}

pub async fn rewrite_clause(
    ctx: &AppContext,
    text: &str,
) -> std::result::Result<String, ClauseError> {
    require_text(text, "clause text")?;
    ctx.completion.rewrite_clause(text).await
}

pub async fn summarize_clause(
    ctx: &AppContext,
    text: &str,
) -> std::result::Result<String, ClauseError> {
    require_text(text, "clause text")?;
    ctx.completion.summarize_clause(text).await
}

fn require_text(value: &str, what: &str) -> std::result::Result<(), ClauseError> {
    if value.trim().is_empty() {
        return Err(ClauseError::Input(format!("{} is empty", what)));
    }
    Ok(())
}

/// CLI entry point for `clx generate`.
pub async fn run_generate(ctx: &AppContext, instruction: &str) -> Result<()> {
    let generated = generate_clause(ctx, instruction).await?;
    println!("{}", generated.generated_clause);
    if !generated.examples.is_empty() {
        eprintln!();
        eprintln!("based on {} reference clause(s):", generated.examples.len());
        for hit in &generated.examples {
            eprintln!("  [{:.3}] {}", hit.similarity, hit.item.id);
        }
    }
    Ok(())
}

/// CLI entry point for `clx rewrite`.
pub async fn run_rewrite(ctx: &AppContext, text: &str) -> Result<()> {
    println!("{}", rewrite_clause(ctx, text).await?);
    Ok(())
}

/// CLI entry point for `clx summarize`.
pub async fn run_summarize(ctx: &AppContext, text: &str) -> Result<()> {
    println!("{}", summarize_clause(ctx, text).await?);
    Ok(())
}
