//! Document retrieval and listing.
//!
//! Used by `clx get`, `clx list`, and the `/api/templates` endpoints.

use anyhow::Result;
use clause_harness_core::models::Document;
use clause_harness_core::ClauseError;
use serde::Serialize;

use crate::app::AppContext;
use crate::store::StoredSpan;

/// A document with its current spans.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    pub spans: Vec<StoredSpan>,
}

/// Listing entry: everything except the text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub is_reference: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            is_reference: doc.is_reference,
            created_at: format_ts_iso(doc.created_at),
            updated_at: format_ts_iso(doc.updated_at),
        }
    }
}

pub async fn get_document(
    ctx: &AppContext,
    id: &str,
) -> std::result::Result<DocumentResponse, ClauseError> {
    let document = ctx
        .store
        .get_document(id)
        .await?
        .ok_or_else(|| ClauseError::NotFound(format!("document {}", id)))?;
    let spans = ctx.store.get_spans(id).await?;
    Ok(DocumentResponse { document, spans })
}

pub async fn list_documents(
    ctx: &AppContext,
    include_reference: bool,
) -> std::result::Result<Vec<DocumentSummary>, ClauseError> {
    let docs = ctx.store.list_documents(include_reference).await?;
    Ok(docs.into_iter().map(DocumentSummary::from).collect())
}

/// CLI entry point for `clx get`.
pub async fn run_get(ctx: &AppContext, id: &str) -> Result<()> {
    let doc = get_document(ctx, id).await?;

    println!("--- Document ---");
    println!("id:           {}", doc.document.id);
    println!("name:         {}", doc.document.name);
    println!("reference:    {}", doc.document.is_reference);
    println!("created_at:   {}", format_ts_iso(doc.document.created_at));
    println!("updated_at:   {}", format_ts_iso(doc.document.updated_at));
    println!();

    println!("--- Text ---");
    println!("{}", doc.document.full_text);
    println!();

    println!("--- Spans ({}) ---", doc.spans.len());
    for s in &doc.spans {
        println!(
            "[span {}] {}..{}",
            s.span_index, s.span.start_index, s.span.end_index
        );
        println!("{}", s.span.text);
        println!();
    }

    Ok(())
}

/// CLI entry point for `clx list`.
pub async fn run_list(ctx: &AppContext, include_reference: bool) -> Result<()> {
    let docs = list_documents(ctx, include_reference).await?;
    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for d in docs {
        let tag = if d.is_reference { " [reference]" } else { "" };
        println!("{}  {}  {}{}", d.id, d.updated_at, d.name, tag);
    }
    Ok(())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
