//! Document upload and text replacement.
//!
//! Both paths share one flow: split → embed every span → write text, spans,
//! and vectors in a single transaction. Embedding happens before any write,
//! so a failed embedding call leaves the store untouched. With embeddings
//! disabled, spans are stored without vectors.

use anyhow::Result;
use clause_harness_core::embedding::embed_batched;
use clause_harness_core::models::{Document, Span};
use clause_harness_core::split::split_into_spans;
use clause_harness_core::ClauseError;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::app::AppContext;
use crate::store::StoredSpan;

/// Result of an upload or text replacement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub document_id: String,
    pub name: String,
    pub span_count: usize,
    pub embedded: bool,
    pub spans: Vec<StoredSpan>,
}

/// Split, embed, and store a new document.
pub async fn upload_document(
    ctx: &AppContext,
    name: &str,
    text: &str,
    is_reference: bool,
) -> std::result::Result<IngestSummary, ClauseError> {
    if name.trim().is_empty() {
        return Err(ClauseError::Input("document name is empty".to_string()));
    }

    let spans = split_into_spans(text)?;
    let vectors = embed_spans(ctx, &spans).await?;

    let now = chrono::Utc::now().timestamp();
    let doc = Document {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        full_text: text.to_string(),
        is_reference,
        created_at: now,
        updated_at: now,
    };

    let stored = ctx
        .store
        .insert_document(&doc, &spans, vectors.as_deref())
        .await?;

    tracing::info!(
        document_id = %doc.id,
        spans = stored.len(),
        embedded = vectors.is_some(),
        is_reference,
        "uploaded document"
    );

    Ok(IngestSummary {
        document_id: doc.id,
        name: doc.name,
        span_count: stored.len(),
        embedded: vectors.is_some(),
        spans: stored,
    })
}

/// Replace a stored document's full text, re-deriving spans and vectors.
///
/// The caller must hold the document's lock.
pub async fn replace_text(
    ctx: &AppContext,
    document_id: &str,
    text: &str,
) -> std::result::Result<IngestSummary, ClauseError> {
    let doc = ctx
        .store
        .get_document(document_id)
        .await?
        .ok_or_else(|| ClauseError::NotFound(format!("document {}", document_id)))?;

    let spans = split_into_spans(text)?;
    let vectors = embed_spans(ctx, &spans).await?;

    let stored = ctx
        .store
        .replace_document_text(document_id, text, &spans, vectors.as_deref())
        .await?
        .ok_or_else(|| ClauseError::NotFound(format!("document {}", document_id)))?;

    tracing::info!(
        document_id,
        spans = stored.len(),
        "replaced document text; previous spans invalidated"
    );

    Ok(IngestSummary {
        document_id: document_id.to_string(),
        name: doc.name,
        span_count: stored.len(),
        embedded: vectors.is_some(),
        spans: stored,
    })
}

/// Replace a document's text under its lock (manual edits, `PUT`).
pub async fn update_text(
    ctx: &AppContext,
    document_id: &str,
    text: &str,
) -> std::result::Result<IngestSummary, ClauseError> {
    let _guard = ctx.locks.lock(document_id).await;
    replace_text(ctx, document_id, text).await
}

/// Delete a document with its spans and span vectors.
pub async fn delete_document(
    ctx: &AppContext,
    document_id: &str,
) -> std::result::Result<(), ClauseError> {
    let _guard = ctx.locks.lock(document_id).await;
    if !ctx.store.delete_document(document_id).await? {
        return Err(ClauseError::NotFound(format!("document {}", document_id)));
    }
    tracing::info!(document_id, "deleted document");
    Ok(())
}

async fn embed_spans(
    ctx: &AppContext,
    spans: &[Span],
) -> std::result::Result<Option<Vec<Vec<f32>>>, ClauseError> {
    if !ctx.embeddings_enabled() {
        tracing::warn!("embedding provider disabled; storing spans without vectors");
        return Ok(None);
    }
    let texts: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
    let vectors = embed_batched(
        ctx.embedder.as_ref(),
        &texts,
        ctx.config.embedding.batch_size,
    )
    .await?;
    Ok(Some(vectors))
}

/// CLI entry point for `clx upload`.
pub async fn run_upload(
    ctx: &AppContext,
    path: &Path,
    name: Option<String>,
    is_reference: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    });

    let summary = upload_document(ctx, &name, &text, is_reference).await?;

    println!("upload {}", summary.name);
    println!("  document id: {}", summary.document_id);
    println!("  spans: {}", summary.span_count);
    println!(
        "  embedded: {}",
        if summary.embedded { "yes" } else { "no (embedding disabled)" }
    );
    println!("ok");
    Ok(())
}

/// CLI entry point for `clx split`: print spans without storing anything.
pub fn run_split(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let spans = split_into_spans(&text)?;
    println!("{}", serde_json::to_string_pretty(&spans)?);
    Ok(())
}
