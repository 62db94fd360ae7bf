//! Patch workflow: propose → verify → (optionally) apply.
//!
//! Proposals come from the configured completion model and are verified
//! against the exact text they were proposed for. Applying to a stored
//! document holds that document's lock for the whole read-modify-write, then
//! re-splits and re-indexes the new text.

use anyhow::Result;
use clause_harness_core::apply::{apply_all_or_nothing, apply_edits};
use clause_harness_core::models::{ApplyReport, EditPreview, Rejection, VerifiedEdit};
use clause_harness_core::proposal::{propose_and_verify, PatchOutcome};
use clause_harness_core::verify::preview_edits;
use clause_harness_core::ClauseError;
use serde::Serialize;

use crate::app::AppContext;
use crate::ingest;

/// Response body for a patch proposal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResponse {
    /// `no_edits_proposed`, `all_rejected`, or `verified`.
    pub status: &'static str,
    pub edits: Vec<VerifiedEdit>,
    pub rejections: Vec<Rejection>,
    pub previews: Vec<EditPreview>,
}

impl PatchResponse {
    fn from_outcome(document_text: &str, outcome: PatchOutcome) -> Self {
        let status = outcome.status();
        let report = outcome.into_report();
        let previews = preview_edits(document_text, &report.verified);
        Self {
            status,
            edits: report.verified,
            rejections: report.rejections,
            previews,
        }
    }
}

/// Result of applying edits to a stored document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentApplyResponse {
    #[serde(flatten)]
    pub report: ApplyReport,
    pub document_id: String,
    /// Number of spans after re-splitting; absent when nothing changed.
    pub span_count: Option<usize>,
}

/// Ask the completion model for edits to `text` and verify them.
pub async fn propose_patch(
    ctx: &AppContext,
    instruction: &str,
    text: &str,
) -> std::result::Result<PatchResponse, ClauseError> {
    let outcome = propose_and_verify(ctx.completion.as_proposer(), instruction, text).await?;
    Ok(PatchResponse::from_outcome(text, outcome))
}

/// Propose edits against a stored document's current text.
pub async fn propose_for_document(
    ctx: &AppContext,
    document_id: &str,
    instruction: &str,
) -> std::result::Result<PatchResponse, ClauseError> {
    let doc = ctx
        .store
        .get_document(document_id)
        .await?
        .ok_or_else(|| ClauseError::NotFound(format!("document {}", document_id)))?;
    propose_patch(ctx, instruction, &doc.full_text).await
}

/// Apply verified edits to `text`.
///
/// By default edits that no longer match are reported in `errors` and
/// skipped. With `strict`, any such edit fails the whole batch with a
/// reconciliation error and nothing is applied.
pub fn apply_to_text(
    text: &str,
    edits: &[VerifiedEdit],
    strict: bool,
) -> std::result::Result<ApplyReport, ClauseError> {
    if !strict {
        return Ok(apply_edits(text, edits));
    }
    let text = apply_all_or_nothing(text, edits)?;
    Ok(ApplyReport {
        text,
        applied_count: edits.len(),
        errors: Vec::new(),
    })
}

/// Apply verified edits to a stored document.
///
/// When at least one edit lands, the new text replaces the stored text and
/// spans and vectors are rebuilt.
pub async fn apply_to_document(
    ctx: &AppContext,
    document_id: &str,
    edits: &[VerifiedEdit],
    strict: bool,
) -> std::result::Result<DocumentApplyResponse, ClauseError> {
    let _guard = ctx.locks.lock(document_id).await;

    let doc = ctx
        .store
        .get_document(document_id)
        .await?
        .ok_or_else(|| ClauseError::NotFound(format!("document {}", document_id)))?;

    let report = apply_to_text(&doc.full_text, edits, strict)?;
    for failure in &report.errors {
        tracing::warn!(
            document_id,
            start = failure.start_index,
            end = failure.end_index,
            "{}",
            failure.message
        );
    }

    let span_count = if report.spans_invalidated() {
        let summary = ingest::replace_text(ctx, document_id, &report.text).await?;
        Some(summary.span_count)
    } else {
        None
    };

    tracing::info!(
        document_id,
        applied = report.applied_count,
        skipped = report.errors.len(),
        "applied edits"
    );

    Ok(DocumentApplyResponse {
        report,
        document_id: document_id.to_string(),
        span_count,
    })
}

/// CLI entry point for `clx patch`.
pub async fn run_patch(
    ctx: &AppContext,
    document_id: &str,
    instruction: &str,
    apply: bool,
) -> Result<()> {
    let proposal = propose_for_document(ctx, document_id, instruction).await?;

    println!("patch {}", document_id);
    println!("  status: {}", proposal.status);
    for (i, preview) in proposal.previews.iter().enumerate() {
        println!(
            "  [{}] {}..{}",
            i, preview.edit.start_index, preview.edit.end_index
        );
        println!("    - {}", preview.edit.original_text_snippet);
        println!("    + {}", preview.edit.new_text);
    }
    for r in &proposal.rejections {
        println!("  rejected [{}]: {}", r.edit_index, r.message);
    }

    if apply && !proposal.edits.is_empty() {
        let applied = apply_to_document(ctx, document_id, &proposal.edits, false).await?;
        println!("  applied: {}", applied.report.applied_count);
        for e in &applied.report.errors {
            println!("  skipped: {}", e.message);
        }
        if let Some(n) = applied.span_count {
            println!("  spans: {}", n);
        }
    }

    println!("ok");
    Ok(())
}
