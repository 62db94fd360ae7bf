//! Patch verifier.
//!
//! Turns position-free [`ProposedEdit`]s into [`VerifiedEdit`]s by finding
//! each target as an exact, case-sensitive substring of the current
//! document text. The model never sees offsets, so nothing it says about
//! *where* an edit goes is trusted; only text that really exists is.
//!
//! # Rules
//!
//! - Edits are verified independently and the output keeps input order.
//! - An empty or whitespace-only target is rejected.
//! - The first occurrence wins. When the edit carries a `context_hint` and
//!   the target occurs more than once, the first occurrence adjacent to (or
//!   inside) the hint is chosen instead; if none qualifies, the first
//!   occurrence is used.
//! - Overlaps between verified edits are not checked here; the applicator
//!   reconciles them.

use crate::models::{
    EditPreview, ProposedEdit, Rejection, RejectionKind, VerifiedEdit, VerifyReport,
};

/// Characters of a target quoted in rejection messages.
const EXCERPT_CHARS: usize = 30;

/// Verify a batch of proposed edits against the current document text.
///
/// Never fails: every edit either becomes a [`VerifiedEdit`] or produces a
/// [`Rejection`]. An empty batch yields an empty report with no rejections.
pub fn verify_edits(document_text: &str, edits: &[ProposedEdit]) -> VerifyReport {
    let mut report = VerifyReport::default();

    for (edit_index, edit) in edits.iter().enumerate() {
        let target = edit.target_text.as_str();

        if target.trim().is_empty() {
            tracing::warn!(edit_index, "rejected edit with empty target");
            report.rejections.push(Rejection {
                edit_index,
                kind: RejectionKind::EmptyTarget,
                message: "empty target: the suggested edit has no text to replace".to_string(),
            });
            continue;
        }

        let start = match locate(document_text, target, edit.context_hint.as_deref()) {
            Some(start) => start,
            None => {
                tracing::warn!(edit_index, target = %excerpt(target), "target not found");
                report.rejections.push(Rejection {
                    edit_index,
                    kind: RejectionKind::TargetNotFound,
                    message: format!(
                        "target not found: could not find \"{}\" in the document",
                        excerpt(target)
                    ),
                });
                continue;
            }
        };

        report.verified.push(VerifiedEdit {
            start_index: start,
            end_index: start + target.len(),
            new_text: edit.new_text.clone(),
            original_text_snippet: target.to_string(),
        });
    }

    tracing::debug!(
        proposed = edits.len(),
        verified = report.verified.len(),
        rejected = report.rejections.len(),
        "verified edits"
    );

    report
}

/// Pair each verified edit with the text currently at its range.
pub fn preview_edits(document_text: &str, edits: &[VerifiedEdit]) -> Vec<EditPreview> {
    edits
        .iter()
        .map(|edit| EditPreview {
            edit: edit.clone(),
            current_text: document_text
                .get(edit.start_index..edit.end_index)
                .map(str::to_string),
        })
        .collect()
}

/// Start offset of the occurrence of `target` an edit should apply to.
fn locate(text: &str, target: &str, hint: Option<&str>) -> Option<usize> {
    let first = text.find(target)?;

    let hint = match hint.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => return Some(first),
    };

    let starts: Vec<usize> = text.match_indices(target).map(|(s, _)| s).collect();
    if starts.len() < 2 {
        return Some(first);
    }

    // Most specific placement first: inside the hint, then after it, then before it.
    let placements: [fn(&str, usize, usize, &str) -> bool; 3] =
        [inside_hint, follows_hint, precedes_hint];
    let chosen = placements.iter().find_map(|placed| {
        starts
            .iter()
            .copied()
            .find(|&start| placed(text, start, start + target.len(), hint))
    });

    Some(chosen.unwrap_or(first))
}

fn inside_hint(text: &str, start: usize, end: usize, hint: &str) -> bool {
    text.match_indices(hint)
        .any(|(h_start, h)| h_start <= start && end <= h_start + h.len())
}

fn follows_hint(text: &str, start: usize, _end: usize, hint: &str) -> bool {
    text[..start].trim_end().ends_with(hint)
}

fn precedes_hint(text: &str, _start: usize, end: usize, hint: &str) -> bool {
    text[end..].trim_start().starts_with(hint)
}

fn excerpt(s: &str) -> String {
    if s.chars().count() <= EXCERPT_CHARS {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(EXCERPT_CHARS).collect::<String>())
    }
}
