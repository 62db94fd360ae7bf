//! Patch applicator.
//!
//! Applies a set of [`VerifiedEdit`]s to document text in a single pass.
//!
//! # Algorithm
//!
//! 1. Stable-sort edits by `start_index`, descending. Splicing from the end
//!    of the document toward the start keeps every not-yet-applied offset
//!    valid even when replacements change length. Edits sharing a start
//!    offset keep their input order.
//! 2. For each edit, re-check the range against the *current* working text
//!    (bounds, `char` boundaries, and that the range still starts with the
//!    edit's `original_text_snippet`). A failed check skips that edit and
//!    records a [`ReconciliationFailure`]; other edits still apply.
//! 3. Return the spliced text, the number of edits applied, and the failures.
//!
//! Application order is a correctness requirement: edits on the same
//! document must never be applied concurrently.

use crate::error::{ClauseError, Result};
use crate::models::{ApplyReport, ReconciliationFailure, VerifiedEdit};

/// Apply verified edits to `document_text`.
///
/// # Example
///
/// ```rust
/// use clause_harness_core::apply::apply_edits;
/// use clause_harness_core::models::VerifiedEdit;
///
/// let edit = VerifiedEdit {
///     start_index: 0,
///     end_index: 3,
///     new_text: "X".into(),
///     original_text_snippet: "AAA".into(),
/// };
/// let report = apply_edits("AAA BBB", &[edit]);
/// assert_eq!(report.text, "X BBB");
/// assert_eq!(report.applied_count, 1);
/// ```
pub fn apply_edits(document_text: &str, edits: &[VerifiedEdit]) -> ApplyReport {
    let mut ordered: Vec<&VerifiedEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.start_index.cmp(&a.start_index));

    let mut text = document_text.to_string();
    let mut applied_count = 0;
    let mut errors = Vec::new();

    for edit in ordered {
        match reconcile(&text, edit) {
            Ok(()) => {
                text.replace_range(edit.start_index..edit.end_index, &edit.new_text);
                applied_count += 1;
            }
            Err(e) => {
                tracing::warn!(
                    start = edit.start_index,
                    end = edit.end_index,
                    error = %e,
                    "skipped edit"
                );
                errors.push(ReconciliationFailure {
                    start_index: edit.start_index,
                    end_index: edit.end_index,
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::debug!(
        applied = applied_count,
        skipped = errors.len(),
        "applied edits"
    );

    ApplyReport {
        text,
        applied_count,
        errors,
    }
}

/// Apply edits, failing if any edit does not reconcile.
///
/// For callers that accept a patch set as a unit; the input text is left
/// untouched on failure.
pub fn apply_all_or_nothing(document_text: &str, edits: &[VerifiedEdit]) -> Result<String> {
    let report = apply_edits(document_text, edits);
    match report.errors.first() {
        None => Ok(report.text),
        Some(first) => Err(ClauseError::Reconciliation(format!(
            "{} of {} edits no longer match the document; first at {}..{}: {}",
            report.errors.len(),
            edits.len(),
            first.start_index,
            first.end_index,
            first.message
        ))),
    }
}

/// Check that `edit` still targets the text it was verified against.
fn reconcile(text: &str, edit: &VerifiedEdit) -> Result<()> {
    if edit.start_index > edit.end_index || edit.end_index > text.len() {
        return Err(ClauseError::Reconciliation(format!(
            "range {}..{} is outside the document (length {})",
            edit.start_index,
            edit.end_index,
            text.len()
        )));
    }

    let current = text.get(edit.start_index..edit.end_index).ok_or_else(|| {
        ClauseError::Reconciliation(format!(
            "range {}..{} does not fall on character boundaries",
            edit.start_index, edit.end_index
        ))
    })?;

    if !current.starts_with(edit.original_text_snippet.as_str()) {
        return Err(ClauseError::Reconciliation(format!(
            "expected \"{}\" at {}..{} but found \"{}\"",
            edit.original_text_snippet, edit.start_index, edit.end_index, current
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProposedEdit;
    use crate::verify::verify_edits;

    fn edit(start: usize, end: usize, new_text: &str, snippet: &str) -> VerifiedEdit {
        VerifiedEdit {
            start_index: start,
            end_index: end,
            new_text: new_text.to_string(),
            original_text_snippet: snippet.to_string(),
        }
    }

    #[test]
    fn test_ascending_input_applies_descending() {
        let edits = vec![edit(0, 3, "X", "AAA"), edit(8, 11, "YY", "CCC")];
        let report = apply_edits("AAA BBB CCC", &edits);
        assert_eq!(report.text, "X BBB YY");
        assert_eq!(report.applied_count, 2);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_order_independent() {
        let forward = vec![edit(0, 3, "X", "AAA"), edit(8, 11, "YY", "CCC")];
        let backward: Vec<VerifiedEdit> = forward.iter().rev().cloned().collect();
        assert_eq!(
            apply_edits("AAA BBB CCC", &forward).text,
            apply_edits("AAA BBB CCC", &backward).text
        );
    }

    #[test]
    fn test_double_edit_second_skipped() {
        let edits = vec![edit(0, 3, "X", "AAA"), edit(0, 3, "Z", "AAA")];
        let report = apply_edits("AAA BBB", &edits);
        assert_eq!(report.text, "X BBB");
        assert_eq!(report.applied_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].start_index, 0);
    }

    #[test]
    fn test_out_of_bounds_skipped() {
        let edits = vec![edit(4, 40, "x", "BBB"), edit(0, 3, "X", "AAA")];
        let report = apply_edits("AAA BBB", &edits);
        assert_eq!(report.text, "X BBB");
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("outside"));
    }

    #[test]
    fn test_inverted_range_skipped() {
        let report = apply_edits("AAA", &[edit(2, 1, "x", "")]);
        assert_eq!(report.text, "AAA");
        assert_eq!(report.applied_count, 0);
    }

    #[test]
    fn test_non_char_boundary_skipped() {
        let report = apply_edits("§ clause", &[edit(1, 2, "x", "")]);
        assert_eq!(report.text, "§ clause");
        assert!(report.errors[0].message.contains("boundaries"));
    }

    #[test]
    fn test_changed_document_detected() {
        let report = apply_edits("ABC BBB", &[edit(0, 3, "X", "AAA")]);
        assert_eq!(report.text, "ABC BBB");
        assert!(!report.spans_invalidated());
    }

    #[test]
    fn test_untouched_text_identical() {
        let doc = "Rent: [AMOUNT]. Deposit: [DEPOSIT]. Pets: none.";
        let verified = verify_edits(
            doc,
            &[
                ProposedEdit::new("[DEPOSIT]", "$2,000"),
                ProposedEdit::new("[AMOUNT]", "$1,000"),
            ],
        )
        .verified;
        let report = apply_edits(doc, &verified);
        assert_eq!(report.text, "Rent: $1,000. Deposit: $2,000. Pets: none.");
        assert!(report.spans_invalidated());
    }

    #[test]
    fn test_edited_ranges_hold_replacements() {
        let doc = "alpha beta gamma";
        let verified = verify_edits(
            doc,
            &[
                ProposedEdit::new("alpha", "ALPHA!"),
                ProposedEdit::new("gamma", "g"),
            ],
        )
        .verified;
        let report = apply_edits(doc, &verified);
        assert_eq!(report.text, "ALPHA! beta g");
        for v in &verified {
            assert!(!report.text.contains(&v.original_text_snippet));
        }
    }

    #[test]
    fn test_empty_set_returns_original() {
        let report = apply_edits("unchanged", &[]);
        assert_eq!(report.text, "unchanged");
        assert_eq!(report.applied_count, 0);
    }

    #[test]
    fn test_all_or_nothing() {
        assert_eq!(
            apply_all_or_nothing("AAA", &[edit(0, 3, "B", "AAA")]).unwrap(),
            "B"
        );
        let err = apply_all_or_nothing("AAA", &[edit(0, 3, "B", "ZZZ")]).unwrap_err();
        assert!(matches!(err, ClauseError::Reconciliation(_)));
    }
}
