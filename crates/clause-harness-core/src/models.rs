//! Core data models used throughout Clause Harness.
//!
//! Offsets in [`Span`], [`VerifiedEdit`] and [`ReconciliationFailure`] are
//! byte offsets into the UTF-8 document text and always fall on `char`
//! boundaries. Wire names are camelCase so the types serialize the same way
//! the editor front-end reads them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A contiguous, offset-addressed clause of a document.
///
/// Derived data: a span is only valid for the exact document text it was
/// split from and must be discarded when that text changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
}

/// Hex SHA-256 of `text`.
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Span {
    /// SHA-256 of the span text, used to detect stale embeddings.
    pub fn content_hash(&self) -> String {
        text_hash(&self.text)
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }
}

/// The authoritative full text of a contract instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub full_text: String,
    /// Reference material is a style exemplar, not an editable contract.
    pub is_reference: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A clause exemplar indexed for similarity search.
///
/// Spans of uploaded documents are indexed as library items too; those carry
/// the parent `document_id` and inherit its reference flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_reference: bool,
    #[serde(default)]
    pub document_id: Option<String>,
}

/// A position-free edit suggested by a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedEdit {
    pub target_text: String,
    pub new_text: String,
    /// Text immediately before or after the target, used to pick among
    /// several occurrences of the same target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_hint: Option<String>,
}

impl ProposedEdit {
    pub fn new(target_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            target_text: target_text.into(),
            new_text: new_text.into(),
            context_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.context_hint = Some(hint.into());
        self
    }
}

/// An edit confirmed to exist at the stated offsets of one document snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedEdit {
    pub start_index: usize,
    pub end_index: usize,
    pub new_text: String,
    pub original_text_snippet: String,
}

/// Why a proposed edit could not be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    EmptyTarget,
    TargetNotFound,
}

/// A proposed edit that failed verification, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    /// Position of the edit in the proposed batch.
    pub edit_index: usize,
    pub kind: RejectionKind,
    pub message: String,
}

/// Output of [`verify_edits`](crate::verify::verify_edits).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Verified edits, in the order they were proposed.
    pub verified: Vec<VerifiedEdit>,
    pub rejections: Vec<Rejection>,
}

impl VerifyReport {
    /// Human-readable rejection reasons.
    pub fn rejection_messages(&self) -> Vec<String> {
        self.rejections.iter().map(|r| r.message.clone()).collect()
    }
}

/// A verified edit skipped at application time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationFailure {
    pub start_index: usize,
    pub end_index: usize,
    pub message: String,
}

/// Output of [`apply_edits`](crate::apply::apply_edits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub text: String,
    pub applied_count: usize,
    pub errors: Vec<ReconciliationFailure>,
}

impl ApplyReport {
    /// Whether the document changed, making every previously computed span stale.
    pub fn spans_invalidated(&self) -> bool {
        self.applied_count > 0
    }
}

/// A verified edit paired with the text it would replace, for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPreview {
    #[serde(flatten)]
    pub edit: VerifiedEdit,
    /// Current text at the edit's range, or `None` if the range is invalid.
    pub current_text: Option<String>,
}

/// A library item with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub item: LibraryItem,
    pub similarity: f64,
}
