//! Edit proposals: the language-model boundary and the patch workflow.
//!
//! An [`EditProposer`] turns an instruction plus the full document text into
//! position-free [`ProposedEdit`]s. Whatever the proposer returns is
//! untrusted: raw model output goes through [`parse_proposal`] before any
//! edit reaches the verifier, and a malformed payload fails the whole batch.
//!
//! [`propose_and_verify`] runs the workflow and reports one of three
//! outcomes, kept distinct so a caller can explain the result:
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | [`PatchOutcome::NoEditsProposed`] | The model found nothing to change |
//! | [`PatchOutcome::AllRejected`] | Edits were proposed but none exist in the text |
//! | [`PatchOutcome::Verified`] | At least one edit verified (rejections may accompany it) |
//!
//! A request that fails outright (transport, timeout, malformed payload)
//! is an `Err`, never an outcome.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ClauseError, Result};
use crate::models::{ProposedEdit, Rejection, VerifyReport};
use crate::verify::verify_edits;

/// External text-generation collaborator that suggests edits.
#[async_trait]
pub trait EditProposer: Send + Sync {
    /// Suggest edits for `instruction` against `document_text`.
    ///
    /// An empty vector means "no applicable edit" and is not an error.
    async fn propose(&self, instruction: &str, document_text: &str) -> Result<Vec<ProposedEdit>>;
}

/// Result of one propose-and-verify run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatchOutcome {
    NoEditsProposed,
    AllRejected { rejections: Vec<Rejection> },
    Verified(VerifyReport),
}

impl PatchOutcome {
    /// Classify a verification report.
    pub fn from_report(proposed: usize, report: VerifyReport) -> Self {
        if proposed == 0 {
            PatchOutcome::NoEditsProposed
        } else if report.verified.is_empty() {
            PatchOutcome::AllRejected {
                rejections: report.rejections,
            }
        } else {
            PatchOutcome::Verified(report)
        }
    }

    /// Stable status name, matching the serialized `status` tag.
    pub fn status(&self) -> &'static str {
        match self {
            PatchOutcome::NoEditsProposed => "no_edits_proposed",
            PatchOutcome::AllRejected { .. } => "all_rejected",
            PatchOutcome::Verified(_) => "verified",
        }
    }

    /// Flatten into a report; empty for `NoEditsProposed`.
    pub fn into_report(self) -> VerifyReport {
        match self {
            PatchOutcome::NoEditsProposed => VerifyReport::default(),
            PatchOutcome::AllRejected { rejections } => VerifyReport {
                verified: Vec::new(),
                rejections,
            },
            PatchOutcome::Verified(report) => report,
        }
    }
}

/// Parse raw proposer output into edits.
///
/// Accepts `{"edits": [...]}` or a bare array, where each element is an
/// object with string `targetText` and `newText` fields and an optional
/// string `contextHint`. Anything else is a [`ClauseError::Validation`].
///
/// ```rust
/// use clause_harness_core::proposal::parse_proposal;
///
/// let edits = parse_proposal(r#"{"edits":[{"targetText":"one year","newText":"two years"}]}"#).unwrap();
/// assert_eq!(edits[0].new_text, "two years");
/// assert!(parse_proposal(r#"{"edits":"none"}"#).is_err());
/// ```
pub fn parse_proposal(raw: &str) -> Result<Vec<ProposedEdit>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ClauseError::Validation(format!("proposal is not valid JSON: {}", e)))?;
    parse_proposal_value(&value)
}

/// [`parse_proposal`] for an already-decoded JSON value.
pub fn parse_proposal_value(value: &Value) -> Result<Vec<ProposedEdit>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("edits") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ClauseError::Validation(
                    "\"edits\" must be an array".to_string(),
                ))
            }
            None => {
                return Err(ClauseError::Validation(
                    "proposal has no \"edits\" field".to_string(),
                ))
            }
        },
        _ => {
            return Err(ClauseError::Validation(
                "proposal must be an object or an array".to_string(),
            ))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_edit(i, item))
        .collect()
}

fn parse_edit(i: usize, item: &Value) -> Result<ProposedEdit> {
    let obj = item
        .as_object()
        .ok_or_else(|| ClauseError::Validation(format!("edit {} is not an object", i)))?;

    let field = |name: &str| -> Result<String> {
        match obj.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ClauseError::Validation(format!(
                "edit {}: \"{}\" must be a string",
                i, name
            ))),
            None => Err(ClauseError::Validation(format!(
                "edit {}: missing \"{}\"",
                i, name
            ))),
        }
    };

    let context_hint = match obj.get("contextHint") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(ClauseError::Validation(format!(
                "edit {}: \"contextHint\" must be a string",
                i
            )))
        }
    };

    Ok(ProposedEdit {
        target_text: field("targetText")?,
        new_text: field("newText")?,
        context_hint,
    })
}

/// Ask `proposer` for edits and verify them against `document_text`.
///
/// Fails with [`ClauseError::Input`] if the instruction or document is
/// blank, and passes proposer errors through untouched.
pub async fn propose_and_verify(
    proposer: &dyn EditProposer,
    instruction: &str,
    document_text: &str,
) -> Result<PatchOutcome> {
    if instruction.trim().is_empty() {
        return Err(ClauseError::Input("instruction is empty".to_string()));
    }
    if document_text.trim().is_empty() {
        return Err(ClauseError::Input("document text is empty".to_string()));
    }

    let edits = proposer.propose(instruction, document_text).await?;
    let report = verify_edits(document_text, &edits);
    let outcome = PatchOutcome::from_report(edits.len(), report);
    tracing::info!(
        proposed = edits.len(),
        status = outcome.status(),
        "patch proposal verified"
    );
    Ok(outcome)
}
