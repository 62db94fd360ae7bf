//! Clause span splitter.
//!
//! Partitions raw document text into an ordered sequence of [`Span`]s, each
//! carrying exact byte offsets into the original text.
//!
//! # Algorithm
//!
//! 1. If any line starts with a numbered heading (`2 `, `2.1 `, `3.1.4 `,
//!    `7. `), split the text into sections at each heading line. The heading
//!    line starts its section; text before the first heading is dropped.
//!    Each section is further split on blank lines so a long numbered
//!    section does not become one giant span.
//! 2. Otherwise split the whole text on blank lines (two or more newlines).
//! 3. Trim every piece, drop empty ones, and locate each remaining piece at
//!    or after a monotonically advancing cursor, so spans come out in
//!    document order and never overlap even when a clause repeats.
//! 4. Guarantee at least one span for non-empty text.
//!
//! # Example
//!
//! ```rust
//! use clause_harness_core::split::split_into_spans;
//!
//! let text = "1. Confidentiality\nKeep it secret.\n\n2. Term\nOne year.";
//! let spans = split_into_spans(text).unwrap();
//! assert_eq!(spans.len(), 2);
//! assert_eq!(&text[spans[1].start_index..spans[1].end_index], spans[1].text);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ClauseError, Result};
use crate::models::Span;

/// A line beginning with a dotted numeric prefix followed by horizontal space.
static NUMBERED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\d+(?:\.\d+)*\.?[ \t]+").unwrap());

/// Two or more consecutive newlines (LF or CRLF).
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\r?\n){2,}").unwrap());

/// Split document text into clause spans.
///
/// # Errors
///
/// Returns [`ClauseError::Input`] when the text is empty or whitespace-only;
/// a document with zero clauses must not be stored.
///
/// # Guarantees
///
/// - At least one span is returned for non-blank text.
/// - `text[span.start_index..span.end_index] == span.text` for every span.
/// - `spans[i].end_index <= spans[i + 1].start_index`.
pub fn split_into_spans(text: &str) -> Result<Vec<Span>> {
    if text.trim().is_empty() {
        return Err(ClauseError::Input(
            "no content: document has no text to split into clauses".to_string(),
        ));
    }

    let heading_starts: Vec<usize> = NUMBERED_HEADING
        .find_iter(text)
        .map(|m| m.start())
        .collect();

    let (pieces, mut cursor) = if heading_starts.is_empty() {
        (paragraphs(text), 0)
    } else {
        (numbered_sections(text, &heading_starts), heading_starts[0])
    };

    let mut spans = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(pos) = text[cursor..].find(trimmed) {
            let start = cursor + pos;
            let end = start + trimmed.len();
            spans.push(Span {
                text: trimmed.to_string(),
                start_index: start,
                end_index: end,
            });
            cursor = end;
        }
    }

    if spans.is_empty() {
        let trimmed = text.trim();
        let start = text.len() - text.trim_start().len();
        spans.push(Span {
            text: trimmed.to_string(),
            start_index: start,
            end_index: start + trimmed.len(),
        });
    }

    tracing::debug!(
        spans = spans.len(),
        numbered = !heading_starts.is_empty(),
        "split document"
    );

    Ok(spans)
}

/// Whether the text would be split on numbered headings rather than blank lines.
pub fn has_numbered_headings(text: &str) -> bool {
    NUMBERED_HEADING.is_match(text)
}

fn paragraphs(text: &str) -> Vec<&str> {
    BLANK_LINES.split(text).collect()
}

fn numbered_sections<'a>(text: &'a str, heading_starts: &[usize]) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    for (i, &start) in heading_starts.iter().enumerate() {
        let end = heading_starts.get(i + 1).copied().unwrap_or(text.len());
        pieces.extend(paragraphs(&text[start..end]));
    }
    pieces
}
