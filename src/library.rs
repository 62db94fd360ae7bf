//! Reference clause library.
//!
//! Library items are standalone exemplar clauses (no parent document) used
//! as style references for generation and as search results. `clx library
//! load` indexes either a JSON file of items or the built-in set.

use anyhow::{Context, Result};
use clause_harness_core::embedding::embed_batched;
use clause_harness_core::index::{IndexEntry, SimilarityIndex};
use clause_harness_core::models::{text_hash, LibraryItem};
use clause_harness_core::ClauseError;
use serde::Deserialize;
use std::path::Path;

use crate::app::AppContext;

/// One entry of a library JSON file.
///
/// ```json
/// [{ "id": "nda-1", "category": "Confidentiality", "text": "..." }]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryFileEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_reference")]
    pub is_reference: bool,
}

fn default_reference() -> bool {
    true
}

/// The built-in exemplar clauses.
pub fn builtin_items() -> Vec<LibraryItem> {
    [
        (
            "Confidentiality",
            "The Recipient shall not disclose any confidential information without prior written consent.",
        ),
        (
            "Termination",
            "Either party may terminate this Agreement with 30 days written notice.",
        ),
        (
            "Governing Law",
            "This Agreement shall be governed by the laws of the State of New York.",
        ),
    ]
    .iter()
    .enumerate()
    .map(|(i, (category, text))| LibraryItem {
        id: format!("library-{}", i + 1),
        text: text.to_string(),
        category: Some(category.to_string()),
        is_reference: true,
        document_id: None,
    })
    .collect()
}

/// Id for a file entry that does not name one.
///
/// Derived from the clause text, so reloading a file keeps its ids and never
/// reuses the `library-<n>` ids of the built-in set.
pub fn derived_id(text: &str) -> String {
    format!("clause-{}", &text_hash(text)[..16])
}

/// Parse library items from JSON, deriving ids from the text where missing.
pub fn parse_items(json: &str) -> Result<Vec<LibraryItem>> {
    let entries: Vec<LibraryFileEntry> =
        serde_json::from_str(json).context("library file must be a JSON array of clauses")?;
    Ok(items_from_entries(entries)?)
}

/// Turn file entries into library items. Blank text is an input error.
pub fn items_from_entries(
    entries: Vec<LibraryFileEntry>,
) -> std::result::Result<Vec<LibraryItem>, ClauseError> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, e)| {
            if e.text.trim().is_empty() {
                return Err(ClauseError::Input(format!(
                    "library entry {} has empty text",
                    i
                )));
            }
            Ok(LibraryItem {
                id: e.id.unwrap_or_else(|| derived_id(&e.text)),
                text: e.text,
                category: e.category,
                is_reference: e.is_reference,
                document_id: None,
            })
        })
        .collect()
}

/// Embed and index library items. Re-loading an id replaces it.
pub async fn load_items(
    ctx: &AppContext,
    items: Vec<LibraryItem>,
) -> std::result::Result<usize, ClauseError> {
    let texts: Vec<String> = items.iter().map(|i| i.text.clone()).collect();
    let vectors = embed_batched(
        ctx.embedder.as_ref(),
        &texts,
        ctx.config.embedding.batch_size,
    )
    .await?;

    let count = items.len();
    for (item, vector) in items.into_iter().zip(vectors) {
        ctx.store.index(IndexEntry::new(item, vector)).await?;
    }
    tracing::info!(items = count, "loaded clause library");
    Ok(count)
}

/// CLI entry point for `clx library load`.
pub async fn run_load(ctx: &AppContext, file: Option<&Path>) -> Result<()> {
    let items = match file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_items(&json)?
        }
        None => builtin_items(),
    };

    let count = load_items(ctx, items).await?;
    println!("library load");
    println!("  items indexed: {}", count);
    println!("  reference clauses: {}", ctx.store.count_vectors(true).await?);
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_items_are_reference() {
        let items = builtin_items();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.is_reference && i.document_id.is_none()));
        assert_eq!(items[2].category.as_deref(), Some("Governing Law"));
    }

    #[test]
    fn test_parse_items_defaults() {
        let items = parse_items(
            r#"[{"text":"Clause A."},{"id":"x","text":"Clause B.","category":"Misc","isReference":false}]"#,
        )
        .unwrap();
        assert_eq!(items[0].id, derived_id("Clause A."));
        assert!(items[0].id.starts_with("clause-"));
        assert!(items[0].is_reference);
        assert_eq!(items[1].id, "x");
        assert!(!items[1].is_reference);
    }

    #[test]
    fn test_file_ids_do_not_reuse_builtin_ids() {
        let builtin: Vec<String> = builtin_items().into_iter().map(|i| i.id).collect();
        let items = parse_items(
            r#"[{"text":"My custom indemnity clause."},{"text":"Another clause."},{"text":"Third."}]"#,
        )
        .unwrap();
        for item in &items {
            assert!(!builtin.contains(&item.id), "{} collides", item.id);
        }
        assert_ne!(items[0].id, items[1].id);

        let again = parse_items(r#"[{"text":"My custom indemnity clause."}]"#).unwrap();
        assert_eq!(again[0].id, items[0].id);
    }

    #[test]
    fn test_parse_items_rejects_bad_input() {
        assert!(parse_items(r#"{"text":"not an array"}"#).is_err());
        assert!(parse_items(r#"[{"text":"  "}]"#).is_err());
    }
}
