//! End-to-end tests of the core pipeline using in-memory backends.

use async_trait::async_trait;
use clause_harness_core::apply::apply_edits;
use clause_harness_core::embedding::{embed_batched, Embedder};
use clause_harness_core::index::memory::InMemoryIndex;
use clause_harness_core::index::{IndexEntry, SearchFilters, SimilarityIndex};
use clause_harness_core::models::{LibraryItem, ProposedEdit};
use clause_harness_core::proposal::{propose_and_verify, EditProposer, PatchOutcome};
use clause_harness_core::search::{search, SearchRequest};
use clause_harness_core::split::split_into_spans;
use clause_harness_core::{ClauseError, Result};

const CONTRACT: &str = "1. Confidentiality\nThe Recipient agrees to keep information confidential.\n\n2. Term\nThis Agreement lasts one year.";

/// Letter-frequency embedder over a..z: deterministic and dimension 26.
struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }

    fn dims(&self) -> usize {
        26
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for c in t.to_ascii_lowercase().bytes() {
                    if c.is_ascii_lowercase() {
                        v[(c - b'a') as usize] += 1.0;
                    }
                }
                v
            })
            .collect())
    }
}

/// Proposer returning a fixed edit list.
struct FixedProposer(Vec<ProposedEdit>);

#[async_trait]
impl EditProposer for FixedProposer {
    async fn propose(&self, _instruction: &str, _text: &str) -> Result<Vec<ProposedEdit>> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn contract_split_patch_apply() {
    let spans = split_into_spans(CONTRACT).unwrap();
    assert_eq!(spans.len(), 2);
    assert!(spans[0].text.starts_with("1. Confidentiality"));
    assert!(spans[1].text.starts_with("2. Term"));

    let proposer = FixedProposer(vec![ProposedEdit::new("one year", "two years")]);
    let outcome = propose_and_verify(&proposer, "extend the term", CONTRACT)
        .await
        .unwrap();
    let report = match outcome {
        PatchOutcome::Verified(report) => report,
        other => panic!("expected verified edits, got {:?}", other),
    };
    let edit = &report.verified[0];
    assert_eq!(&CONTRACT[edit.start_index..edit.end_index], "one year");

    let applied = apply_edits(CONTRACT, &report.verified);
    assert!(applied.text.ends_with("This Agreement lasts two years."));
    assert!(applied.spans_invalidated());

    // Spans are re-derived from the new text.
    let respans = split_into_spans(&applied.text).unwrap();
    assert!(respans[1].text.ends_with("two years."));
}

#[tokio::test]
async fn partial_success_keeps_valid_edits() {
    let proposer = FixedProposer(vec![
        ProposedEdit::new("", "x"),
        ProposedEdit::new("Recipient", "Receiving Party"),
        ProposedEdit::new("ninety days", "x"),
    ]);
    let report = propose_and_verify(&proposer, "rename", CONTRACT)
        .await
        .unwrap()
        .into_report();
    assert_eq!(report.verified.len(), 1);
    assert_eq!(report.rejections.len(), 2);

    let applied = apply_edits(CONTRACT, &report.verified);
    assert!(applied.text.contains("The Receiving Party agrees"));
    assert!(applied.errors.is_empty());
}

#[tokio::test]
async fn stale_edits_reconcile_against_changed_text() {
    let report = propose_and_verify(
        &FixedProposer(vec![ProposedEdit::new("one year", "two years")]),
        "extend",
        CONTRACT,
    )
    .await
    .unwrap()
    .into_report();

    // Someone else replaced the text after verification.
    let changed = CONTRACT.replace("one year", "six months");
    let applied = apply_edits(&changed, &report.verified);
    assert_eq!(applied.applied_count, 0);
    assert_eq!(applied.errors.len(), 1);
    assert_eq!(applied.text, changed);
}

#[tokio::test]
async fn indexed_spans_are_searchable() {
    let embedder = LetterEmbedder;
    let index = InMemoryIndex::new(embedder.dims());

    let spans = split_into_spans(CONTRACT).unwrap();
    let texts: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
    let vectors = embed_batched(&embedder, &texts, 96).await.unwrap();
    for (i, (span, vector)) in spans.iter().zip(vectors).enumerate() {
        let item = LibraryItem {
            id: format!("doc-1:{}", i),
            text: span.text.clone(),
            category: None,
            is_reference: false,
            document_id: Some("doc-1".to_string()),
        };
        index.index(IndexEntry::new(item, vector)).await.unwrap();
    }

    let reference = LibraryItem {
        id: "lib-termination".to_string(),
        text: "Either party may terminate this Agreement with 30 days written notice.".to_string(),
        category: Some("Termination".to_string()),
        is_reference: true,
        document_id: None,
    };
    let vector = embedder.embed(&[reference.text.clone()]).await.unwrap().remove(0);
    index.index(IndexEntry::new(reference, vector)).await.unwrap();

    let hits = search(
        &index,
        &embedder,
        &SearchRequest::new("keep information confidential").with_k(1),
    )
    .await
    .unwrap();
    assert_eq!(hits[0].item.id, "doc-1:0");

    let refs = search(
        &index,
        &embedder,
        &SearchRequest::new("keep information confidential")
            .with_filters(SearchFilters::only_reference()),
    )
    .await
    .unwrap();
    assert_eq!(refs.len(), 1);
    assert!(refs[0].item.is_reference);

    let doc_only = search(
        &index,
        &embedder,
        &SearchRequest::new("term").with_filters(SearchFilters::for_document("doc-1")),
    )
    .await
    .unwrap();
    assert_eq!(doc_only.len(), 2);
}

#[tokio::test]
async fn wrong_dimension_rejected_at_index() {
    let index = InMemoryIndex::new(4);
    let item = LibraryItem {
        id: "x".into(),
        text: "x".into(),
        category: None,
        is_reference: false,
        document_id: None,
    };
    let err = index.index(IndexEntry::new(item, vec![1.0; 5])).await.unwrap_err();
    assert!(matches!(err, ClauseError::Config(_)));
}
