//! Similarity search over clause spans and reference clauses.
//!
//! The search pipeline operates entirely through the [`SimilarityIndex`]
//! and [`Embedder`] traits, with no database or configuration
//! dependencies. The calling application picks the backends.
//!
//! # Algorithm
//!
//! 1. Empty (or whitespace-only) query, or `k == 0`: return no hits.
//! 2. Embed the query with the same embedder that built the index.
//! 3. Check the query dimension against the index.
//! 4. Delegate to [`SimilarityIndex::query_by_vector`] with the filters.
//!
//! Two entry points share this pipeline: [`search`] propagates every
//! failure, while [`retrieve_context`] is for prompt building and degrades
//! to an empty result.

use serde::{Deserialize, Serialize};

use crate::embedding::{check_dims, embed_one, Embedder};
use crate::error::Result;
use crate::index::{SearchFilters, SimilarityIndex};
use crate::models::SearchHit;

/// Default number of hits for a search.
pub const DEFAULT_K: usize = 6;

/// Bundles the inputs for one search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(flatten)]
    pub filters: SearchFilters,
}

fn default_k() -> usize {
    DEFAULT_K
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            k: DEFAULT_K,
            filters: SearchFilters::default(),
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Return the `k` entries most similar to `query`.
///
/// Fails with a transient error if the embedder fails, and with a config
/// error if the query vector's dimension differs from the index's.
pub async fn search(
    index: &dyn SimilarityIndex,
    embedder: &dyn Embedder,
    req: &SearchRequest,
) -> Result<Vec<SearchHit>> {
    if req.query.trim().is_empty() || req.k == 0 {
        return Ok(Vec::new());
    }

    let vector = embed_one(embedder, &req.query).await?;
    check_dims(index.dims(), &vector)?;

    let hits = index.query_by_vector(&vector, req.k, &req.filters).await?;
    tracing::debug!(k = req.k, hits = hits.len(), "similarity search");
    Ok(hits)
}

/// Like [`search`], but any failure is logged and yields no hits.
///
/// Used where retrieval only enriches a prompt and must not block the
/// caller (clause generation falls back to a fixed message).
pub async fn retrieve_context(
    index: &dyn SimilarityIndex,
    embedder: &dyn Embedder,
    req: &SearchRequest,
) -> Vec<SearchHit> {
    match search(index, embedder, req).await {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(error = %e, "context retrieval failed, continuing without examples");
            Vec::new()
        }
    }
}
