//! Similarity index abstraction.
//!
//! The [`SimilarityIndex`] trait is the contract every retrieval backend
//! satisfies (the SQLite store in the app crate, [`memory::InMemoryIndex`]
//! for tests and WASM targets):
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`index`](SimilarityIndex::index) | Store or replace one entry |
//! | [`query_by_vector`](SimilarityIndex::query_by_vector) | Filtered top-k by cosine similarity |
//! | [`dims`](SimilarityIndex::dims) | Index-wide vector dimension |
//!
//! # Ranking
//!
//! `score = cos(query, entry)`; results are ordered by score descending and
//! ties keep insertion order. Filters are applied before ranking, so a
//! query returns fewer than `k` results only when fewer entries match.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{LibraryItem, SearchHit};

/// Which entries a query may return, by reference flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceFilter {
    /// Reference and non-reference entries.
    #[default]
    Any,
    /// Only reference material.
    Only,
    /// Only non-reference entries.
    Exclude,
}

impl ReferenceFilter {
    pub fn admits(&self, is_reference: bool) -> bool {
        match self {
            ReferenceFilter::Any => true,
            ReferenceFilter::Only => is_reference,
            ReferenceFilter::Exclude => !is_reference,
        }
    }
}

impl std::str::FromStr for ReferenceFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "any" | "all" => Ok(ReferenceFilter::Any),
            "only" | "true" => Ok(ReferenceFilter::Only),
            "exclude" | "false" => Ok(ReferenceFilter::Exclude),
            other => Err(format!(
                "unknown reference filter '{}': use any, only, or exclude",
                other
            )),
        }
    }
}

/// Filters applied before ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub reference: ReferenceFilter,
    /// Restrict results to spans of one document.
    #[serde(default)]
    pub document_id: Option<String>,
}

impl SearchFilters {
    pub fn only_reference() -> Self {
        Self {
            reference: ReferenceFilter::Only,
            document_id: None,
        }
    }

    pub fn for_document(document_id: impl Into<String>) -> Self {
        Self {
            reference: ReferenceFilter::Any,
            document_id: Some(document_id.into()),
        }
    }

    /// Whether an entry with these flags passes the filters.
    pub fn admits(&self, is_reference: bool, document_id: Option<&str>) -> bool {
        if !self.reference.admits(is_reference) {
            return false;
        }
        match &self.document_id {
            Some(wanted) => document_id == Some(wanted.as_str()),
            None => true,
        }
    }
}

/// One indexed clause: its text, vector, and filterable flags.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub item: LibraryItem,
    pub vector: Vec<f32>,
}

impl IndexEntry {
    pub fn new(item: LibraryItem, vector: Vec<f32>) -> Self {
        Self { item, vector }
    }
}

/// Storage backend for nearest-neighbor clause retrieval.
///
/// Implementations must be `Send + Sync`: queries run concurrently with each
/// other and with writers, and writes for distinct ids are order-insensitive.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Vector dimension shared by every stored and query vector.
    fn dims(&self) -> usize;

    /// Store one entry, replacing any entry with the same id.
    ///
    /// Fails with [`ClauseError::Config`](crate::ClauseError::Config) if the
    /// vector length differs from [`dims`](SimilarityIndex::dims).
    async fn index(&self, entry: IndexEntry) -> Result<()>;

    /// Top-`k` entries admitted by `filters`, most similar first.
    async fn query_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>>;
}

/// Stable descending sort by similarity, then truncate to `k`.
///
/// Candidates must arrive in insertion order for ties to resolve correctly.
pub fn rank(mut hits: Vec<SearchHit>, k: usize) -> Vec<SearchHit> {
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);
    hits
}
