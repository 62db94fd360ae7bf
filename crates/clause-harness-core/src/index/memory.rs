//! In-memory [`SimilarityIndex`] for tests and WASM targets.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`, so insertion order is
//! the tie-break order. Queries are brute-force cosine similarity over every
//! admitted entry.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::embedding::{check_dims, cosine_similarity};
use crate::error::{ClauseError, Result};
use crate::models::SearchHit;

use super::{rank, IndexEntry, SearchFilters, SimilarityIndex};

/// In-memory similarity index with a fixed vector dimension.
pub struct InMemoryIndex {
    dims: usize,
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry belonging to `document_id`, e.g. after its text changed.
    pub fn remove_document(&self, document_id: &str) -> Result<usize> {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|e| e.item.document_id.as_deref() != Some(document_id));
        Ok(before - entries.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<IndexEntry>>> {
        self.entries
            .read()
            .map_err(|_| ClauseError::Storage(anyhow::anyhow!("index lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<IndexEntry>>> {
        self.entries
            .write()
            .map_err(|_| ClauseError::Storage(anyhow::anyhow!("index lock poisoned")))
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn index(&self, entry: IndexEntry) -> Result<()> {
        check_dims(self.dims, &entry.vector)?;
        let mut entries = self.write()?;
        match entries.iter_mut().find(|e| e.item.id == entry.item.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    async fn query_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>> {
        check_dims(self.dims, vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let entries = self.read()?;
        let hits: Vec<SearchHit> = entries
            .iter()
            .filter(|e| filters.admits(e.item.is_reference, e.item.document_id.as_deref()))
            .map(|e| SearchHit {
                item: e.item.clone(),
                similarity: cosine_similarity(vector, &e.vector),
            })
            .collect();

        Ok(rank(hits, k))
    }
}
