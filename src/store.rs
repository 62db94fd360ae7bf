//! SQLite-backed document store and [`SimilarityIndex`].
//!
//! Documents own their spans and span vectors: replacing a document's text
//! deletes both in the same transaction as the text update, so stale spans
//! are never observable. Library items (reference clauses with no parent
//! document) live in `clause_vectors` alone.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use clause_harness_core::embedding::{blob_to_vec, check_dims, cosine_similarity, vec_to_blob};
use clause_harness_core::index::{rank, IndexEntry, ReferenceFilter, SearchFilters, SimilarityIndex};
use clause_harness_core::models::{Document, LibraryItem, SearchHit, Span};

/// A stored span row.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSpan {
    pub id: String,
    pub span_index: i64,
    #[serde(flatten)]
    pub span: Span,
}

/// SQLite implementation of document storage and similarity search.
pub struct SqliteStore {
    pool: SqlitePool,
    dims: usize,
}

impl SqliteStore {
    /// `dims` is the index-wide vector dimension (0 when embeddings are disabled).
    pub fn new(pool: SqlitePool, dims: usize) -> Self {
        Self { pool, dims }
    }

    /// Insert a document with its spans and, if given, one vector per span.
    pub async fn insert_document(
        &self,
        doc: &Document,
        spans: &[Span],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<Vec<StoredSpan>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, name, full_text, is_reference, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.name)
        .bind(&doc.full_text)
        .bind(doc.is_reference)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&mut *tx)
        .await?;

        let stored = write_spans(&mut tx, doc, spans, vectors, self.dims).await?;
        tx.commit().await?;
        Ok(stored)
    }

    /// Replace a document's text, spans, and span vectors atomically.
    ///
    /// Returns `None` if the document does not exist.
    pub async fn replace_document_text(
        &self,
        id: &str,
        full_text: &str,
        spans: &[Span],
        vectors: Option<&[Vec<f32>]>,
    ) -> Result<Option<Vec<StoredSpan>>> {
        let mut tx = self.pool.begin().await?;
        let now = chrono::Utc::now().timestamp();

        let updated = sqlx::query("UPDATE documents SET full_text = ?, updated_at = ? WHERE id = ?")
            .bind(full_text)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Ok(None);
        }

        clear_spans(&mut tx, id).await?;

        let row = sqlx::query(
            "SELECT id, name, full_text, is_reference, created_at, updated_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let doc = document_from_row(&row);

        let stored = write_spans(&mut tx, &doc, spans, vectors, self.dims).await?;
        tx.commit().await?;
        Ok(Some(stored))
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, name, full_text, is_reference, created_at, updated_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    pub async fn get_spans(&self, document_id: &str) -> Result<Vec<StoredSpan>> {
        let rows = sqlx::query(
            r#"
            SELECT id, span_index, text, start_index, end_index
            FROM spans WHERE document_id = ? ORDER BY span_index ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let start: i64 = row.get("start_index");
                let end: i64 = row.get("end_index");
                StoredSpan {
                    id: row.get("id"),
                    span_index: row.get("span_index"),
                    span: Span {
                        text: row.get("text"),
                        start_index: start as usize,
                        end_index: end as usize,
                    },
                }
            })
            .collect())
    }

    /// Documents, newest first.
    pub async fn list_documents(&self, include_reference: bool) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, full_text, is_reference, created_at, updated_at
            FROM documents
            WHERE ? OR is_reference = 0
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(include_reference)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    /// Delete a document with its spans and vectors. Returns whether it existed.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        clear_spans(&mut tx, id).await?;
        let deleted = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }

    /// Number of indexed vectors, optionally only reference ones.
    pub async fn count_vectors(&self, reference_only: bool) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM clause_vectors WHERE ? = 0 OR is_reference = 1")
                .bind(reference_only)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn upsert_vector(&self, entry: &IndexEntry) -> Result<()> {
        upsert_vector_row(&self.pool, &entry.item, &entry.vector).await
    }

    async fn vector_candidates(&self, filters: &SearchFilters) -> Result<Vec<(LibraryItem, Vec<f32>)>> {
        let reference: Option<bool> = match filters.reference {
            ReferenceFilter::Any => None,
            ReferenceFilter::Only => Some(true),
            ReferenceFilter::Exclude => Some(false),
        };

        let rows = sqlx::query(
            r#"
            SELECT id, document_id, category, text, is_reference, embedding
            FROM clause_vectors
            WHERE (? IS NULL OR is_reference = ?)
              AND (? IS NULL OR document_id = ?)
            ORDER BY seq ASC
            "#,
        )
        .bind(reference)
        .bind(reference)
        .bind(filters.document_id.as_deref())
        .bind(filters.document_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let item = LibraryItem {
                    id: row.get("id"),
                    text: row.get("text"),
                    category: row.get("category"),
                    is_reference: row.get("is_reference"),
                    document_id: row.get("document_id"),
                };
                (item, blob_to_vec(&blob))
            })
            .collect())
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        name: row.get("name"),
        full_text: row.get("full_text"),
        is_reference: row.get("is_reference"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

async fn clear_spans(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, document_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM clause_vectors WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM spans WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn write_spans(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    doc: &Document,
    spans: &[Span],
    vectors: Option<&[Vec<f32>]>,
    dims: usize,
) -> Result<Vec<StoredSpan>> {
    if let Some(vecs) = vectors {
        if vecs.len() != spans.len() {
            anyhow::bail!(
                "got {} vectors for {} spans of document {}",
                vecs.len(),
                spans.len(),
                doc.id
            );
        }
        for v in vecs {
            check_dims(dims, v)?;
        }
    }

    let mut stored = Vec::with_capacity(spans.len());
    for (i, span) in spans.iter().enumerate() {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO spans (id, document_id, span_index, text, start_index, end_index, hash)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&doc.id)
        .bind(i as i64)
        .bind(&span.text)
        .bind(span.start_index as i64)
        .bind(span.end_index as i64)
        .bind(span.content_hash())
        .execute(&mut **tx)
        .await?;

        if let Some(vector) = vectors.and_then(|v| v.get(i)) {
            let item = LibraryItem {
                id: id.clone(),
                text: span.text.clone(),
                category: None,
                is_reference: doc.is_reference,
                document_id: Some(doc.id.clone()),
            };
            upsert_vector_row(&mut **tx, &item, vector).await?;
        }

        stored.push(StoredSpan {
            id,
            span_index: i as i64,
            span: span.clone(),
        });
    }
    Ok(stored)
}

async fn upsert_vector_row<'e, E>(executor: E, item: &LibraryItem, vector: &[f32]) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO clause_vectors (id, document_id, category, text, is_reference, embedding)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            document_id = excluded.document_id,
            category = excluded.category,
            text = excluded.text,
            is_reference = excluded.is_reference,
            embedding = excluded.embedding
        "#,
    )
    .bind(&item.id)
    .bind(&item.document_id)
    .bind(&item.category)
    .bind(&item.text)
    .bind(item.is_reference)
    .bind(vec_to_blob(vector))
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl SimilarityIndex for SqliteStore {
    fn dims(&self) -> usize {
        self.dims
    }

    async fn index(&self, entry: IndexEntry) -> clause_harness_core::Result<()> {
        check_dims(self.dims, &entry.vector)?;
        self.upsert_vector(&entry).await?;
        Ok(())
    }

    async fn query_by_vector(
        &self,
        vector: &[f32],
        k: usize,
        filters: &SearchFilters,
    ) -> clause_harness_core::Result<Vec<SearchHit>> {
        check_dims(self.dims, vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let hits = self
            .vector_candidates(filters)
            .await?
            .into_iter()
            .map(|(item, v)| SearchHit {
                similarity: cosine_similarity(vector, &v),
                item,
            })
            .collect();
        Ok(rank(hits, k))
    }
}
