use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the schema (idempotent). Used by `clx init`.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index on an open pool.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            full_text TEXT NOT NULL,
            is_reference INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS spans (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            span_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            start_index INTEGER NOT NULL,
            end_index INTEGER NOT NULL,
            hash TEXT NOT NULL,
            UNIQUE(document_id, span_index),
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // `seq` keeps insertion order for similarity tie-breaks.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clause_vectors (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            document_id TEXT,
            category TEXT,
            text TEXT NOT NULL,
            is_reference INTEGER NOT NULL DEFAULT 0,
            embedding BLOB NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_spans_document_id ON spans(document_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_clause_vectors_document_id ON clause_vectors(document_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_updated_at ON documents(updated_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("schema migrations complete");
    Ok(())
}
