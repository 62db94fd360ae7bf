//! Application context shared by CLI commands and HTTP handlers.
//!
//! Everything stateful (store, embedder, completion client, document locks)
//! is built once from [`Config`] and passed explicitly.

use anyhow::Result;
use clause_harness_core::embedding::Embedder;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::completion::{create_completion, CompletionClient};
use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::migrate::migrate_pool;
use crate::store::SqliteStore;

/// Per-document write locks.
///
/// Every read-modify-write of a document's text (apply, replace, delete)
/// holds that document's lock, so two patches on one document never
/// interleave. Different documents proceed in parallel.
#[derive(Clone, Default)]
pub struct DocumentLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and hold the lock for `document_id`.
    pub async fn lock(&self, document_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().await;
            // Drop slots nobody holds or waits on.
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(document_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}

/// Shared handles for one running instance.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<SqliteStore>,
    pub embedder: Arc<dyn Embedder>,
    pub completion: Arc<dyn CompletionClient>,
    pub locks: DocumentLocks,
}

impl AppContext {
    pub fn new(
        config: Config,
        store: SqliteStore,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            embedder,
            completion,
            locks: DocumentLocks::new(),
        }
    }

    /// Connect to the database (migrating it if needed) and build the
    /// configured providers.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let completion = create_completion(&config.completion)?;

        let pool = db::connect(config).await?;
        migrate_pool(&pool).await?;
        let store = SqliteStore::new(pool, embedder.dims());

        tracing::debug!(
            embedding = embedder.model_name(),
            completion = %config.completion.provider,
            "application context ready"
        );
        Ok(Self::new(config.clone(), store, embedder, completion))
    }

    /// Whether uploads should be embedded and indexed.
    pub fn embeddings_enabled(&self) -> bool {
        self.embedder.dims() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_document_is_serialized() {
        let locks = DocumentLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("doc").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_documents_do_not_block() {
        let locks = DocumentLocks::new();
        let _a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b")).await;
        assert!(b.is_ok());
    }
}
