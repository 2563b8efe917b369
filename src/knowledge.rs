//! The [`KnowledgeBase`] handle.
//!
//! Owns the configuration, the embedding provider and the vector store,
//! and builds [`KnowledgeIndexer`]s and [`Retriever`]s that share them.
//! The store is opened on first use: SQLite at `db.path` when possible,
//! otherwise an in-memory store for the rest of the process.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use agri_knowledge_core::embedding::EmbeddingProvider;
use agri_knowledge_core::indexer::KnowledgeIndexer;
use agri_knowledge_core::models::KnowledgeStats;
use agri_knowledge_core::retriever::Retriever;
use agri_knowledge_core::store::memory::InMemoryVectorStore;
use agri_knowledge_core::store::VectorStore;

use crate::config::{self, Config};
use crate::embedding::create_provider;
use crate::sqlite_store::SqliteVectorStore;

pub struct KnowledgeBase {
    config: Config,
    embedder: Arc<dyn EmbeddingProvider>,
    store: OnceCell<Arc<dyn VectorStore>>,
}

impl KnowledgeBase {
    /// Validate `config` and build the (possibly lazy) embedding provider.
    pub fn new(config: Config) -> Result<Self> {
        config::validate(&config)?;
        let embedder = create_provider(&config.embedding)?;
        Ok(Self {
            config,
            embedder,
            store: OnceCell::new(),
        })
    }

    /// Use an explicit provider instead of the configured one.
    pub fn with_embedder(config: Config, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        config::validate(&config)?;
        Ok(Self {
            config,
            embedder,
            store: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// The shared vector store, opened on first call.
    ///
    /// Never fails: if SQLite cannot be opened the error is logged and an
    /// in-memory store is used instead.
    pub async fn store(&self) -> Arc<dyn VectorStore> {
        self.store
            .get_or_init(|| async {
                match SqliteVectorStore::open(&self.config.db).await {
                    Ok(store) => {
                        info!(
                            path = %self.config.db.path.display(),
                            collection = %store.collection(),
                            "opened persistent vector store"
                        );
                        Arc::new(store) as Arc<dyn VectorStore>
                    }
                    Err(e) => {
                        warn!(
                            path = %self.config.db.path.display(),
                            error = %format!("{:#}", e),
                            "persistent store unavailable, falling back to in-memory store"
                        );
                        Arc::new(InMemoryVectorStore::new()) as Arc<dyn VectorStore>
                    }
                }
            })
            .await
            .clone()
    }

    pub async fn indexer(&self) -> Result<KnowledgeIndexer> {
        self.indexer_with_batch_size(self.config.indexing.batch_size).await
    }

    pub async fn indexer_with_batch_size(&self, batch_size: usize) -> Result<KnowledgeIndexer> {
        let indexer = KnowledgeIndexer::builder()
            .embedder(Arc::clone(&self.embedder))
            .store(self.store().await)
            .chunk_config(self.config.chunking.to_chunk_config()?)
            .batch_size(batch_size)
            .build()
            .context("Failed to build indexer")?;
        Ok(indexer)
    }

    pub async fn retriever(&self) -> Result<Retriever> {
        let retriever = Retriever::new(Arc::clone(&self.embedder), self.store().await)
            .with_default_k(self.config.retrieval.default_k)?;
        Ok(retriever)
    }

    pub async fn stats(&self) -> Result<KnowledgeStats> {
        let store = self.store().await;
        Ok(KnowledgeStats {
            total_chunks: store.count().await?,
            collection_name: self.config.db.collection.clone(),
            model_name: self.embedder.model_name().to_string(),
            dimensions: store.dimensions().await?,
            backend: store.backend().to_string(),
            persistent: store.is_persistent(),
        })
    }
}
