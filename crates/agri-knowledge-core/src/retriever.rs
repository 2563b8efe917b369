//! Query-time retrieval: embed the query, ask the store for neighbors,
//! format [`SearchResult`]s.

use std::sync::Arc;

use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{KnowledgeError, Result};
use crate::models::SearchResult;
use crate::store::VectorStore;

/// Default number of results returned by a search.
pub const DEFAULT_K: usize = 5;

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    default_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            default_k: DEFAULT_K,
        }
    }

    /// Override the `k` used by [`search_default`](Self::search_default).
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::Config`] if `k == 0`.
    pub fn with_default_k(mut self, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(KnowledgeError::Config(
                "default_k must be greater than zero".to_string(),
            ));
        }
        self.default_k = k;
        Ok(self)
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Search and surface failures.
    ///
    /// `Ok(vec![])` means nothing matched (empty store or blank query);
    /// `Err` means the embedder or store failed.
    pub async fn try_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(KnowledgeError::Config("k must be greater than zero".to_string()));
        }
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed_query(query).await?;
        let hits = self.store.query(&vector, k).await?;
        debug!(k, hits = hits.len(), "retrieved");

        Ok(hits.into_iter().map(SearchResult::from).collect())
    }

    /// Search, returning an empty list on any failure. Failures are logged.
    pub async fn search(&self, query: &str, k: usize) -> Vec<SearchResult> {
        match self.try_search(query, k).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "search failed");
                Vec::new()
            }
        }
    }

    /// [`search`](Self::search) with the configured default `k`.
    pub async fn search_default(&self, query: &str) -> Vec<SearchResult> {
        self.search(query, self.default_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingProvider;
    use crate::models::{ChunkMetadata, VectorRecord};
    use crate::store::memory::InMemoryVectorStore;
    use async_trait::async_trait;

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        fn model_name(&self) -> &str {
            "failing"
        }

        fn dims(&self) -> usize {
            4
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(KnowledgeError::embedding("failing", "connection refused"))
        }
    }

    fn meta(title: &str) -> ChunkMetadata {
        ChunkMetadata {
            title: title.to_string(),
            url: format!("http://x/{}", title),
            source: "S".to_string(),
            category: "C".to_string(),
            chunk_index: 0,
            total_chunks: 1,
        }
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty() {
        let retriever = Retriever::new(
            Arc::new(HashingProvider::default()),
            Arc::new(InMemoryVectorStore::new()),
        );
        assert!(retriever.search("rice", 5).await.is_empty());
        assert!(retriever.try_search("rice", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_returns_empty() {
        let retriever = Retriever::new(Arc::new(FailingProvider), Arc::new(InMemoryVectorStore::new()));
        assert!(retriever.try_search("   ", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_empty_for_search_and_err_for_try_search() {
        let retriever = Retriever::new(Arc::new(FailingProvider), Arc::new(InMemoryVectorStore::new()));
        assert!(retriever.search("rice", 5).await.is_empty());
        assert!(retriever.try_search("rice", 5).await.is_err());
    }

    #[tokio::test]
    async fn test_relevance_is_one_minus_distance() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(HashingProvider::new(8).unwrap());
        store
            .upsert(&[
                VectorRecord {
                    id: "same".into(),
                    vector: embedder.embed_query("rice").await.unwrap(),
                    document: "rice".into(),
                    metadata: meta("same"),
                },
                VectorRecord {
                    id: "zero".into(),
                    vector: vec![0.0; 8],
                    document: "".into(),
                    metadata: meta("zero"),
                },
            ])
            .await
            .unwrap();

        let retriever = Retriever::new(embedder, store);
        let results = retriever.try_search("rice", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "same");
        assert!((results[0].relevance_score - 1.0).abs() < 1e-5);
        assert!(results[1].relevance_score.abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_zero_k_rejected() {
        let retriever = Retriever::new(
            Arc::new(HashingProvider::default()),
            Arc::new(InMemoryVectorStore::new()),
        );
        assert!(retriever.try_search("rice", 0).await.is_err());
        assert!(Retriever::new(
            Arc::new(HashingProvider::default()),
            Arc::new(InMemoryVectorStore::new())
        )
        .with_default_k(0)
        .is_err());
    }
}
