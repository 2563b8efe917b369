//! Article indexing orchestrator.
//!
//! [`KnowledgeIndexer`] turns articles into stored vectors:
//!
//! ```text
//! Article ─▶ normalize ─▶ Chunker ─▶ Chunk[] ─▶ batches ─▶ embed ─▶ upsert
//! ```
//!
//! Chunks from every article are accumulated first, then embedded and
//! written in batches of `batch_size`. A batch that fails with a transient
//! error is logged and skipped; later batches still run. A fatal error
//! (embedding model unavailable) aborts the whole run.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::chunk::{ChunkConfig, Chunker};
use crate::embedding::EmbeddingProvider;
use crate::error::{ErrorKind, KnowledgeError, Result};
use crate::models::{Article, Chunk, VectorRecord};
use crate::normalize::normalize;
use crate::store::VectorStore;

/// Default number of chunks embedded and written per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Outcome of an indexing run.
///
/// `failed_batches > 0` means some chunks were not written; compare
/// `records_written` against `chunks` to see how many. `duplicate_ids > 0`
/// means some articles were shadowed by later ones sharing a URL (or
/// having none).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub articles: usize,
    pub articles_skipped: usize,
    /// Distinct chunks after duplicate IDs were collapsed.
    pub chunks: usize,
    /// Chunks dropped because a later chunk in the same run had the same ID.
    pub duplicate_ids: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub records_written: usize,
}

pub struct KnowledgeIndexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: Chunker,
    batch_size: usize,
}

impl KnowledgeIndexer {
    pub fn builder() -> KnowledgeIndexerBuilder {
        KnowledgeIndexerBuilder::default()
    }

    /// Normalize and chunk one article with this indexer's chunker.
    pub fn process_article(&self, article: &Article) -> Vec<Chunk> {
        process_article(&self.chunker, article)
    }

    /// Index `articles` into the store.
    ///
    /// # Errors
    ///
    /// Returns the first error whose [`kind`](KnowledgeError::kind) is not
    /// [`ErrorKind::Transient`]. Transient failures only show up in the
    /// report's `failed_batches`.
    pub async fn index(&self, articles: &[Article]) -> Result<IndexReport> {
        let Plan {
            chunks,
            articles_skipped,
            duplicate_ids,
        } = plan(&self.chunker, articles);

        let mut report = IndexReport {
            articles: articles.len(),
            articles_skipped,
            chunks: chunks.len(),
            duplicate_ids,
            ..Default::default()
        };

        if chunks.is_empty() {
            warn!(articles = articles.len(), "no chunks to index");
            return Ok(report);
        }

        info!(
            articles = articles.len(),
            chunks = chunks.len(),
            batch_size = self.batch_size,
            "indexing chunks"
        );

        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            report.batches += 1;
            match self.index_batch(batch).await {
                Ok(written) => {
                    report.records_written += written;
                    debug!(batch = batch_no, written, "batch written");
                }
                Err(e) if e.kind() == ErrorKind::Transient => {
                    report.failed_batches += 1;
                    error!(batch = batch_no, size = batch.len(), error = %e, "batch failed, skipping");
                }
                Err(e) => {
                    error!(batch = batch_no, error = %e, "indexing aborted");
                    return Err(e);
                }
            }
        }

        info!(
            records_written = report.records_written,
            failed_batches = report.failed_batches,
            duplicate_ids = report.duplicate_ids,
            "indexing complete"
        );
        Ok(report)
    }

    async fn index_batch(&self, batch: &[Chunk]) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        if vectors.len() != batch.len() {
            return Err(KnowledgeError::embedding(
                self.embedder.model_name(),
                format!("expected {} vectors, got {}", batch.len(), vectors.len()),
            ));
        }

        let records: Vec<VectorRecord> = batch
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(chunk, vector)| chunk.into_record(vector))
            .collect();

        self.store.upsert(&records).await?;
        Ok(records.len())
    }
}

/// Chunked articles, ready to embed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    /// One chunk per distinct ID, in first-seen order.
    pub chunks: Vec<Chunk>,
    /// Articles that produced no chunks.
    pub articles_skipped: usize,
    /// Chunks replaced by a later chunk with the same ID.
    pub duplicate_ids: usize,
}

/// Normalize and chunk one article.
///
/// Returns no chunks when the normalized content is empty. IDs are
/// `{url}_{chunk_index}`, so re-processing the same article with the
/// same chunk config yields the same IDs.
pub fn process_article(chunker: &Chunker, article: &Article) -> Vec<Chunk> {
    let cleaned = normalize(&article.content);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let pieces = chunker.chunk(&cleaned);
    let total_chunks = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| Chunk {
            id: Chunk::make_id(&article.url, chunk_index),
            content,
            title: article.title.clone(),
            url: article.url.clone(),
            source: article.source.clone(),
            category: article.category.clone(),
            chunk_index,
            total_chunks,
        })
        .collect()
}

/// Chunk every article without embedding or writing anything.
///
/// Chunk IDs are unique in the result. When two chunks share an ID the
/// later one wins and keeps the earlier one's position.
pub fn plan(chunker: &Chunker, articles: &[Article]) -> Plan {
    let mut out = Plan::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for article in articles {
        let article_chunks = process_article(chunker, article);
        if article_chunks.is_empty() {
            debug!(url = %article.url, title = %article.title, "skipping article with empty content");
            out.articles_skipped += 1;
            continue;
        }

        for chunk in article_chunks {
            match positions.get(&chunk.id) {
                Some(&pos) => {
                    warn!(
                        id = %chunk.id,
                        replaced = %out.chunks[pos].title,
                        title = %chunk.title,
                        "duplicate chunk id, keeping the later article"
                    );
                    out.duplicate_ids += 1;
                    out.chunks[pos] = chunk;
                }
                None => {
                    positions.insert(chunk.id.clone(), out.chunks.len());
                    out.chunks.push(chunk);
                }
            }
        }
    }

    out
}

/// Builder for [`KnowledgeIndexer`].
///
/// The embedder and store are required; chunking defaults to 500/50 words
/// and batches to [`DEFAULT_BATCH_SIZE`].
#[derive(Default)]
pub struct KnowledgeIndexerBuilder {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    chunk_config: Option<ChunkConfig>,
    batch_size: Option<usize>,
}

impl KnowledgeIndexerBuilder {
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn chunk_config(mut self, config: ChunkConfig) -> Self {
        self.chunk_config = Some(config);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// # Errors
    ///
    /// Returns [`KnowledgeError::Config`] if a required field is missing or
    /// `batch_size == 0`.
    pub fn build(self) -> Result<KnowledgeIndexer> {
        let embedder = self
            .embedder
            .ok_or_else(|| KnowledgeError::Config("embedder is required".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| KnowledgeError::Config("store is required".to_string()))?;
        let batch_size = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(KnowledgeError::Config(
                "batch_size must be greater than zero".to_string(),
            ));
        }

        Ok(KnowledgeIndexer {
            embedder,
            store,
            chunker: Chunker::new(self.chunk_config.unwrap_or_default()),
            batch_size,
        })
    }
}
