//! # Agri Knowledge Core
//!
//! Shared, I/O-free logic for Agri Knowledge: article and chunk models,
//! text normalization, word-window chunking, the embedding and vector store
//! traits, and the indexing and retrieval orchestrators built on top of them.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. Persistent stores and network embedding
//! providers live in the `agri-knowledge` app crate.
//!
//! ```text
//! Article ──▶ normalize ──▶ Chunker ──▶ EmbeddingProvider ──▶ VectorStore
//!                                                                 │
//!            SearchResult ◀── Retriever ◀── EmbeddingProvider ◀───┘
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod models;
pub mod normalize;
pub mod retriever;
pub mod store;

pub use chunk::{ChunkConfig, Chunker};
pub use embedding::{EmbeddingProvider, HashingProvider};
pub use error::{ErrorKind, KnowledgeError, Result};
pub use indexer::{IndexReport, KnowledgeIndexer, Plan};
pub use models::{Article, Chunk, ChunkMetadata, KnowledgeStats, QueryHit, SearchResult, VectorRecord};
pub use retriever::Retriever;
pub use store::memory::InMemoryVectorStore;
pub use store::VectorStore;
