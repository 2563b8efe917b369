//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the only storage surface the indexer and
//! retriever depend on, which keeps backends pluggable (in-memory here,
//! SQLite in the app crate).
//!
//! # Contract
//!
//! | Method | Semantics |
//! |--------|-----------|
//! | [`upsert`](VectorStore::upsert) | Insert or overwrite by ID; reject dimension mismatches atomically |
//! | [`query`](VectorStore::query) | Exact top-`k` by cosine distance, ascending; ties by insertion order |
//! | [`count`](VectorStore::count) | Number of stored records |
//! | [`dimensions`](VectorStore::dimensions) | Established vector dimension, `None` while empty |
//!
//! The first successful upsert establishes the dimension `D`. Overwriting
//! a record keeps its original insertion position.

pub mod memory;

use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::error::{KnowledgeError, Result};
use crate::models::{QueryHit, VectorRecord};

/// Abstract keyed container of [`VectorRecord`]s with nearest-neighbor search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name used in logs and errors (e.g. `"memory"`, `"sqlite"`).
    fn backend(&self) -> &str;

    /// Whether records survive a process restart.
    fn is_persistent(&self) -> bool;

    /// Insert or overwrite records by ID.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Return up to `k` records nearest to `vector`, ascending by distance.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>>;

    /// Total records currently stored.
    async fn count(&self) -> Result<usize>;

    /// The established dimension, or `None` if nothing was ever stored.
    async fn dimensions(&self) -> Result<Option<usize>>;
}

/// Check a batch against the established dimension.
///
/// Returns the dimension the store holds after the batch is applied.
/// Every record in the batch must agree with `established` (or, for an
/// empty store, with the first record of the batch).
pub fn check_dimensions(established: Option<usize>, records: &[VectorRecord]) -> Result<Option<usize>> {
    let expected = match established.or_else(|| records.first().map(|r| r.vector.len())) {
        Some(d) => d,
        None => return Ok(None),
    };

    if expected == 0 {
        return Err(KnowledgeError::Config(
            "vectors must have at least one dimension".to_string(),
        ));
    }

    for record in records {
        if record.vector.len() != expected {
            return Err(KnowledgeError::DimensionMismatch {
                expected,
                actual: record.vector.len(),
            });
        }
    }

    Ok(Some(expected))
}

/// Validate query arguments shared by every backend.
pub fn check_query(established: Option<usize>, vector: &[f32], k: usize) -> Result<()> {
    if k == 0 {
        return Err(KnowledgeError::Config("k must be greater than zero".to_string()));
    }
    if let Some(expected) = established {
        if vector.len() != expected {
            return Err(KnowledgeError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }
    Ok(())
}

/// Exact top-`k` ranking by cosine distance.
///
/// `records` must be in insertion order: the sort is stable, so equal
/// distances keep that order.
pub fn rank_by_distance<I>(records: I, query: &[f32], k: usize) -> Vec<QueryHit>
where
    I: IntoIterator<Item = VectorRecord>,
{
    let mut hits: Vec<QueryHit> = records
        .into_iter()
        .map(|record| {
            let distance = cosine_distance(query, &record.vector);
            QueryHit { record, distance }
        })
        .collect();

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(k);
    hits
}
