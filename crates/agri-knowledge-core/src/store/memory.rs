//! In-memory [`VectorStore`] implementation.
//!
//! Records live in a `Vec` in insertion order with a `HashMap` from ID to
//! position, behind a `std::sync::RwLock`. Search is brute-force cosine
//! distance over every record. Used directly in tests and as the fallback
//! when the persistent store cannot be opened.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{QueryHit, VectorRecord};

use super::{check_dimensions, check_query, rank_by_distance, VectorStore};

#[derive(Default)]
struct State {
    records: Vec<VectorRecord>,
    positions: HashMap<String, usize>,
    dims: Option<usize>,
}

/// Non-persistent store for tests and the persistence fallback.
#[derive(Default)]
pub struct InMemoryVectorStore {
    state: RwLock<State>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        "memory"
    }

    fn is_persistent(&self) -> bool {
        false
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let dims = check_dimensions(state.dims, records)?;
        state.dims = dims;

        for record in records {
            match state.positions.get(&record.id).copied() {
                Some(pos) => state.records[pos] = record.clone(),
                None => {
                    let pos = state.records.len();
                    state.positions.insert(record.id.clone(), pos);
                    state.records.push(record.clone());
                }
            }
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        check_query(state.dims, vector, k)?;
        Ok(rank_by_distance(state.records.iter().cloned(), vector, k))
    }

    async fn count(&self) -> Result<usize> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.records.len())
    }

    async fn dimensions(&self) -> Result<Option<usize>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.dims)
    }
}
