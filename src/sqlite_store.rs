//! SQLite-backed [`VectorStore`] implementation.
//!
//! Vectors are stored as little-endian f32 BLOBs in `vector_records`, one
//! row per `(collection, id)`. The established dimension lives on the
//! `collections` row. Queries load the collection in `seq` order and rank
//! by exact cosine distance in process.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use agri_knowledge_core::embedding::{blob_to_vec, vec_to_blob};
use agri_knowledge_core::error::KnowledgeError;
use agri_knowledge_core::models::{ChunkMetadata, QueryHit, VectorRecord};
use agri_knowledge_core::store::{check_dimensions, check_query, rank_by_distance, VectorStore};

use crate::config::DbConfig;
use crate::migrate;

const BACKEND: &str = "sqlite";

fn store_err(e: impl std::fmt::Display) -> KnowledgeError {
    KnowledgeError::store(BACKEND, e.to_string())
}

/// SQLite implementation of the [`VectorStore`] trait, scoped to one collection.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the database and the collection row.
    pub async fn open(db: &DbConfig) -> Result<Self> {
        let pool = migrate::run_migrations(db).await?;

        sqlx::query("INSERT OR IGNORE INTO collections (name, dims, created_at) VALUES (?, NULL, ?)")
            .bind(&db.collection)
            .bind(chrono::Utc::now().timestamp())
            .execute(&pool)
            .await?;

        Ok(Self {
            pool,
            collection: db.collection.clone(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn stored_dims<'e, E>(&self, executor: E) -> agri_knowledge_core::Result<Option<usize>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let dims: Option<Option<i64>> =
            sqlx::query_scalar("SELECT dims FROM collections WHERE name = ?")
                .bind(&self.collection)
                .fetch_optional(executor)
                .await
                .map_err(store_err)?;
        Ok(dims.flatten().map(|d| d as usize))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    fn is_persistent(&self) -> bool {
        true
    }

    async fn upsert(&self, records: &[VectorRecord]) -> agri_knowledge_core::Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let established = self.stored_dims(&mut *tx).await?;
        let dims = check_dimensions(established, records)?;

        if established.is_none() {
            if let Some(d) = dims {
                sqlx::query("UPDATE collections SET dims = ? WHERE name = ?")
                    .bind(d as i64)
                    .bind(&self.collection)
                    .execute(&mut *tx)
                    .await
                    .map_err(store_err)?;
            }
        }

        let now = chrono::Utc::now().timestamp();
        for record in records {
            let metadata_json = serde_json::to_string(&record.metadata).map_err(store_err)?;
            sqlx::query(
                r#"
                INSERT INTO vector_records (collection, id, dims, embedding, document, metadata_json, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    dims = excluded.dims,
                    embedding = excluded.embedding,
                    document = excluded.document,
                    metadata_json = excluded.metadata_json,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(record.vector.len() as i64)
            .bind(vec_to_blob(&record.vector))
            .bind(&record.document)
            .bind(&metadata_json)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> agri_knowledge_core::Result<Vec<QueryHit>> {
        let established = self.stored_dims(&self.pool).await?;
        check_query(established, vector, k)?;

        let rows = sqlx::query(
            "SELECT id, embedding, document, metadata_json FROM vector_records WHERE collection = ? ORDER BY seq ASC",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata_json");
            let metadata: ChunkMetadata =
                serde_json::from_str(&metadata_json).map_err(store_err)?;
            records.push(VectorRecord {
                id: row.get("id"),
                vector: blob_to_vec(&blob),
                document: row.get("document"),
                metadata,
            });
        }

        Ok(rank_by_distance(records, vector, k))
    }

    async fn count(&self) -> agri_knowledge_core::Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vector_records WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(count as usize)
    }

    async fn dimensions(&self) -> agri_knowledge_core::Result<Option<usize>> {
        self.stored_dims(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db_config(tmp: &TempDir, collection: &str) -> DbConfig {
        DbConfig {
            path: tmp.path().join("nested").join("knowledge.sqlite"),
            collection: collection.to_string(),
            timeout_secs: 5,
        }
    }

    fn record(id: &str, vector: Vec<f32>, document: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector,
            document: document.to_string(),
            metadata: ChunkMetadata {
                title: "Soil pH".to_string(),
                url: "http://x/1".to_string(),
                source: "FAO".to_string(),
                category: "Soil".to_string(),
                chunk_index: 3,
                total_chunks: 4,
            },
        }
    }

    #[tokio::test]
    async fn test_open_creates_empty_collection() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteVectorStore::open(&db_config(&tmp, "c")).await.unwrap();
        assert_eq!(store.collection(), "c");
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.dimensions().await.unwrap(), None);
        assert!(store.query(&[1.0, 0.0], 5).await.unwrap().is_empty());
        assert!(store.is_persistent());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let cfg = db_config(&tmp, "c");
        {
            let store = SqliteVectorStore::open(&cfg).await.unwrap();
            store
                .upsert(&[record("a", vec![1.0, 0.0], "first"), record("b", vec![0.0, 1.0], "second")])
                .await
                .unwrap();
            store.close().await;
        }

        let store = SqliteVectorStore::open(&cfg).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.dimensions().await.unwrap(), Some(2));
        let hits = store.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].record.id, "a");
        assert_eq!(hits[0].record.document, "first");
        assert_eq!(hits[0].record.metadata.chunk_index, 3);
        assert_eq!(hits[0].record.metadata.total_chunks, 4);
        assert_eq!(hits[0].record.vector, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_and_keeps_position() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteVectorStore::open(&db_config(&tmp, "c")).await.unwrap();
        store
            .upsert(&[record("a", vec![1.0, 0.0], "a"), record("b", vec![1.0, 0.0], "b")])
            .await
            .unwrap();
        store.upsert(&[record("a", vec![3.0, 0.0], "a2")]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let hits = store.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].record.id, "a");
        assert_eq!(hits[0].record.document, "a2");
        assert_eq!(hits[1].record.id, "b");
    }

    #[tokio::test]
    async fn test_dimension_mismatch_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteVectorStore::open(&db_config(&tmp, "c")).await.unwrap();
        store.upsert(&[record("a", vec![1.0, 0.0], "a")]).await.unwrap();

        let err = store
            .upsert(&[record("b", vec![1.0, 0.0], "b"), record("c", vec![1.0, 0.0, 0.0], "c")])
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::DimensionMismatch { .. }));
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.query(&[1.0, 0.0, 0.0], 1).await.is_err());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let first = SqliteVectorStore::open(&db_config(&tmp, "one")).await.unwrap();
        let second = SqliteVectorStore::open(&db_config(&tmp, "two")).await.unwrap();
        first.upsert(&[record("a", vec![1.0, 0.0], "a")]).await.unwrap();
        second.upsert(&[record("a", vec![1.0, 0.0, 0.0], "a")]).await.unwrap();
        assert_eq!(first.count().await.unwrap(), 1);
        assert_eq!(second.dimensions().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_open_fails_when_parent_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let cfg = DbConfig {
            path: blocker.join("knowledge.sqlite"),
            collection: "c".to_string(),
            timeout_secs: 1,
        };
        assert!(SqliteVectorStore::open(&cfg).await.is_err());
    }
}
