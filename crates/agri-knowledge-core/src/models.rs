//! Core data models that flow through the indexing and retrieval pipeline.
//!
//! [`Article`]s come from the collector, are split into [`Chunk`]s, and
//! persist only as [`VectorRecord`]s. Queries return [`QueryHit`]s from the
//! store, which the retriever turns into [`SearchResult`]s.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_TITLE: &str = "Unknown Title";
const DEFAULT_SOURCE: &str = "Unknown";
const DEFAULT_CATEGORY: &str = "General";

/// A collected article. Read-only input to the indexer.
///
/// Deserialization is lenient: missing or `null` fields fall back to
/// defaults, scalar values are stringified, and `scraped_at` is accepted
/// as the on-disk name of `collected_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawArticle")]
pub struct Article {
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub collected_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn new(title: &str, content: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            url: url.to_string(),
            source: DEFAULT_SOURCE.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            collected_at: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }
}

/// Wire shape of an article as written by the collector.
#[derive(Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: Option<serde_json::Value>,
    #[serde(default)]
    content: Option<serde_json::Value>,
    #[serde(default)]
    url: Option<serde_json::Value>,
    #[serde(default)]
    source: Option<serde_json::Value>,
    #[serde(default)]
    category: Option<serde_json::Value>,
    #[serde(default, alias = "scraped_at")]
    collected_at: Option<serde_json::Value>,
}

impl From<RawArticle> for Article {
    fn from(raw: RawArticle) -> Self {
        Article {
            title: scalar_or(raw.title, DEFAULT_TITLE),
            content: scalar_or(raw.content, ""),
            url: scalar_or(raw.url, ""),
            source: scalar_or(raw.source, DEFAULT_SOURCE),
            category: scalar_or(raw.category, DEFAULT_CATEGORY),
            collected_at: raw
                .collected_at
                .and_then(|v| scalar_string(&v))
                .and_then(|s| parse_timestamp(&s)),
        }
    }
}

fn scalar_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_or(value: Option<serde_json::Value>, default: &str) -> String {
    value
        .as_ref()
        .and_then(scalar_string)
        .unwrap_or_else(|| default.to_string())
}

/// Parse RFC 3339, or a naive ISO-8601 timestamp interpreted as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A word-window slice of an article. Transient: only its embedded
/// form ([`VectorRecord`]) is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl Chunk {
    /// Deterministic chunk ID: `{url}_{chunk_index}`.
    pub fn make_id(url: &str, chunk_index: usize) -> String {
        format!("{}_{}", url, chunk_index)
    }

    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            title: self.title.clone(),
            url: self.url.clone(),
            source: self.source.clone(),
            category: self.category.clone(),
            chunk_index: self.chunk_index,
            total_chunks: self.total_chunks,
        }
    }

    pub fn into_record(self, vector: Vec<f32>) -> VectorRecord {
        let metadata = self.metadata();
        VectorRecord {
            id: self.id,
            vector,
            document: self.content,
            metadata,
        }
    }
}

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub title: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// The persisted unit: an embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Equal to the originating [`Chunk::id`].
    pub id: String,
    pub vector: Vec<f32>,
    /// Equal to the originating chunk's content.
    pub document: String,
    pub metadata: ChunkMetadata,
}

/// A record returned from a vector store query with its cosine distance.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub record: VectorRecord,
    pub distance: f32,
}

/// A formatted retrieval result.
///
/// `relevance_score = 1 - distance`; higher is more relevant and the value
/// may be negative for vectors pointing away from the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub category: String,
    pub relevance_score: f32,
}

impl From<QueryHit> for SearchResult {
    fn from(hit: QueryHit) -> Self {
        let QueryHit { record, distance } = hit;
        SearchResult {
            content: record.document,
            title: record.metadata.title,
            url: record.metadata.url,
            source: record.metadata.source,
            category: record.metadata.category,
            relevance_score: 1.0 - distance,
        }
    }
}

/// Summary of what is currently indexed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeStats {
    pub total_chunks: usize,
    pub collection_name: String,
    pub model_name: String,
    pub dimensions: Option<usize>,
    pub backend: String,
    pub persistent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_article_full_fields() {
        let json = r#"{
            "title": "Soil pH",
            "content": "Rice prefers slightly acidic soil.",
            "url": "http://x/1",
            "source": "Wikipedia",
            "category": "Soil",
            "scraped_at": "2024-03-05T10:20:30.123456"
        }"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.title, "Soil pH");
        assert_eq!(article.source, "Wikipedia");
        assert_eq!(article.category, "Soil");
        let ts = article.collected_at.unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.hour(), 10);
    }

    #[test]
    fn test_article_missing_and_null_fields_default() {
        let article: Article = serde_json::from_str(r#"{"content": "text", "title": null}"#).unwrap();
        assert_eq!(article.title, "Unknown Title");
        assert_eq!(article.url, "");
        assert_eq!(article.source, "Unknown");
        assert_eq!(article.category, "General");
        assert!(article.collected_at.is_none());
    }

    #[test]
    fn test_article_scalar_values_stringified() {
        let article: Article =
            serde_json::from_str(r#"{"title": 42, "content": true, "scraped_at": "yesterday"}"#)
                .unwrap();
        assert_eq!(article.title, "42");
        assert_eq!(article.content, "true");
        assert!(article.collected_at.is_none());
    }

    #[test]
    fn test_article_rfc3339_timestamp() {
        let article: Article =
            serde_json::from_str(r#"{"collected_at": "2024-01-01T00:00:00+02:00"}"#).unwrap();
        assert_eq!(article.collected_at.unwrap().hour(), 22);
    }

    #[test]
    fn test_article_rejects_non_object() {
        assert!(serde_json::from_str::<Article>(r#""just a string""#).is_err());
    }

    #[test]
    fn test_search_result_from_hit() {
        let chunk = Chunk {
            id: Chunk::make_id("http://x/1", 0),
            content: "body".into(),
            title: "T".into(),
            url: "http://x/1".into(),
            source: "S".into(),
            category: "C".into(),
            chunk_index: 0,
            total_chunks: 1,
        };
        assert_eq!(chunk.id, "http://x/1_0");
        let hit = QueryHit {
            record: chunk.into_record(vec![1.0, 0.0]),
            distance: 1.5,
        };
        let result = SearchResult::from(hit);
        assert_eq!(result.content, "body");
        assert!((result.relevance_score + 0.5).abs() < 1e-6);
    }
}
