//! On-disk persistence for the vector index.
//!
//! A single sqlite file holds the embedded chunks plus a small meta table
//! recording the schema version, the embedding model identity, and the
//! vector dimension. `load` refuses anything it cannot vouch for — a
//! missing file, an unreadable database, a version or model mismatch, or
//! blobs that disagree with the recorded dimension — and the caller
//! answers every refusal the same way: full rebuild.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::AssistantError;
use crate::knowledge::{Chunk, DocMetadata};

use super::entry::IndexEntry;
use super::vector::VectorIndex;

const SCHEMA_VERSION: &str = "1";

pub struct IndexStore {
    db_path: PathBuf,
}

impl IndexStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn connect(&self, create: bool) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(2)
            .connect_with(options)
            .await
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_entries (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                record_id TEXT NOT NULL,
                title TEXT NOT NULL,
                category TEXT NOT NULL,
                source_category TEXT NOT NULL,
                start_offset INTEGER NOT NULL,
                chunk_index INTEGER NOT NULL,
                embedding BLOB NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    async fn meta_value(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?1")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Deserialize the persisted index, validating it against the current
    /// embedding model. Every failure is an `IndexLoad`, which callers
    /// treat as "rebuild from the corpus".
    pub async fn load(&self, expected_model: &str) -> Result<VectorIndex, AssistantError> {
        if !self.db_path.exists() {
            return Err(AssistantError::IndexLoad(format!(
                "no persisted index at {}",
                self.db_path.display()
            )));
        }

        let pool = self
            .connect(false)
            .await
            .map_err(|e| AssistantError::IndexLoad(format!("cannot open index: {}", e)))?;

        let result = Self::load_from(&pool, expected_model).await;
        pool.close().await;
        result
    }

    async fn load_from(
        pool: &SqlitePool,
        expected_model: &str,
    ) -> Result<VectorIndex, AssistantError> {
        let load_err = |msg: String| AssistantError::IndexLoad(msg);

        let version = Self::meta_value(pool, "schema_version")
            .await
            .map_err(|e| load_err(format!("unreadable index metadata: {}", e)))?
            .ok_or_else(|| load_err("index metadata missing schema version".into()))?;
        if version != SCHEMA_VERSION {
            return Err(load_err(format!(
                "schema version mismatch: persisted {}, expected {}",
                version, SCHEMA_VERSION
            )));
        }

        let model = Self::meta_value(pool, "embedding_model")
            .await
            .map_err(|e| load_err(format!("unreadable index metadata: {}", e)))?
            .ok_or_else(|| load_err("index metadata missing embedding model".into()))?;
        if model != expected_model {
            return Err(load_err(format!(
                "embedding model mismatch: persisted '{}', expected '{}'",
                model, expected_model
            )));
        }

        let dimension: usize = Self::meta_value(pool, "embedding_dim")
            .await
            .map_err(|e| load_err(format!("unreadable index metadata: {}", e)))?
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| load_err("index metadata missing embedding dimension".into()))?;

        let rows = sqlx::query(
            "SELECT chunk_id, content, record_id, title, category, source_category,
                    start_offset, chunk_index, embedding
             FROM index_entries
             ORDER BY rowid",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| load_err(format!("unreadable index entries: {}", e)))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row.get("embedding");
            if blob.len() != dimension * 4 {
                return Err(load_err(format!(
                    "corrupt embedding blob: {} bytes for dimension {}",
                    blob.len(),
                    dimension
                )));
            }

            entries.push(IndexEntry {
                embedding: Self::deserialize_embedding(&blob),
                chunk: Chunk {
                    id: row.get("chunk_id"),
                    text: row.get("content"),
                    metadata: DocMetadata {
                        id: row.get("record_id"),
                        title: row.get("title"),
                        category: row.get("category"),
                        source_category: row.get("source_category"),
                    },
                    start_offset: row.get::<i64, _>("start_offset") as usize,
                    chunk_index: row.get::<i64, _>("chunk_index") as usize,
                },
            });
        }

        let index = VectorIndex::from_parts(model, dimension, entries)
            .map_err(|e| load_err(e.to_string()))?;

        tracing::info!(
            "loaded persisted index: {} entries, dimension {}",
            index.len(),
            index.dimension()
        );
        Ok(index)
    }

    /// Persist the index, replacing any prior content in one transaction.
    pub async fn save(&self, index: &VectorIndex) -> anyhow::Result<()> {
        let pool = self.connect(true).await?;
        let result = Self::save_to(&pool, index).await;
        pool.close().await;
        result
    }

    async fn save_to(pool: &SqlitePool, index: &VectorIndex) -> anyhow::Result<()> {
        Self::init_schema(pool).await?;

        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM index_entries")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM index_meta").execute(&mut *tx).await?;

        for entry in index.entries() {
            let blob = Self::serialize_embedding(&entry.embedding);
            let chunk = &entry.chunk;

            sqlx::query(
                "INSERT INTO index_entries
                    (chunk_id, content, record_id, title, category, source_category,
                     start_offset, chunk_index, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&chunk.id)
            .bind(&chunk.text)
            .bind(&chunk.metadata.id)
            .bind(&chunk.metadata.title)
            .bind(&chunk.metadata.category)
            .bind(&chunk.metadata.source_category)
            .bind(chunk.start_offset as i64)
            .bind(chunk.chunk_index as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        for (key, value) in [
            ("schema_version", SCHEMA_VERSION.to_string()),
            ("embedding_model", index.model().to_string()),
            ("embedding_dim", index.dimension().to_string()),
            ("built_at", chrono::Utc::now().to_rfc3339()),
        ] {
            sqlx::query("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")
                .bind(key)
                .bind(&value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!("persisted index: {} entries", index.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            embedding,
            chunk: Chunk {
                id: id.to_string(),
                text: format!("text of {}", id),
                metadata: DocMetadata {
                    id: format!("rec-{}", id),
                    title: format!("Title {}", id),
                    category: "facilities".to_string(),
                    source_category: "libraries".to_string(),
                },
                start_offset: 0,
                chunk_index: 0,
            },
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::from_entries(
            "embed-v1",
            vec![
                entry("a", vec![1.0, 0.0, 0.0]),
                entry("b", vec![0.0, 1.0, 0.0]),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("index.db"));

        store.save(&sample_index()).await.unwrap();
        let loaded = store.load("embed-v1").await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension(), 3);
        assert_eq!(loaded.model(), "embed-v1");

        let hits = loaded.search(&[1.0, 0.0, 0.0], 1);
        assert_eq!(hits[0].chunk.id, "a");
        assert_eq!(hits[0].chunk.metadata.title, "Title a");
        assert_eq!(hits[0].chunk.text, "text of a");
    }

    #[tokio::test]
    async fn missing_file_fails_to_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("absent.db"));

        let err = store.load("embed-v1").await.unwrap_err();
        assert!(matches!(err, AssistantError::IndexLoad(_)));
    }

    #[tokio::test]
    async fn model_mismatch_fails_to_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("index.db"));

        store.save(&sample_index()).await.unwrap();
        let err = store.load("embed-v2").await.unwrap_err();
        assert!(matches!(err, AssistantError::IndexLoad(_)));
    }

    #[tokio::test]
    async fn garbage_file_fails_to_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("index.db");
        std::fs::write(&path, b"this is not a sqlite database at all").unwrap();

        let store = IndexStore::new(path);
        let err = store.load("embed-v1").await.unwrap_err();
        assert!(matches!(err, AssistantError::IndexLoad(_)));
    }

    #[tokio::test]
    async fn dimension_mismatch_fails_to_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("index.db"));
        store.save(&sample_index()).await.unwrap();

        // Tamper with the recorded dimension so blobs no longer agree.
        let pool = store.connect(false).await.unwrap();
        sqlx::query("UPDATE index_meta SET value = '5' WHERE key = 'embedding_dim'")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let err = store.load("embed-v1").await.unwrap_err();
        assert!(matches!(err, AssistantError::IndexLoad(_)));
    }

    #[tokio::test]
    async fn save_overwrites_previous_index() {
        let tmp = tempfile::tempdir().unwrap();
        let store = IndexStore::new(tmp.path().join("index.db"));

        store.save(&sample_index()).await.unwrap();
        let smaller =
            VectorIndex::from_entries("embed-v1", vec![entry("only", vec![1.0, 1.0, 1.0])])
                .unwrap();
        store.save(&smaller).await.unwrap();

        let loaded = store.load("embed-v1").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.search(&[1.0, 1.0, 1.0], 7)[0].chunk.id, "only");
    }
}
